use anyhow::Result;

use super::depth::{DepthTarget, DEPTH_FORMAT};
use super::mesh::QuadMesh;
use super::shader::{ShaderProgram, ShaderSources};
use super::transform::{aspect_ratio, TransformParams, Transforms};
use super::uniforms::TransformUniform;
use super::{RenderCtx, RenderTarget};

/// Quad appearance and motion settings.
#[derive(Debug, Clone)]
pub struct QuadConfig {
    /// Color the framebuffer is cleared to before drawing.
    pub clear_color: wgpu::Color,
    pub transform: TransformParams,
}

impl Default for QuadConfig {
    fn default() -> Self {
        Self {
            clear_color: wgpu::Color::BLACK,
            transform: TransformParams::default(),
        }
    }
}

/// Draws one indexed quad with per-frame model/view/projection uniforms.
///
/// Owns every GPU resource it uses. Mesh buffers are freed when the renderer
/// is dropped.
pub struct QuadRenderer {
    config: QuadConfig,
    program: ShaderProgram,
    mesh: QuadMesh,

    transform_ubo: wgpu::Buffer,
    bind_group: wgpu::BindGroup,

    depth: Option<DepthTarget>,
}

impl QuadRenderer {
    /// Links the shader program and uploads the quad mesh.
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        sources: &ShaderSources,
        config: QuadConfig,
    ) -> Result<Self> {
        let program = ShaderProgram::load(device, surface_format, DEPTH_FORMAT, sources)?;
        let mesh = QuadMesh::upload(device);

        let transform_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("wobble transforms ubo"),
            size: TransformUniform::SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("wobble transforms bind group"),
            layout: program.bind_group_layout(),
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: transform_ubo.as_entire_binding(),
            }],
        });

        Ok(Self {
            config,
            program,
            mesh,
            transform_ubo,
            bind_group,
            depth: None,
        })
    }

    /// Records one frame: clear, upload transforms for `elapsed` seconds, draw.
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, elapsed: f32) {
        if !self.depth.as_ref().is_some_and(|d| d.matches(ctx.size)) {
            self.depth = Some(DepthTarget::new(ctx.device, ctx.size));
        }
        let Some(depth) = self.depth.as_ref() else { return };

        let aspect = aspect_ratio(
            ctx.size.width,
            ctx.size.height,
            self.config.transform.fallback_aspect,
        );
        let transforms = Transforms::at(elapsed, aspect, &self.config.transform);
        ctx.queue.write_buffer(
            &self.transform_ubo,
            0,
            bytemuck::bytes_of(&TransformUniform::from(&transforms)),
        );

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("wobble quad pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.config.clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth.view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(self.program.pipeline());
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.mesh.vertex_buffer().slice(..));
        rpass.set_index_buffer(self.mesh.index_buffer().slice(..), QuadMesh::index_format());
        rpass.draw_indexed(0..self.mesh.index_count(), 0, 0..1);

        log::trace!("quad drawn at t={elapsed:.3}s (aspect {aspect:.3})");
    }
}

#[cfg(test)]
mod tests {
    use winit::dpi::PhysicalSize;

    use super::*;
    use crate::render::testing::{headless_device, FRAGMENT, VERTEX};

    const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    fn build(device: &wgpu::Device, fragment: &str) -> Result<QuadRenderer> {
        let sources = ShaderSources::from_code(VERTEX, fragment);
        QuadRenderer::new(device, COLOR_FORMAT, &sources, QuadConfig::default())
    }

    #[test]
    fn renders_offscreen_and_frees_mesh_once() {
        let Some((device, queue)) = headless_device() else {
            eprintln!("no GPU adapter available; skipping");
            return;
        };
        let mut renderer = build(&device, FRAGMENT).unwrap();

        let size = PhysicalSize::new(64, 32);
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test color"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());

        let rctx = RenderCtx::new(&device, &queue, COLOR_FORMAT, size);
        {
            let mut target = RenderTarget::new(&mut encoder, &view);
            renderer.render(&rctx, &mut target, 0.5);
        }
        queue.submit(std::iter::once(encoder.finish()));

        assert!(renderer.depth.as_ref().is_some_and(|d| d.matches(size)));
        assert_eq!(renderer.mesh.index_count(), 6);

        renderer.mesh.destroy();
        renderer.mesh.destroy();
        assert!(renderer.mesh.is_destroyed());

        // Dropping the renderer after an explicit destroy frees nothing twice.
        drop(renderer);
    }

    #[test]
    fn unlinked_shaders_are_an_error() {
        let Some((device, _queue)) = headless_device() else {
            eprintln!("no GPU adapter available; skipping");
            return;
        };
        let unlinked = FRAGMENT.replace("@location(0) local", "@location(2) local");

        match build(&device, &unlinked) {
            Ok(_) => panic!("renderer built from unlinked shaders"),
            Err(err) => assert!(err.to_string().contains("@location(2)"), "{err:#}"),
        }
    }
}
