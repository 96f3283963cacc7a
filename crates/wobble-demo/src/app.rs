use anyhow::{Context, Result};

use wobble_engine::core::{App, AppControl, FrameCtx};
use wobble_engine::render::{QuadConfig, QuadRenderer, ShaderSources};

/// Draws the wobbling quad every frame.
///
/// The renderer is built on the first frame, once the GPU context exists.
pub struct QuadDemo {
    sources: ShaderSources,
    config: QuadConfig,
    renderer: Option<QuadRenderer>,
}

impl QuadDemo {
    pub fn new(sources: ShaderSources, config: QuadConfig) -> Self {
        Self {
            sources,
            config,
            renderer: None,
        }
    }

    /// Returns the renderer, building it on first use.
    fn renderer(
        &mut self,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> Result<&mut QuadRenderer> {
        let renderer = match self.renderer.take() {
            Some(renderer) => renderer,
            None => QuadRenderer::new(device, surface_format, &self.sources, self.config.clone())
                .context("failed to set up quad renderer")?,
        };
        Ok(self.renderer.insert(renderer))
    }
}

impl App for QuadDemo {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl> {
        let renderer = self.renderer(ctx.gpu.device(), ctx.gpu.surface_format())?;

        let time = ctx.time;
        if time.frame_index % 600 == 0 {
            log::debug!(
                "frame {} at {:.2}s (dt {:.1}ms)",
                time.frame_index,
                time.elapsed,
                time.dt * 1000.0
            );
        }

        ctx.render(|rctx, target| renderer.render(rctx, target, time.elapsed))
    }

    fn on_exit(&mut self) {
        // Dropping the renderer frees the quad's device buffers.
        self.renderer = None;
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    fn shipped_shaders() -> ShaderSources {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders");
        ShaderSources::read(dir.join("quad.vert.wgsl"), dir.join("quad.frag.wgsl")).unwrap()
    }

    fn headless_device() -> Option<(wgpu::Device, wgpu::Queue)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::from_env().unwrap_or(wgpu::Backends::all()),
            ..Default::default()
        });
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
                .ok()?;
        pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("wobble demo test device"),
            required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                .using_resolution(adapter.limits()),
            ..Default::default()
        }))
        .ok()
    }

    #[test]
    fn shipped_shaders_compile_and_link() {
        shipped_shaders().validate().unwrap();
    }

    #[test]
    fn renderer_is_built_once_and_released_on_exit() {
        let Some((device, _queue)) = headless_device() else {
            eprintln!("no GPU adapter available; skipping");
            return;
        };
        let mut demo = QuadDemo::new(shipped_shaders(), QuadConfig::default());

        let first: *const QuadRenderer = demo.renderer(&device, SURFACE_FORMAT).unwrap();
        let second: *const QuadRenderer = demo.renderer(&device, SURFACE_FORMAT).unwrap();
        assert_eq!(first, second);

        demo.on_exit();
        assert!(demo.renderer.is_none());
    }

    #[test]
    fn renderer_setup_failure_is_an_error() {
        let Some((device, _queue)) = headless_device() else {
            eprintln!("no GPU adapter available; skipping");
            return;
        };
        let broken = ShaderSources::from_code("fn vs_main( {", "fn fs_main() {}");
        let mut demo = QuadDemo::new(broken, QuadConfig::default());

        let err = demo.renderer(&device, SURFACE_FORMAT).err().unwrap();
        assert!(format!("{err:#}").contains("failed to set up quad renderer"));
        assert!(demo.renderer.is_none());
    }
}
