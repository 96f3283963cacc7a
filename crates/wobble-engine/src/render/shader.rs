//! Shader program built from a vertex and a fragment WGSL file.
//!
//! Both sources are parsed and validated with naga before they reach the device,
//! and the stage interface is checked the way a GL program link would: every
//! fragment input location must be written by the vertex stage.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::mesh::QuadVertex;
use super::uniforms::TransformUniform;

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// One stage's WGSL source and where it came from.
#[derive(Debug, Clone)]
pub struct StageSource {
    pub origin: PathBuf,
    pub code: String,
}

impl StageSource {
    fn read(path: &Path) -> Result<Self> {
        let code = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read shader {}", path.display()))?;
        anyhow::ensure!(!code.trim().is_empty(), "shader {} is empty", path.display());
        Ok(Self {
            origin: path.to_path_buf(),
            code,
        })
    }
}

/// Vertex + fragment sources, loaded but not yet compiled.
#[derive(Debug, Clone)]
pub struct ShaderSources {
    pub vertex: StageSource,
    pub fragment: StageSource,
}

impl ShaderSources {
    /// Reads both stage files from disk.
    pub fn read(vertex_path: impl AsRef<Path>, fragment_path: impl AsRef<Path>) -> Result<Self> {
        let vertex = StageSource::read(vertex_path.as_ref())?;
        let fragment = StageSource::read(fragment_path.as_ref())?;
        log::info!(
            "loaded shaders {} and {}",
            vertex.origin.display(),
            fragment.origin.display()
        );
        Ok(Self { vertex, fragment })
    }

    /// Wraps in-memory sources; `origin` is used only in diagnostics.
    pub fn from_code(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: StageSource {
                origin: PathBuf::from("<vertex>"),
                code: vertex.into(),
            },
            fragment: StageSource {
                origin: PathBuf::from("<fragment>"),
                code: fragment.into(),
            },
        }
    }

    /// Compiles both stages and checks that they link.
    pub fn validate(&self) -> Result<()> {
        let vertex = compile_stage(&self.vertex, naga::ShaderStage::Vertex, VERTEX_ENTRY)?;
        let fragment = compile_stage(&self.fragment, naga::ShaderStage::Fragment, FRAGMENT_ENTRY)?;

        check_transform_block(&vertex, &self.vertex.origin)?;
        link_stages(&vertex, &fragment)
    }
}

fn compile_stage(src: &StageSource, stage: naga::ShaderStage, entry: &str) -> Result<naga::Module> {
    let module = naga::front::wgsl::parse_str(&src.code).map_err(|e| {
        anyhow!(
            "failed to compile {}:\n{}",
            src.origin.display(),
            e.emit_to_string(&src.code)
        )
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::empty(),
    )
    .validate(&module)
    .map_err(|e| anyhow!("{} failed validation: {e}", src.origin.display()))?;

    anyhow::ensure!(
        find_entry(&module, stage, entry).is_some(),
        "{} has no {stage:?} entry point named `{entry}`",
        src.origin.display()
    );

    Ok(module)
}

fn find_entry<'m>(
    module: &'m naga::Module,
    stage: naga::ShaderStage,
    name: &str,
) -> Option<&'m naga::EntryPoint> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage && ep.name == name)
}

/// The vertex stage must declare a uniform block at group 0, binding 0 of
/// exactly `TransformUniform::SIZE` bytes.
fn check_transform_block(module: &naga::Module, origin: &Path) -> Result<()> {
    let block = module.global_variables.iter().find_map(|(_, var)| {
        let binding = var.binding.as_ref()?;
        (binding.group == 0 && binding.binding == 0 && var.space == naga::AddressSpace::Uniform)
            .then_some(var)
    });

    let Some(block) = block else {
        anyhow::bail!(
            "{} declares no uniform block at @group(0) @binding(0)",
            origin.display()
        );
    };

    let size = u64::from(module.types[block.ty].inner.size(module.to_ctx()));
    anyhow::ensure!(
        size == TransformUniform::SIZE,
        "{}: uniform block is {size} bytes, expected {} (three mat4x4<f32>)",
        origin.display(),
        TransformUniform::SIZE
    );
    Ok(())
}

fn link_stages(vertex: &naga::Module, fragment: &naga::Module) -> Result<()> {
    let mut written = Vec::new();
    if let Some(ep) = find_entry(vertex, naga::ShaderStage::Vertex, VERTEX_ENTRY) {
        if let Some(result) = &ep.function.result {
            collect_locations(vertex, result.ty, result.binding.as_ref(), &mut written);
        }
    }

    let mut read = Vec::new();
    if let Some(ep) = find_entry(fragment, naga::ShaderStage::Fragment, FRAGMENT_ENTRY) {
        for arg in &ep.function.arguments {
            collect_locations(fragment, arg.ty, arg.binding.as_ref(), &mut read);
        }
    }

    for location in read {
        anyhow::ensure!(
            written.contains(&location),
            "link failed: fragment input @location({location}) is not written by the vertex stage"
        );
    }
    Ok(())
}

/// Collects user-defined `@location`s of an entry point argument or result.
fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<u32>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => out.push(*location),
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    if let Some(naga::Binding::Location { location, .. }) = &member.binding {
                        out.push(*location);
                    }
                }
            }
        }
    }
}

/// Compiled shader modules + render pipeline.
pub struct ShaderProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl ShaderProgram {
    /// Validates `sources`, then creates the modules and the render pipeline.
    pub fn load(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        sources: &ShaderSources,
    ) -> Result<Self> {
        sources.validate()?;

        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("wobble vertex shader"),
            source: wgpu::ShaderSource::Wgsl(sources.vertex.code.as_str().into()),
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("wobble fragment shader"),
            source: wgpu::ShaderSource::Wgsl(sources.fragment.code.as_str().into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("wobble transforms bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: TransformUniform::min_binding_size(),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("wobble pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("wobble quad pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: Some(VERTEX_ENTRY),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &fragment,
                entry_point: Some(FRAGMENT_ENTRY),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        log::info!("shader program linked ({color_format:?}, depth {depth_format:?})");

        Ok(Self {
            pipeline,
            bind_group_layout,
        })
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }
}
