//! Fixtures shared by the render tests.

/// Vertex stage matching the quad's uniform block and vertex layout.
pub(crate) const VERTEX: &str = r#"
struct Transforms {
    model: mat4x4<f32>,
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
}

@group(0) @binding(0) var<uniform> transforms: Transforms;

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) local: vec3<f32>,
}

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip = transforms.projection * transforms.view * transforms.model * vec4<f32>(position, 1.0);
    out.local = position;
    return out;
}
"#;

pub(crate) const FRAGMENT: &str = r#"
struct FragmentInput {
    @location(0) local: vec3<f32>,
}

@fragment
fn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {
    return vec4<f32>(in.local + vec3<f32>(0.5), 1.0);
}
"#;

/// Requests a device without a surface. `None` when the machine has no usable
/// adapter; callers skip in that case.
pub(crate) fn headless_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::from_env().unwrap_or(wgpu::Backends::all()),
        ..Default::default()
    });

    let adapter =
        pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
            .ok()?;

    pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("wobble test device"),
        required_limits: wgpu::Limits::downlevel_webgl2_defaults()
            .using_resolution(adapter.limits()),
        ..Default::default()
    }))
    .ok()
}
