//! Quad geometry and its device buffers.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    /// Vertex layout: one `vec3<f32>` at `@location(0)`.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

#[rustfmt::skip]
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { position: [ 0.5,  0.5, 0.0] }, // top right
    QuadVertex { position: [ 0.5, -0.5, 0.0] }, // bottom right
    QuadVertex { position: [-0.5, -0.5, 0.0] }, // bottom left
    QuadVertex { position: [-0.5,  0.5, 0.0] }, // top left
];

#[rustfmt::skip]
pub const QUAD_INDICES: [u32; 6] = [
    0, 1, 3,
    1, 2, 3,
];

/// Runs a release step at most once.
#[derive(Debug, Default)]
struct ReleaseOnce {
    released: bool,
}

impl ReleaseOnce {
    /// Calls `release` unless it already ran. Returns whether it ran now.
    fn run(&mut self, release: impl FnOnce()) -> bool {
        if self.released {
            return false;
        }
        release();
        self.released = true;
        true
    }
}

/// Vertex + index buffers for the quad.
///
/// Buffers are created once and destroyed once; `destroy` is idempotent and also
/// runs on drop.
pub struct QuadMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    release: ReleaseOnce,
}

impl QuadMesh {
    /// Uploads [`QUAD_VERTICES`] and [`QUAD_INDICES`] into new device buffers.
    pub fn upload(device: &wgpu::Device) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("wobble quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("wobble quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        log::debug!(
            "uploaded quad mesh: {} vertices, {} indices",
            QUAD_VERTICES.len(),
            QUAD_INDICES.len()
        );

        Self {
            vertex_buffer,
            index_buffer,
            index_count: QUAD_INDICES.len() as u32,
            release: ReleaseOnce::default(),
        }
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub const fn index_format() -> wgpu::IndexFormat {
        wgpu::IndexFormat::Uint32
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &wgpu::Buffer {
        &self.index_buffer
    }

    /// Frees both device buffers. Subsequent calls are no-ops.
    pub fn destroy(&mut self) {
        let (vertex_buffer, index_buffer) = (&self.vertex_buffer, &self.index_buffer);
        let freed = self.release.run(|| {
            vertex_buffer.destroy();
            index_buffer.destroy();
        });
        if freed {
            log::debug!("quad mesh buffers freed");
        }
    }

    #[cfg(test)]
    pub(crate) fn is_destroyed(&self) -> bool {
        self.release.released
    }
}

impl Drop for QuadMesh {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::headless_device;

    // ---- release guard ----

    #[test]
    fn release_runs_exactly_once() {
        let mut guard = ReleaseOnce::default();
        let mut calls = 0;

        assert!(guard.run(|| calls += 1));
        assert!(!guard.run(|| calls += 1));
        assert!(!guard.run(|| calls += 1));
        assert_eq!(calls, 1);
    }

    // ---- device buffers ----

    #[test]
    fn upload_sizes_buffers_and_destroy_is_idempotent() {
        let Some((device, _queue)) = headless_device() else {
            eprintln!("no GPU adapter available; skipping");
            return;
        };

        let mut mesh = QuadMesh::upload(&device);
        assert_eq!(mesh.vertex_buffer().size(), 4 * 12);
        assert_eq!(mesh.index_buffer().size(), 6 * 4);
        assert_eq!(mesh.index_count(), 6);
        assert!(!mesh.is_destroyed());

        mesh.destroy();
        assert!(mesh.is_destroyed());
        mesh.destroy();
        assert!(mesh.is_destroyed());

        // Drop after an explicit destroy must not free again.
        drop(mesh);
    }

    // ---- geometry ----

    #[test]
    fn vertex_stride_is_three_floats() {
        assert_eq!(QuadVertex::layout().array_stride, 12);
        assert_eq!(QuadVertex::layout().attributes[0].shader_location, 0);
        assert_eq!(QuadVertex::layout().attributes[0].format, wgpu::VertexFormat::Float32x3);
    }

    #[test]
    fn indices_reference_existing_vertices() {
        assert!(QUAD_INDICES.iter().all(|&i| (i as usize) < QUAD_VERTICES.len()));
    }

    #[test]
    fn triangles_share_the_diagonal() {
        let (a, b) = QUAD_INDICES.split_at(3);
        let shared: Vec<u32> = a.iter().copied().filter(|i| b.contains(i)).collect();
        // Bottom right and top left form the shared edge.
        assert_eq!(shared, vec![1, 3]);
    }

    #[test]
    fn triangles_have_matching_winding() {
        fn signed_area(tri: &[u32]) -> f32 {
            let p = |i: u32| QUAD_VERTICES[i as usize].position;
            let (a, b, c) = (p(tri[0]), p(tri[1]), p(tri[2]));
            (b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])
        }
        let (a, b) = QUAD_INDICES.split_at(3);
        assert!(signed_area(a) * signed_area(b) > 0.0);
    }

    #[test]
    fn quad_is_centred_unit_square() {
        let (min, max) = QUAD_VERTICES.iter().fold(
            ([f32::MAX; 2], [f32::MIN; 2]),
            |(mn, mx), v| {
                (
                    [mn[0].min(v.position[0]), mn[1].min(v.position[1])],
                    [mx[0].max(v.position[0]), mx[1].max(v.position[1])],
                )
            },
        );
        assert_eq!(min, [-0.5, -0.5]);
        assert_eq!(max, [0.5, 0.5]);
    }
}
