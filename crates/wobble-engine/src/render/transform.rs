//! Per-frame model/view/projection composition.
//!
//! Matrices are column-major and multiply column vectors, so in `a * b` the
//! transform `b` is applied first.

use glam::{Mat4, Vec3};

/// Constants that shape the quad's motion and the camera.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TransformParams {
    /// Rotation of the quad about `tilt_axis`, in degrees.
    pub tilt_degrees: f32,
    pub tilt_axis: Vec3,

    /// Peak horizontal offset of the wobble; the offset is `amplitude * sin(t)`.
    pub wobble_amplitude: f32,

    /// Non-uniform scale applied after tilt and wobble.
    pub scale: Vec3,

    /// Camera offset; the view matrix translates the world by this vector.
    pub view_offset: Vec3,

    /// Vertical field of view, in degrees.
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,

    /// Aspect ratio used when the drawable has zero height (minimized window).
    pub fallback_aspect: f32,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            tilt_degrees: -55.0,
            tilt_axis: Vec3::X,
            wobble_amplitude: 1.0,
            scale: Vec3::new(3.0, 2.0, 0.0),
            view_offset: Vec3::new(0.0, 0.0, -3.0),
            fov_y_degrees: 90.0,
            z_near: 0.1,
            z_far: 100.0,
            fallback_aspect: 1280.0 / 700.0,
        }
    }
}

/// The three matrices uploaded to the vertex stage every frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transforms {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

impl Transforms {
    /// Composes the matrices for `elapsed` seconds since startup.
    ///
    /// `model = scale * wobble * tilt`; the wobble is a translation along X
    /// that oscillates with `sin(elapsed)`.
    pub fn at(elapsed: f32, aspect: f32, params: &TransformParams) -> Self {
        let tilt = Mat4::from_axis_angle(
            params.tilt_axis.normalize_or(Vec3::X),
            params.tilt_degrees.to_radians(),
        );
        let wobble = Mat4::from_translation(Vec3::new(wobble_offset(elapsed, params), 0.0, 0.0));
        let scale = Mat4::from_scale(params.scale);

        let model = scale * wobble * tilt;
        let view = Mat4::from_translation(params.view_offset);

        // Depth maps to [0, 1], the wgpu clip-space convention on every backend.
        let projection = Mat4::perspective_rh(
            params.fov_y_degrees.to_radians(),
            aspect,
            params.z_near,
            params.z_far,
        );

        Self {
            model,
            view,
            projection,
        }
    }

    /// Returns `projection * view * model`.
    pub fn model_view_projection(&self) -> Mat4 {
        self.projection * self.view * self.model
    }
}

/// Horizontal wobble offset at `elapsed` seconds.
pub fn wobble_offset(elapsed: f32, params: &TransformParams) -> f32 {
    params.wobble_amplitude * elapsed.sin()
}

/// Returns `width / height`, or `fallback` when either dimension is zero.
pub fn aspect_ratio(width: u32, height: u32, fallback: f32) -> f32 {
    if width == 0 || height == 0 {
        fallback
    } else {
        width as f32 / height as f32
    }
}
