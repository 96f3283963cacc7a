use bytemuck::{Pod, Zeroable};

use super::transform::Transforms;

/// Uniform block bound at `@group(0) @binding(0)` of the vertex stage.
///
/// Field order matches the shader struct: model, view, projection. Each matrix
/// is four column vectors, which is the WGSL `mat4x4<f32>` layout.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TransformUniform {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

impl TransformUniform {
    /// Size of the block in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Binding size for the layout entry; the block is never empty.
    pub(crate) fn min_binding_size() -> Option<std::num::NonZeroU64> {
        std::num::NonZeroU64::new(Self::SIZE)
    }
}

impl From<&Transforms> for TransformUniform {
    fn from(t: &Transforms) -> Self {
        Self {
            model: t.model.to_cols_array_2d(),
            view: t.view.to_cols_array_2d(),
            projection: t.projection.to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::transform::TransformParams;

    #[test]
    fn block_is_three_mat4s() {
        assert_eq!(TransformUniform::SIZE, 3 * 64);
        assert_eq!(std::mem::align_of::<TransformUniform>(), 4);
    }

    #[test]
    fn matrices_are_column_major() {
        let t = Transforms::at(0.0, 1.0, &TransformParams::default());
        let u = TransformUniform::from(&t);

        // Translation lives in the fourth column.
        assert_eq!(u.view[3], [0.0, 0.0, -3.0, 1.0]);
    }

    #[test]
    fn bytes_follow_field_order() {
        let t = Transforms::at(0.3, 1.0, &TransformParams::default());
        let u = TransformUniform::from(&t);
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&u));

        assert_eq!(floats.len(), 48);
        assert_eq!(&floats[0..16], &t.model.to_cols_array());
        assert_eq!(&floats[16..32], &t.view.to_cols_array());
        assert_eq!(&floats[32..48], &t.projection.to_cols_array());
    }
}
