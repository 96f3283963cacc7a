//! GPU rendering subsystem.
//!
//! The quad renderer owns its GPU resources (pipeline, buffers, depth target)
//! and records one render pass per frame into the encoder handed to it.
//!
//! Convention:
//! - geometry is in model space, transformed by model/view/projection uniforms
//! - clip-space depth is `[0, 1]`

mod ctx;
mod depth;
pub mod mesh;
mod quad;
pub mod shader;
pub mod transform;
pub mod uniforms;

#[cfg(test)]
mod testing;

pub use ctx::{RenderCtx, RenderTarget};
pub use quad::{QuadConfig, QuadRenderer};
pub use shader::{ShaderProgram, ShaderSources};
pub use transform::{TransformParams, Transforms};
