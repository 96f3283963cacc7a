//! Wobble engine crate.
//!
//! This crate owns the platform + GPU runtime pieces and the quad renderer
//! driven by the demo binary.

pub mod core;
pub mod device;
pub mod logging;
pub mod render;
pub mod time;
pub mod window;
