//! Logging utilities.
//!
//! This module centralizes logger initialization. It avoids imposing a specific
//! logging backend beyond the standard `log` facade on library code.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
