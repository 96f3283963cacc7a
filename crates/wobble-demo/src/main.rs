mod app;
mod config;

use anyhow::Result;

use wobble_engine::device::GpuInit;
use wobble_engine::logging::{init_logging, LoggingConfig};
use wobble_engine::render::{QuadConfig, ShaderSources};
use wobble_engine::window::{Runtime, RuntimeConfig};

use crate::app::QuadDemo;
use crate::config::ShaderPaths;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    // Shader problems are reported before a window ever opens.
    let paths = ShaderPaths::from_env();
    let sources = ShaderSources::read(&paths.vertex, &paths.fragment)?;
    sources.validate()?;

    Runtime::run(
        RuntimeConfig::default(),
        GpuInit::default(),
        QuadDemo::new(sources, QuadConfig::default()),
    )
}
