use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variable that overrides the shader directory.
pub const SHADER_DIR_ENV: &str = "WOBBLE_SHADER_DIR";

pub const VERTEX_SHADER: &str = "quad.vert.wgsl";
pub const FRAGMENT_SHADER: &str = "quad.frag.wgsl";

/// Where the two shader files are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl ShaderPaths {
    /// Resolves the shader directory from `WOBBLE_SHADER_DIR`, falling back to
    /// the `shaders/` directory shipped with this crate.
    pub fn from_env() -> Self {
        Self::resolve(std::env::var_os(SHADER_DIR_ENV))
    }

    fn resolve(dir_override: Option<OsString>) -> Self {
        let dir = dir_override
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders")));

        Self {
            vertex: dir.join(VERTEX_SHADER),
            fragment: dir.join(FRAGMENT_SHADER),
        }
    }
}
