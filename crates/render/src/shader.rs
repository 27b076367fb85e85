use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::RenderError;

/// Vertex attribute carrying object-space positions.
pub const POSITION_ATTRIBUTE: &str = "vertexPos";
/// Attribute slot the position attribute is bound to before linking.
pub const POSITION_SLOT: u32 = 0;
/// Combined model-view-projection matrix uniform.
pub const MVP_UNIFORM: &str = "modelview";
/// Flat color uniform.
pub const COLOR_UNIFORM: &str = "col";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Where shader source text comes from, looked up by file name.
pub trait ShaderSources {
    fn read(&self, name: &str) -> io::Result<String>;
}

/// Shader files in a directory on disk.
#[derive(Debug, Clone)]
pub struct ShaderDir {
    root: PathBuf,
}

impl ShaderDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ShaderSources for ShaderDir {
    fn read(&self, name: &str) -> io::Result<String> {
        std::fs::read_to_string(self.root.join(name))
    }
}

/// In-memory sources keyed by name.
impl ShaderSources for BTreeMap<String, String> {
    fn read(&self, name: &str) -> io::Result<String> {
        self.get(name).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no shader named {name}"))
        })
    }
}

/// Read a shader source in full. A missing source is fatal to startup.
pub fn load_shader(sources: &dyn ShaderSources, name: &str) -> Result<String, RenderError> {
    sources.read(name).map_err(|source| RenderError::ShaderSource {
        name: name.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vs.wgsl"), "// vertex").unwrap();

        let shaders = ShaderDir::new(dir.path());
        assert_eq!(load_shader(&shaders, "vs.wgsl").unwrap(), "// vertex");
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let shaders = ShaderDir::new(dir.path());
        let err = load_shader(&shaders, "fs.wgsl").unwrap_err();
        assert!(matches!(err, RenderError::ShaderSource { ref name, .. } if name == "fs.wgsl"));
        assert!(err.to_string().contains("fs.wgsl"));
    }

    #[test]
    fn in_memory_sources() {
        let mut sources = BTreeMap::new();
        sources.insert("vs.wgsl".to_string(), "vertexPos".to_string());
        assert_eq!(load_shader(&sources, "vs.wgsl").unwrap(), "vertexPos");
        assert!(load_shader(&sources, "other.wgsl").is_err());
    }

    #[test]
    fn stage_names() {
        assert_eq!(ShaderStage::Vertex.to_string(), "vertex");
        assert_eq!(ShaderStage::Fragment.to_string(), "fragment");
    }
}
