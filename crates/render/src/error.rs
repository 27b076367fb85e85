use std::path::PathBuf;

/// Errors that abort viewport construction.
///
/// Shader compile and link problems are not errors: they are reported as
/// [`crate::ShaderDiagnostic`] values and logged, and startup continues.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to read shader source `{name}`: {source}")]
    ShaderSource {
        name: String,
        source: std::io::Error,
    },
    #[error("failed to read config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error("surface error: {0}")]
    Surface(String),
}
