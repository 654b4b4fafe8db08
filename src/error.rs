use std::path::PathBuf;
use thiserror::Error;

/// Startup configuration failures. All of these are fatal: the terminal UI is never
/// entered when one occurs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Missing required config key `{key}`")]
    MissingKey { key: &'static str },
}
