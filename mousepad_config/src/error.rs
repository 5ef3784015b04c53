use std::path::PathBuf;

use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O errors
    #[error("failed to access configuration file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing errors
    #[error("failed to parse configuration{}", .path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    Toml {
        path: Option<PathBuf>,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize configuration")]
    Serialize(#[from] toml::ser::Error),

    /// Configuration validation errors
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// Path resolution errors
    #[error("path error: {0}")]
    Path(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
