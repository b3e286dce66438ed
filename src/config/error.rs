use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading runtime settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings file not found at {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to read settings from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse settings from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}
