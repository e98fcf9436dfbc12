//! Configuration errors
//!
//! A bad config is fatal: nothing is opened until the whole file validates.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for configuration
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid JSON for [`super::TailerConfig`]
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value outside its allowed range
    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }

    /// Returns the error code string
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "FEEDTAIL_CONFIG_READ",
            Self::Parse(_) => "FEEDTAIL_CONFIG_PARSE",
            Self::Invalid { .. } => "FEEDTAIL_CONFIG_INVALID",
        }
    }
}
