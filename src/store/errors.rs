//! Position store error types

use std::io;

use thiserror::Error;

/// Result type for position store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a [`super::PositionStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Consumer identity cannot be used as a store key
    #[error("invalid consumer id '{0}'")]
    InvalidConsumerId(String),

    /// Stored checkpoint exists but cannot be trusted
    #[error("checkpoint for '{consumer_id}' is corrupt: {message}")]
    Corrupt { consumer_id: String, message: String },

    /// Backend refused the write
    #[error("checkpoint write rejected: {0}")]
    WriteRejected(String),

    /// Backend could not be reached
    #[error("checkpoint store unavailable: {0}")]
    Unavailable(String),

    /// Filesystem failure
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Wraps an I/O error with a short description of what was being done.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn corrupt(consumer_id: &str, message: impl Into<String>) -> Self {
        Self::Corrupt {
            consumer_id: consumer_id.to_string(),
            message: message.into(),
        }
    }

    /// Returns the error code string
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::InvalidConsumerId(_) => "FEEDTAIL_STORE_INVALID_CONSUMER",
            Self::Corrupt { .. } => "FEEDTAIL_STORE_CORRUPT",
            Self::WriteRejected(_) => "FEEDTAIL_STORE_WRITE_REJECTED",
            Self::Unavailable(_) => "FEEDTAIL_STORE_UNAVAILABLE",
            Self::Io { .. } => "FEEDTAIL_STORE_IO",
        }
    }
}
