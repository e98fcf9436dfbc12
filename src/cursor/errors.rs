//! Cursor error types
//!
//! Codes follow the FEEDTAIL_CATEGORY_NAME format.

use std::io;

use thiserror::Error;

/// Result type for cursor operations
pub type CursorResult<T> = Result<T, CursorError>;

/// Errors raised by a [`super::StreamCursor`].
///
/// A pull that finds no data is not an error; it is reported through
/// [`super::CursorStatus::Drained`].
#[derive(Debug, Error)]
pub enum CursorError {
    /// Upstream could not be reached or the cursor could not be (re)opened
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// `pull` or `current_upstream_time` called before `open`
    #[error("cursor is not open")]
    NotOpen,

    /// A feed entry could not be decoded
    #[error("malformed feed entry at line {line}: {message}")]
    Malformed { line: usize, message: String },

    /// I/O failure while reading the feed
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl CursorError {
    /// Wraps an I/O error with a short description of what was being done.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the error code string
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "FEEDTAIL_CURSOR_UNAVAILABLE",
            Self::NotOpen => "FEEDTAIL_CURSOR_NOT_OPEN",
            Self::Malformed { .. } => "FEEDTAIL_CURSOR_MALFORMED",
            Self::Io { .. } => "FEEDTAIL_CURSOR_IO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            CursorError::Unavailable("down".into()).as_code(),
            "FEEDTAIL_CURSOR_UNAVAILABLE"
        );
        assert_eq!(CursorError::NotOpen.as_code(), "FEEDTAIL_CURSOR_NOT_OPEN");
    }

    #[test]
    fn test_io_display_includes_context() {
        let err = CursorError::io(
            "reading feed",
            io::Error::new(io::ErrorKind::Other, "disk gone"),
        );
        let display = err.to_string();
        assert!(display.contains("reading feed"));
        assert!(display.contains("disk gone"));
    }
}
