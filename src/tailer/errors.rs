//! Tailer error types
//!
//! Every failure surfaces to the immediate caller. The tailer never retries
//! and never swallows an error; retry and backoff belong to the host.

use thiserror::Error;

use super::state::Phase;
use crate::cursor::CursorError;
use crate::position::Position;
use crate::store::StoreError;

/// Boxed error returned by a consumer callback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for tailer operations
pub type TailResult<T> = Result<T, TailError>;

/// Tailer errors
#[derive(Debug, Error)]
pub enum TailError {
    /// Cursor could not be opened (or upstream "now" could not be read while
    /// choosing a default start). Fatal to `resume`.
    #[error("upstream unavailable")]
    UpstreamUnavailable(#[source] CursorError),

    /// Cursor failed after it was opened. The tailer halts.
    #[error("cursor read failed")]
    CursorReadFailed(#[source] CursorError),

    /// Stored checkpoint could not be read during bootstrap.
    #[error("failed to read checkpoint for '{consumer_id}'")]
    CheckpointReadFailed {
        consumer_id: String,
        #[source]
        source: StoreError,
    },

    /// Consumer callback failed on the event at `position`. The delivered
    /// position was not advanced past it.
    #[error("consumer callback failed at {position}")]
    ConsumerCallbackFailed {
        position: Position,
        #[source]
        source: BoxError,
    },

    /// Durable write of `position` failed; the committed position is unchanged.
    #[error("checkpoint write of {position} failed")]
    CheckpointWriteFailed {
        position: Position,
        #[source]
        source: StoreError,
    },

    /// `commit_batch` called on a continuous-mode tailer.
    #[error("commit_batch requires a tailer in batched mode")]
    BatchModeRequired,

    /// `deliver_next` called before `start` or after a failure.
    #[error("tailer is not running (phase: {phase})")]
    NotRunning { phase: Phase },
}

impl TailError {
    /// Returns the error code string
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable(_) => "FEEDTAIL_UPSTREAM_UNAVAILABLE",
            Self::CursorReadFailed(_) => "FEEDTAIL_CURSOR_READ_FAILED",
            Self::CheckpointReadFailed { .. } => "FEEDTAIL_CHECKPOINT_READ_FAILED",
            Self::ConsumerCallbackFailed { .. } => "FEEDTAIL_CONSUMER_CALLBACK_FAILED",
            Self::CheckpointWriteFailed { .. } => "FEEDTAIL_CHECKPOINT_WRITE_FAILED",
            Self::BatchModeRequired => "FEEDTAIL_BATCH_MODE_REQUIRED",
            Self::NotRunning { .. } => "FEEDTAIL_NOT_RUNNING",
        }
    }

    /// True for caller programming errors, which retrying cannot fix.
    pub fn is_misuse(&self) -> bool {
        matches!(self, Self::BatchModeRequired | Self::NotRunning { .. })
    }
}
