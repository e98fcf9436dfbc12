//! Observable tailer events
//!
//! Every log line the tailer emits names one of these events.

use std::fmt;

use super::logger::Severity;

/// Observable events in the tailer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailerEvent {
    // Bootstrap
    /// `start`/`resume` begins
    ResumeStart,
    /// No stored checkpoint; the default start position is used
    CheckpointMissing,
    /// Caller named a start position; the stored checkpoint is ignored
    StartOverridden,
    /// Cursor opened at the start position
    CursorOpened,
    /// Cursor could not be opened
    CursorOpenFailed,

    // Delivery
    /// A pull delivered one or more events
    BatchDelivered,
    /// Idle pull moved the delivered position to upstream time
    IdleAdvance,
    /// Upstream reported a position older than one already delivered
    PositionRegressed,
    /// Consumer callback failed; position not advanced
    CallbackFailed,
    /// Cursor failed mid-stream
    CursorReadFailed,
    /// Cursor reported end of feed
    CursorClosed,

    // Checkpointing
    /// Checkpoint durably written
    CheckpointSaved,
    /// Checkpoint write failed
    CheckpointWriteFailed,
    /// Explicit batch commit requested
    BatchCommit,
}

impl TailerEvent {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            TailerEvent::ResumeStart => "RESUME_START",
            TailerEvent::CheckpointMissing => "CHECKPOINT_MISSING",
            TailerEvent::StartOverridden => "START_OVERRIDDEN",
            TailerEvent::CursorOpened => "CURSOR_OPENED",
            TailerEvent::CursorOpenFailed => "CURSOR_OPEN_FAILED",

            TailerEvent::BatchDelivered => "BATCH_DELIVERED",
            TailerEvent::IdleAdvance => "IDLE_ADVANCE",
            TailerEvent::PositionRegressed => "POSITION_REGRESSED",
            TailerEvent::CallbackFailed => "CALLBACK_FAILED",
            TailerEvent::CursorReadFailed => "CURSOR_READ_FAILED",
            TailerEvent::CursorClosed => "CURSOR_CLOSED",

            TailerEvent::CheckpointSaved => "CHECKPOINT_SAVED",
            TailerEvent::CheckpointWriteFailed => "CHECKPOINT_WRITE_FAILED",
            TailerEvent::BatchCommit => "BATCH_COMMIT",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            TailerEvent::BatchDelivered | TailerEvent::IdleAdvance => Severity::Trace,
            TailerEvent::CheckpointMissing
            | TailerEvent::StartOverridden
            | TailerEvent::PositionRegressed => Severity::Warn,
            TailerEvent::CursorOpenFailed
            | TailerEvent::CallbackFailed
            | TailerEvent::CursorReadFailed
            | TailerEvent::CheckpointWriteFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for TailerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
