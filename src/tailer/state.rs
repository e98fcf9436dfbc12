//! In-memory tailer state
//!
//! Owned by one tailer value and mutated only through its methods. Nothing
//! here is persisted; durability lives in the last written checkpoint.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::position::Position;

/// How checkpoints get committed. Fixed for the lifetime of a tailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TailerMode {
    /// Committed automatically on the delivery path, throttled by event time
    Continuous,
    /// Committed only when the consumer calls `commit_batch`
    Batched,
}

impl TailerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TailerMode::Continuous => "continuous",
            TailerMode::Batched => "batched",
        }
    }
}

impl fmt::Display for TailerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where to start when the store has no checkpoint for the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartFrom {
    /// An explicit position
    Position(Position),
    /// Whatever the cursor reports as current upstream time
    UpstreamNow,
}

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed; `start`/`resume` not yet called
    Uninitialized,
    /// Cursor open; `deliver_next` allowed
    Running,
    /// A failure stopped delivery; `start`/`resume` required
    Halted,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Running => "running",
            Phase::Halted => "halted",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delivered and committed positions for one running instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailerState {
    last_delivered: Option<Position>,
    last_committed: Option<Position>,
    mode: TailerMode,
}

impl TailerState {
    pub fn new(mode: TailerMode) -> Self {
        Self {
            last_delivered: None,
            last_committed: None,
            mode,
        }
    }

    /// Highest position handed to the consumer (or reached by an idle
    /// advance) since process start.
    pub fn last_delivered(&self) -> Option<Position> {
        self.last_delivered
    }

    /// Highest position durably written since process start.
    pub fn last_committed(&self) -> Option<Position> {
        self.last_committed
    }

    pub fn mode(&self) -> TailerMode {
        self.mode
    }

    /// True when everything delivered has also been committed.
    pub fn is_caught_up(&self) -> bool {
        self.last_delivered == self.last_committed
    }

    /// Records a delivered position.
    ///
    /// The delivered position never moves backwards. An older `position` is
    /// ignored and the current one is returned as `Err`.
    pub(super) fn record_delivered(&mut self, position: Position) -> Result<(), Position> {
        match self.last_delivered {
            Some(current) if position < current => Err(current),
            _ => {
                self.last_delivered = Some(position);
                Ok(())
            }
        }
    }

    pub(super) fn record_committed(&mut self, position: Position) {
        self.last_committed = Some(position);
    }
}
