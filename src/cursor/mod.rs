//! Stream cursor abstraction
//!
//! A cursor produces the upstream change feed as an ordered sequence of
//! timestamped events, starting from a requested position. It can be
//! re-opened from any position at any time.
//!
//! # Contract
//!
//! - `open(start)` positions the cursor at the first event whose position is
//!   `>= start`. Events exactly at `start` are included.
//! - `pull(limit)` returns up to `limit` events in non-decreasing position
//!   order together with a [`CursorStatus`]. An empty pull is not an error.
//! - `current_upstream_time()` reports the upstream clock ("now").
//!
//! Terminal failures are returned as `Err`; "nothing right now" is
//! [`CursorStatus::Drained`], "nothing ever again" is [`CursorStatus::Closed`].

mod errors;
mod file;
mod memory;

pub use errors::{CursorError, CursorResult};
pub use file::FileCursor;
pub use memory::MemoryCursor;

use serde::{Deserialize, Serialize};

use crate::position::Position;

/// One entry of the change feed.
///
/// The payload is opaque to the tailer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub position: Position,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(position: Position, payload: serde_json::Value) -> Self {
        Self { position, payload }
    }
}

/// What the cursor knows about the feed after a pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStatus {
    /// The pull stopped at its limit; more events may be ready now
    MoreAvailable,
    /// Everything currently available has been returned
    Drained,
    /// The feed has ended and will produce nothing further
    Closed,
}

/// Result of a single bounded read.
#[derive(Debug, Clone, PartialEq)]
pub struct Pull {
    pub events: Vec<Event>,
    pub status: CursorStatus,
}

impl Pull {
    pub fn new(events: Vec<Event>, status: CursorStatus) -> Self {
        Self { events, status }
    }

    /// A pull that yielded nothing because nothing is available right now.
    pub fn drained() -> Self {
        Self::new(Vec::new(), CursorStatus::Drained)
    }

    /// True when zero events came back and the cursor is merely idle.
    pub fn is_idle(&self) -> bool {
        self.events.is_empty() && self.status == CursorStatus::Drained
    }
}

/// Source of the upstream change feed.
pub trait StreamCursor {
    /// (Re)open the cursor so the next pull starts at `start`, inclusive.
    fn open(&mut self, start: Position) -> CursorResult<()>;

    /// Read up to `limit` events (`None` means everything available now).
    fn pull(&mut self, limit: Option<usize>) -> CursorResult<Pull>;

    /// The upstream clock.
    fn current_upstream_time(&mut self) -> CursorResult<Position>;
}

impl<C: StreamCursor + ?Sized> StreamCursor for Box<C> {
    fn open(&mut self, start: Position) -> CursorResult<()> {
        (**self).open(start)
    }

    fn pull(&mut self, limit: Option<usize>) -> CursorResult<Pull> {
        (**self).pull(limit)
    }

    fn current_upstream_time(&mut self) -> CursorResult<Position> {
        (**self).current_upstream_time()
    }
}
