//! In-memory scripted cursor
//!
//! Holds the whole feed in a vector. The upstream clock is set explicitly, so
//! idle-stream behavior can be driven deterministically. Failures can be
//! scheduled for the next open or pull.

use serde_json::Value;

use super::errors::{CursorError, CursorResult};
use super::{CursorStatus, Event, Pull, StreamCursor};
use crate::position::Position;

/// Cursor over an in-memory feed.
#[derive(Debug, Default)]
pub struct MemoryCursor {
    events: Vec<Event>,
    next: usize,
    open: bool,
    upstream_time: Position,
    close_when_drained: bool,
    fail_open: Option<String>,
    fail_next_pull: Option<String>,
    opened_at: Vec<Position>,
}

impl MemoryCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a cursor over `events`, which must be in position order.
    pub fn with_events(events: Vec<Event>) -> Self {
        let mut cursor = Self::new();
        for event in events {
            cursor.push(event);
        }
        cursor
    }

    /// Appends one event to the feed.
    ///
    /// The upstream clock is moved forward to cover it.
    pub fn push(&mut self, event: Event) {
        if event.position > self.upstream_time {
            self.upstream_time = event.position;
        }
        self.events.push(event);
    }

    /// Appends an event with a null payload.
    pub fn push_at(&mut self, position: Position) {
        self.push(Event::new(position, Value::Null));
    }

    /// Sets what `current_upstream_time` reports.
    pub fn set_upstream_time(&mut self, now: Position) {
        self.upstream_time = now;
    }

    /// When set, a pull that reaches the end of the feed reports `Closed`
    /// instead of `Drained`.
    pub fn close_when_drained(mut self, close: bool) -> Self {
        self.close_when_drained = close;
        self
    }

    pub fn set_close_when_drained(&mut self, close: bool) {
        self.close_when_drained = close;
    }

    /// Makes every subsequent `open` fail until cleared.
    pub fn fail_open(&mut self, message: Option<&str>) {
        self.fail_open = message.map(str::to_string);
    }

    /// Makes the next `pull` fail once.
    pub fn fail_next_pull(&mut self, message: &str) {
        self.fail_next_pull = Some(message.to_string());
    }

    /// Every start position this cursor was opened at, in order.
    pub fn opened_at(&self) -> &[Position] {
        &self.opened_at
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Events not yet returned by a pull.
    pub fn remaining(&self) -> usize {
        self.events.len().saturating_sub(self.next)
    }
}

impl StreamCursor for MemoryCursor {
    fn open(&mut self, start: Position) -> CursorResult<()> {
        if let Some(message) = &self.fail_open {
            self.open = false;
            return Err(CursorError::Unavailable(message.clone()));
        }

        self.next = self.events.partition_point(|e| e.position < start);
        self.open = true;
        self.opened_at.push(start);
        Ok(())
    }

    fn pull(&mut self, limit: Option<usize>) -> CursorResult<Pull> {
        if !self.open {
            return Err(CursorError::NotOpen);
        }
        if let Some(message) = self.fail_next_pull.take() {
            return Err(CursorError::Unavailable(message));
        }

        let available = self.remaining();
        let take = limit.map_or(available, |l| l.min(available));
        let events = self.events[self.next..self.next + take].to_vec();
        self.next += take;

        let status = if self.next < self.events.len() {
            CursorStatus::MoreAvailable
        } else if self.close_when_drained {
            CursorStatus::Closed
        } else {
            CursorStatus::Drained
        };

        Ok(Pull::new(events, status))
    }

    fn current_upstream_time(&mut self) -> CursorResult<Position> {
        Ok(self.upstream_time)
    }
}
