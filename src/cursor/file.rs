//! JSON-lines file cursor
//!
//! Tails a feed file where each line is one serialized [`Event`]. Lines are
//! appended by the producer; a trailing line without a newline is treated as
//! still being written and is not consumed until it is complete.
//!
//! Upstream time is the feed's own high-water mark: the highest position on
//! any complete line seen so far, including lines skipped below the start.
//! Before the cursor is opened it is the highest position in the file.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use super::errors::{CursorError, CursorResult};
use super::{CursorStatus, Event, Pull, StreamCursor};
use crate::position::Position;

/// Cursor over an append-only JSON-lines feed file.
pub struct FileCursor {
    path: PathBuf,
    poll_interval: Duration,
    reader: Option<BufReader<File>>,
    start: Position,
    /// Bytes of the line currently being assembled
    partial: String,
    /// 1-based number of the last complete line consumed
    line: usize,
    /// Highest position read since `open`, never below `start`
    high_water: Position,
}

impl FileCursor {
    /// Creates a cursor for the feed at `path`. Nothing is opened yet.
    ///
    /// `poll_interval` is how long an idle pull waits for new lines before
    /// reporting [`CursorStatus::Drained`].
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            poll_interval,
            reader: None,
            start: Position::default(),
            partial: String::new(),
            line: 0,
            high_water: Position::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads complete lines until `limit` events are collected or the end of
    /// the file is reached. Returns true if the end of the file was hit.
    fn read_into(&mut self, events: &mut Vec<Event>, limit: Option<usize>) -> CursorResult<bool> {
        let reader = self.reader.as_mut().ok_or(CursorError::NotOpen)?;

        loop {
            if limit.is_some_and(|l| events.len() >= l) {
                return Ok(false);
            }

            let read = reader
                .read_line(&mut self.partial)
                .map_err(|e| CursorError::io(format!("reading {}", self.path.display()), e))?;
            if read == 0 || !self.partial.ends_with('\n') {
                return Ok(true);
            }

            self.line += 1;
            let line = std::mem::take(&mut self.partial);
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let event = parse_line(trimmed, self.line)?;
            self.high_water = self.high_water.max(event.position);

            if event.position >= self.start {
                events.push(event);
            }
        }
    }
}

fn parse_line(text: &str, line: usize) -> CursorResult<Event> {
    serde_json::from_str(text).map_err(|e| CursorError::Malformed {
        line,
        message: e.to_string(),
    })
}

fn unavailable(path: &Path, e: io::Error) -> CursorError {
    if e.kind() == io::ErrorKind::NotFound {
        CursorError::Unavailable(format!("feed not found: {}", path.display()))
    } else {
        CursorError::Unavailable(format!("failed to open feed {}: {}", path.display(), e))
    }
}

/// Highest position on any complete line of the feed at `path`.
fn scan_high_water(path: &Path) -> CursorResult<Position> {
    let file = File::open(path).map_err(|e| unavailable(path, e))?;
    let mut reader = BufReader::new(file);
    let mut high_water = Position::default();
    let mut text = String::new();
    let mut line = 0;

    loop {
        text.clear();
        let read = reader
            .read_line(&mut text)
            .map_err(|e| CursorError::io(format!("reading {}", path.display()), e))?;
        if read == 0 || !text.ends_with('\n') {
            return Ok(high_water);
        }

        line += 1;
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            high_water = high_water.max(parse_line(trimmed, line)?.position);
        }
    }
}

impl StreamCursor for FileCursor {
    fn open(&mut self, start: Position) -> CursorResult<()> {
        let file = File::open(&self.path).map_err(|e| unavailable(&self.path, e))?;

        self.reader = Some(BufReader::new(file));
        self.start = start;
        self.partial.clear();
        self.line = 0;
        self.high_water = start;
        Ok(())
    }

    fn pull(&mut self, limit: Option<usize>) -> CursorResult<Pull> {
        let mut events = Vec::new();
        let mut at_end = self.read_into(&mut events, limit)?;

        // Idle: give the producer one poll interval before reporting drained.
        if events.is_empty() && at_end && !self.poll_interval.is_zero() {
            thread::sleep(self.poll_interval);
            at_end = self.read_into(&mut events, limit)?;
        }

        let status = if at_end {
            CursorStatus::Drained
        } else {
            CursorStatus::MoreAvailable
        };
        Ok(Pull::new(events, status))
    }

    fn current_upstream_time(&mut self) -> CursorResult<Position> {
        match self.reader {
            Some(_) => Ok(self.high_water),
            None => scan_high_water(&self.path),
        }
    }
}
