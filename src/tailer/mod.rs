//! Checkpointed tailer
//!
//! Wraps a [`StreamCursor`] and a [`PositionStore`]:
//! - Resumes from the stored checkpoint, or from the default start
//! - Hands every event to the consumer in position order
//! - Tracks the delivered and committed positions
//! - Commits on the delivery path (continuous) or on request (batched)
//!
//! Delivery is at-least-once. The committed position never passes the
//! delivered one, so a crash replays at most what was delivered after the
//! last commit.
//!
//! The tailer is single-threaded and pull-driven. Nothing runs in the
//! background; a host that wants concurrency runs one tailer per consumer.

mod errors;
mod policy;
mod state;

pub use errors::{BoxError, TailError, TailResult};
pub use policy::{evaluate as evaluate_commit, CommitDecision, COMMIT_INTERVAL_SECS};
pub use state::{Phase, StartFrom, TailerMode, TailerState};

use std::sync::Arc;

use uuid::Uuid;

use crate::cursor::{CursorError, CursorStatus, Event, StreamCursor};
use crate::observability::{LogSink, TailerEvent, TracingLogSink};
use crate::position::Position;
use crate::store::PositionStore;

/// Outcome of one `deliver_next` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Events were delivered and the cursor has more right now
    Delivered(usize),
    /// Events were delivered and the cursor is caught up
    EndOfBatch(usize),
    /// Nothing arrived; the delivered position moved to upstream time
    Empty,
    /// The feed ended; `n` events were delivered before it did
    Closed(usize),
}

impl Delivery {
    /// Number of events handed to the consumer.
    pub fn count(&self) -> usize {
        match self {
            Delivery::Delivered(n) | Delivery::EndOfBatch(n) | Delivery::Closed(n) => *n,
            Delivery::Empty => 0,
        }
    }

    /// True when the cursor has nothing more to give right now.
    pub fn is_caught_up(&self) -> bool {
        !matches!(self, Delivery::Delivered(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Delivery::Closed(_))
    }
}

/// Outcome of a commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Position durably written
    Committed(Position),
    /// Throttle said not yet
    Throttled,
    /// Nothing delivered since start
    NothingDelivered,
}

/// Tails one consumer's view of a change feed.
pub struct CheckpointedTailer<C, S> {
    cursor: C,
    store: S,
    consumer_id: String,
    default_start: StartFrom,
    pull_limit: Option<usize>,
    log: Arc<dyn LogSink>,
    run_id: Uuid,
    state: TailerState,
    phase: Phase,
}

impl<C: StreamCursor, S: PositionStore> CheckpointedTailer<C, S> {
    /// Creates a tailer. Nothing is read or opened until `start`/`resume`.
    pub fn new(
        cursor: C,
        store: S,
        consumer_id: impl Into<String>,
        mode: TailerMode,
        default_start: StartFrom,
    ) -> Self {
        Self {
            cursor,
            store,
            consumer_id: consumer_id.into(),
            default_start,
            pull_limit: None,
            log: Arc::new(TracingLogSink),
            run_id: Uuid::new_v4(),
            state: TailerState::new(mode),
            phase: Phase::Uninitialized,
        }
    }

    /// Caps the number of events per pull. `None` or zero means no cap.
    pub fn with_pull_limit(mut self, limit: Option<usize>) -> Self {
        self.pull_limit = limit.filter(|l| *l > 0);
        self
    }

    pub fn with_log_sink(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = log;
        self
    }

    pub fn consumer_id(&self) -> &str {
        &self.consumer_id
    }

    pub fn mode(&self) -> TailerMode {
        self.state.mode()
    }

    pub fn state(&self) -> &TailerState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Identifies this tailer instance in log lines.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn pull_limit(&self) -> Option<usize> {
        self.pull_limit
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cursor(&self) -> &C {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut C {
        &mut self.cursor
    }

    pub fn into_parts(self) -> (C, S) {
        (self.cursor, self.store)
    }

    /// Reads the checkpoint and opens the cursor there.
    ///
    /// Without a stored checkpoint the default start is used. Delivered and
    /// committed positions from an earlier run of this value are kept.
    /// Returns the position the cursor was opened at.
    pub fn start(&mut self) -> TailResult<Position> {
        let run_id = self.run_id.to_string();
        self.emit_resume_start(&run_id);

        let stored = match self.store.read(&self.consumer_id) {
            Ok(stored) => stored,
            Err(source) => {
                self.phase = Phase::Halted;
                return Err(TailError::CheckpointReadFailed {
                    consumer_id: self.consumer_id.clone(),
                    source,
                });
            }
        };

        let start = match stored {
            Some(position) => position,
            None => {
                let start = match self.default_start {
                    StartFrom::Position(position) => position,
                    StartFrom::UpstreamNow => match self.cursor.current_upstream_time() {
                        Ok(now) => now,
                        Err(err) => return Err(self.open_failed(None, err)),
                    },
                };
                let start_text = start.to_string();
                self.log.emit(
                    TailerEvent::CheckpointMissing,
                    &[
                        ("consumer_id", self.consumer_id.as_str()),
                        ("start", start_text.as_str()),
                        ("run_id", run_id.as_str()),
                    ],
                );
                start
            }
        };

        self.open_cursor(start, &run_id)
    }

    /// Opens the cursor at `position`, ignoring any stored checkpoint.
    ///
    /// The store is neither read nor written. The next commit overwrites
    /// the stored checkpoint with whatever is delivered from here.
    pub fn start_at(&mut self, position: Position) -> TailResult<Position> {
        let run_id = self.run_id.to_string();
        self.emit_resume_start(&run_id);

        let start_text = position.to_string();
        self.log.emit(
            TailerEvent::StartOverridden,
            &[
                ("consumer_id", self.consumer_id.as_str()),
                ("start", start_text.as_str()),
                ("run_id", run_id.as_str()),
            ],
        );
        self.open_cursor(position, &run_id)
    }

    /// Starts, then delivers until the cursor closes or something fails.
    ///
    /// Blocks for as long as the cursor keeps producing. Calling it again
    /// after a failure re-reads the checkpoint and replays from there.
    pub fn resume<F, E>(&mut self, callback: F) -> TailResult<()>
    where
        F: FnMut(Event) -> Result<(), E>,
        E: Into<BoxError>,
    {
        self.start()?;
        self.deliver_until_closed(callback)
    }

    /// Like [`resume`](Self::resume), but starts at `position` instead of
    /// the stored checkpoint.
    pub fn resume_at<F, E>(&mut self, position: Position, callback: F) -> TailResult<()>
    where
        F: FnMut(Event) -> Result<(), E>,
        E: Into<BoxError>,
    {
        self.start_at(position)?;
        self.deliver_until_closed(callback)
    }

    fn deliver_until_closed<F, E>(&mut self, mut callback: F) -> TailResult<()>
    where
        F: FnMut(Event) -> Result<(), E>,
        E: Into<BoxError>,
    {
        loop {
            if self.deliver_next(&mut callback)?.is_closed() {
                return Ok(());
            }
        }
    }

    /// Pulls once and hands each event to `callback`, in order.
    ///
    /// Upstream time is sampled before the pull. When the pull comes back
    /// empty and merely drained, the delivered position moves to that
    /// sample; continuous mode then runs the throttle once.
    ///
    /// The callback runs to completion before the delivered position moves
    /// past its event. A callback error halts the tailer with the delivered
    /// position still at the previous event.
    pub fn deliver_next<F, E>(&mut self, mut callback: F) -> TailResult<Delivery>
    where
        F: FnMut(Event) -> Result<(), E>,
        E: Into<BoxError>,
    {
        if self.phase != Phase::Running {
            return Err(TailError::NotRunning { phase: self.phase });
        }

        let upstream_now = match self.cursor.current_upstream_time() {
            Ok(now) => now,
            Err(err) => return Err(self.read_failed(err)),
        };
        let pull = match self.cursor.pull(self.pull_limit) {
            Ok(pull) => pull,
            Err(err) => return Err(self.read_failed(err)),
        };

        if pull.is_idle() {
            let upstream_text = upstream_now.to_string();
            self.log.emit(
                TailerEvent::IdleAdvance,
                &[
                    ("consumer_id", self.consumer_id.as_str()),
                    ("upstream_time", upstream_text.as_str()),
                ],
            );
            self.record_delivered(upstream_now);
            self.commit_on_delivery_path()?;
            return Ok(Delivery::Empty);
        }

        let count = pull.events.len();
        for event in pull.events {
            let position = event.position;
            if let Err(err) = callback(event) {
                let source: BoxError = err.into();
                let position_text = position.to_string();
                let message = source.to_string();
                self.log.emit(
                    TailerEvent::CallbackFailed,
                    &[
                        ("consumer_id", self.consumer_id.as_str()),
                        ("position", position_text.as_str()),
                        ("error", message.as_str()),
                    ],
                );
                self.phase = Phase::Halted;
                return Err(TailError::ConsumerCallbackFailed { position, source });
            }
            self.record_delivered(position);
            self.commit_on_delivery_path()?;
        }

        if count > 0 {
            let count_text = count.to_string();
            let last_text = self
                .state
                .last_delivered()
                .map(|p| p.to_string())
                .unwrap_or_default();
            self.log.emit(
                TailerEvent::BatchDelivered,
                &[
                    ("consumer_id", self.consumer_id.as_str()),
                    ("count", count_text.as_str()),
                    ("last_delivered", last_text.as_str()),
                ],
            );
        }

        Ok(match pull.status {
            CursorStatus::MoreAvailable => Delivery::Delivered(count),
            CursorStatus::Drained => Delivery::EndOfBatch(count),
            CursorStatus::Closed => {
                self.log
                    .emit(TailerEvent::CursorClosed, &[("consumer_id", self.consumer_id.as_str())]);
                Delivery::Closed(count)
            }
        })
    }

    /// Commits the delivered position if the throttle allows it.
    ///
    /// Runs automatically after every delivery in continuous mode. A write
    /// failure leaves the committed position unchanged.
    pub fn maybe_commit(&mut self) -> TailResult<CommitOutcome> {
        match policy::evaluate(&self.state) {
            CommitDecision::NothingDelivered => Ok(CommitOutcome::NothingDelivered),
            CommitDecision::Throttled => Ok(CommitOutcome::Throttled),
            CommitDecision::Due(position) => self.save(position),
        }
    }

    /// Commits the delivered position now, ignoring the throttle.
    ///
    /// Only valid in batched mode. Call it once the consumer has durably
    /// handled everything delivered so far.
    pub fn commit_batch(&mut self) -> TailResult<CommitOutcome> {
        if self.state.mode() != TailerMode::Batched {
            return Err(TailError::BatchModeRequired);
        }

        let Some(position) = self.state.last_delivered() else {
            return Ok(CommitOutcome::NothingDelivered);
        };

        let position_text = position.to_string();
        self.log.emit(
            TailerEvent::BatchCommit,
            &[
                ("consumer_id", self.consumer_id.as_str()),
                ("position", position_text.as_str()),
            ],
        );
        self.save(position)
    }

    fn commit_on_delivery_path(&mut self) -> TailResult<()> {
        if self.state.mode() != TailerMode::Continuous {
            return Ok(());
        }
        if let Err(err) = self.maybe_commit() {
            self.phase = Phase::Halted;
            return Err(err);
        }
        Ok(())
    }

    fn save(&mut self, position: Position) -> TailResult<CommitOutcome> {
        let position_text = position.to_string();

        if let Err(source) = self.store.write(&self.consumer_id, position) {
            let message = source.to_string();
            self.log.emit(
                TailerEvent::CheckpointWriteFailed,
                &[
                    ("consumer_id", self.consumer_id.as_str()),
                    ("position", position_text.as_str()),
                    ("error", message.as_str()),
                ],
            );
            return Err(TailError::CheckpointWriteFailed { position, source });
        }

        self.state.record_committed(position);
        let time = position.to_rfc3339();
        let run_id = self.run_id.to_string();
        self.log.emit(
            TailerEvent::CheckpointSaved,
            &[
                ("consumer_id", self.consumer_id.as_str()),
                ("position", position_text.as_str()),
                ("time", time.as_str()),
                ("run_id", run_id.as_str()),
            ],
        );
        Ok(CommitOutcome::Committed(position))
    }

    fn record_delivered(&mut self, position: Position) {
        if let Err(current) = self.state.record_delivered(position) {
            let position_text = position.to_string();
            let current_text = current.to_string();
            self.log.emit(
                TailerEvent::PositionRegressed,
                &[
                    ("consumer_id", self.consumer_id.as_str()),
                    ("position", position_text.as_str()),
                    ("last_delivered", current_text.as_str()),
                ],
            );
        }
    }

    fn emit_resume_start(&self, run_id: &str) {
        self.log.emit(
            TailerEvent::ResumeStart,
            &[
                ("consumer_id", self.consumer_id.as_str()),
                ("mode", self.state.mode().as_str()),
                ("run_id", run_id),
            ],
        );
    }

    fn open_cursor(&mut self, start: Position, run_id: &str) -> TailResult<Position> {
        if let Err(err) = self.cursor.open(start) {
            return Err(self.open_failed(Some(start), err));
        }

        self.phase = Phase::Running;
        let start_text = start.to_string();
        self.log.emit(
            TailerEvent::CursorOpened,
            &[
                ("consumer_id", self.consumer_id.as_str()),
                ("start", start_text.as_str()),
                ("run_id", run_id),
            ],
        );
        Ok(start)
    }

    fn open_failed(&mut self, start: Option<Position>, err: CursorError) -> TailError {
        let start_text = start.map(|p| p.to_string()).unwrap_or_default();
        let message = err.to_string();
        self.log.emit(
            TailerEvent::CursorOpenFailed,
            &[
                ("consumer_id", self.consumer_id.as_str()),
                ("start", start_text.as_str()),
                ("error", message.as_str()),
            ],
        );
        self.phase = Phase::Halted;
        TailError::UpstreamUnavailable(err)
    }

    fn read_failed(&mut self, err: CursorError) -> TailError {
        let message = err.to_string();
        self.log.emit(
            TailerEvent::CursorReadFailed,
            &[("consumer_id", self.consumer_id.as_str()), ("error", message.as_str())],
        );
        self.phase = Phase::Halted;
        TailError::CursorReadFailed(err)
    }
}
