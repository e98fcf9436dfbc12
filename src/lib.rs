//! feedtail - checkpointed change-feed tailing
//!
//! A [`CheckpointedTailer`] reads an ordered change feed through a
//! [`StreamCursor`], hands every event to a consumer callback, and persists
//! the highest safely-resumable [`Position`] through a [`PositionStore`] so a
//! restart resumes where the last run left off. Delivery is at-least-once.
//!
//! ```no_run
//! use feedtail::cursor::FileCursor;
//! use feedtail::store::FilePositionStore;
//! use feedtail::tailer::{CheckpointedTailer, StartFrom, TailerMode};
//! use std::time::Duration;
//!
//! let mut tailer = CheckpointedTailer::new(
//!     FileCursor::new("orders.jsonl", Duration::from_secs(1)),
//!     FilePositionStore::new("state"),
//!     "orders-indexer",
//!     TailerMode::Continuous,
//!     StartFrom::UpstreamNow,
//! );
//! tailer
//!     .resume(|event| -> Result<(), std::io::Error> {
//!         println!("{}", event.payload);
//!         Ok(())
//!     })
//!     .unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod cursor;
pub mod observability;
pub mod position;
pub mod store;
pub mod tailer;

pub use cursor::{Event, StreamCursor};
pub use position::Position;
pub use store::PositionStore;
pub use tailer::{CheckpointedTailer, CommitOutcome, Delivery, StartFrom, TailError, TailerMode};
