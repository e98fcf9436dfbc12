//! Durable checkpoint storage
//!
//! A position store keeps exactly one "last committed position" per consumer
//! identity. Every write overwrites the previous value; nothing is appended.
//!
//! Implementations:
//! - [`MemoryPositionStore`]: process-local map, for tests and embedding
//! - [`FilePositionStore`]: one fsynced JSON record per consumer on disk

mod errors;
mod file;
mod memory;

pub use errors::{StoreError, StoreResult};
pub use file::{CheckpointRecord, FilePositionStore, RECORD_FORMAT_VERSION};
pub use memory::MemoryPositionStore;

use std::sync::Arc;

use crate::position::Position;

/// Durable "last committed position" keyed by consumer identity.
pub trait PositionStore {
    /// Last committed position for `consumer_id`, or `None` if nothing was
    /// ever written.
    fn read(&self, consumer_id: &str) -> StoreResult<Option<Position>>;

    /// Durably replace the committed position for `consumer_id`.
    ///
    /// Must not return `Ok` before the value would survive a crash.
    fn write(&self, consumer_id: &str, position: Position) -> StoreResult<()>;
}

impl<S: PositionStore + ?Sized> PositionStore for &S {
    fn read(&self, consumer_id: &str) -> StoreResult<Option<Position>> {
        (**self).read(consumer_id)
    }

    fn write(&self, consumer_id: &str, position: Position) -> StoreResult<()> {
        (**self).write(consumer_id, position)
    }
}

impl<S: PositionStore + ?Sized> PositionStore for Arc<S> {
    fn read(&self, consumer_id: &str) -> StoreResult<Option<Position>> {
        (**self).read(consumer_id)
    }

    fn write(&self, consumer_id: &str, position: Position) -> StoreResult<()> {
        (**self).write(consumer_id, position)
    }
}

impl<S: PositionStore + ?Sized> PositionStore for Box<S> {
    fn read(&self, consumer_id: &str) -> StoreResult<Option<Position>> {
        (**self).read(consumer_id)
    }

    fn write(&self, consumer_id: &str, position: Position) -> StoreResult<()> {
        (**self).write(consumer_id, position)
    }
}

/// Checks that a consumer identity is usable as a store key.
///
/// Allowed: ASCII letters, digits, `_`, `-`, `.`; not empty, not starting
/// with `.`, at most 128 characters.
pub fn validate_consumer_id(consumer_id: &str) -> StoreResult<()> {
    let valid = !consumer_id.is_empty()
        && consumer_id.len() <= 128
        && !consumer_id.starts_with('.')
        && consumer_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidConsumerId(consumer_id.to_string()))
    }
}
