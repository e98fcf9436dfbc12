//! In-memory position store
//!
//! Not durable. Records every write so callers can assert on commit cadence,
//! and can be told to reject writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use super::errors::{StoreError, StoreResult};
use super::{validate_consumer_id, PositionStore};
use crate::position::Position;

/// Process-local position store.
#[derive(Debug, Default)]
pub struct MemoryPositionStore {
    positions: RwLock<HashMap<String, Position>>,
    history: RwLock<Vec<(String, Position)>>,
    reject_writes: AtomicBool,
    reject_reads: AtomicBool,
}

impl MemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a committed position for `consumer_id`.
    pub fn with_position(consumer_id: &str, position: Position) -> Self {
        let store = Self::new();
        store
            .positions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(consumer_id.to_string(), position);
        store
    }

    /// While set, every write fails with [`StoreError::WriteRejected`].
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// While set, every read fails with [`StoreError::Unavailable`].
    pub fn reject_reads(&self, reject: bool) {
        self.reject_reads.store(reject, Ordering::SeqCst);
    }

    /// Every successful write, oldest first.
    pub fn history(&self) -> Vec<(String, Position)> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Positions successfully written for one consumer, oldest first.
    pub fn writes_for(&self, consumer_id: &str) -> Vec<Position> {
        self.history()
            .into_iter()
            .filter(|(id, _)| id == consumer_id)
            .map(|(_, pos)| pos)
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl PositionStore for MemoryPositionStore {
    fn read(&self, consumer_id: &str) -> StoreResult<Option<Position>> {
        validate_consumer_id(consumer_id)?;
        if self.reject_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads rejected".to_string()));
        }

        Ok(self
            .positions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(consumer_id)
            .copied())
    }

    fn write(&self, consumer_id: &str, position: Position) -> StoreResult<()> {
        validate_consumer_id(consumer_id)?;
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected(format!(
                "write of {} for '{}' rejected",
                position, consumer_id
            )));
        }

        self.positions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(consumer_id.to_string(), position);
        self.history
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((consumer_id.to_string(), position));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_missing_is_none() {
        let store = MemoryPositionStore::new();
        assert_eq!(store.read("orders").unwrap(), None);
    }

    #[test]
    fn test_write_overwrites() {
        let store = MemoryPositionStore::new();
        store.write("orders", Position::new(10, 1)).unwrap();
        store.write("orders", Position::new(90, 4)).unwrap();

        assert_eq!(store.read("orders").unwrap(), Some(Position::new(90, 4)));
        assert_eq!(
            store.writes_for("orders"),
            vec![Position::new(10, 1), Position::new(90, 4)]
        );
    }

    #[test]
    fn test_consumers_are_isolated() {
        let store = MemoryPositionStore::with_position("a", Position::new(1, 0));
        store.write("b", Position::new(2, 0)).unwrap();

        assert_eq!(store.read("a").unwrap(), Some(Position::new(1, 0)));
        assert_eq!(store.read("b").unwrap(), Some(Position::new(2, 0)));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_rejected_write_leaves_value() {
        let store = MemoryPositionStore::with_position("a", Position::new(1, 0));
        store.reject_writes(true);

        let err = store.write("a", Position::new(9, 0)).unwrap_err();
        assert!(matches!(err, StoreError::WriteRejected(_)));
        assert_eq!(store.read("a").unwrap(), Some(Position::new(1, 0)));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_rejected_reads() {
        let store = MemoryPositionStore::new();
        store.reject_reads(true);
        assert!(matches!(store.read("a"), Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_invalid_consumer_rejected() {
        let store = MemoryPositionStore::new();
        assert!(matches!(
            store.write("a/b", Position::default()),
            Err(StoreError::InvalidConsumerId(_))
        ));
    }
}
