//! File-backed position store
//!
//! Layout: `<dir>/<consumer_id>.checkpoint.json`, one record per consumer.
//!
//! A write is durable before it returns:
//! 1. Serialize the record to `<consumer_id>.checkpoint.json.tmp`
//! 2. fsync the temp file
//! 3. Rename over the live record
//! 4. fsync the directory
//!
//! A crash at any step leaves either the previous record or the new one,
//! never a torn file. Reads verify the record checksum.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};
use super::{validate_consumer_id, PositionStore};
use crate::position::Position;

/// On-disk record format version
pub const RECORD_FORMAT_VERSION: u8 = 1;

const RECORD_SUFFIX: &str = ".checkpoint.json";

/// Durable checkpoint record for one consumer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckpointRecord {
    pub consumer_id: String,
    pub position: Position,
    /// Wall-clock time of the write (RFC3339)
    pub written_at: String,
    /// CRC32 of the position's text form
    pub checksum: u32,
    pub format_version: u8,
}

impl CheckpointRecord {
    /// Builds a record stamped with the current time.
    pub fn new(consumer_id: &str, position: Position) -> Self {
        Self {
            consumer_id: consumer_id.to_string(),
            position,
            written_at: Utc::now().to_rfc3339(),
            checksum: position_checksum(&position),
            format_version: RECORD_FORMAT_VERSION,
        }
    }

    /// Checks that the record belongs to `consumer_id` and is intact.
    pub fn verify(&self, consumer_id: &str) -> StoreResult<()> {
        if self.format_version != RECORD_FORMAT_VERSION {
            return Err(StoreError::corrupt(
                consumer_id,
                format!("unsupported format_version {}", self.format_version),
            ));
        }
        if self.consumer_id != consumer_id {
            return Err(StoreError::corrupt(
                consumer_id,
                format!("record belongs to '{}'", self.consumer_id),
            ));
        }
        if position_checksum(&self.position) != self.checksum {
            return Err(StoreError::corrupt(consumer_id, "checksum mismatch"));
        }
        Ok(())
    }
}

fn position_checksum(position: &Position) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(position.to_string().as_bytes());
    hasher.finalize()
}

/// Position store keeping one JSON record per consumer in a directory.
#[derive(Debug, Clone)]
pub struct FilePositionStore {
    dir: PathBuf,
}

impl FilePositionStore {
    /// Store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `consumer_id`.
    pub fn record_path(&self, consumer_id: &str) -> PathBuf {
        self.dir.join(format!("{}{}", consumer_id, RECORD_SUFFIX))
    }

    /// Reads and verifies the full record for `consumer_id`.
    pub fn read_record(&self, consumer_id: &str) -> StoreResult<Option<CheckpointRecord>> {
        validate_consumer_id(consumer_id)?;
        let path = self.record_path(consumer_id);

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::io(
                    format!("failed to read checkpoint {}", path.display()),
                    e,
                ))
            }
        };

        let record: CheckpointRecord = serde_json::from_str(&contents)
            .map_err(|e| StoreError::corrupt(consumer_id, format!("invalid JSON: {}", e)))?;
        record.verify(consumer_id)?;

        Ok(Some(record))
    }

    /// Removes the record for `consumer_id`. Missing records are not an error.
    pub fn clear(&self, consumer_id: &str) -> StoreResult<bool> {
        validate_consumer_id(consumer_id)?;
        let path = self.record_path(consumer_id);

        match fs::remove_file(&path) {
            Ok(()) => {
                self.sync_dir()?;
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(
                format!("failed to remove checkpoint {}", path.display()),
                e,
            )),
        }
    }

    /// Consumer ids that currently have a record, sorted.
    pub fn consumers(&self) -> StoreResult<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::io(
                    format!("failed to list {}", self.dir.display()),
                    e,
                ))
            }
        };

        let mut consumers = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| StoreError::io(format!("failed to list {}", self.dir.display()), e))?;
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(|n| n.strip_suffix(RECORD_SUFFIX)) {
                if validate_consumer_id(id).is_ok() {
                    consumers.push(id.to_string());
                }
            }
        }
        consumers.sort();
        Ok(consumers)
    }

    fn sync_dir(&self) -> StoreResult<()> {
        let dir = OpenOptions::new().read(true).open(&self.dir).map_err(|e| {
            StoreError::io(
                format!("failed to open {} for fsync", self.dir.display()),
                e,
            )
        })?;
        dir.sync_all()
            .map_err(|e| StoreError::io(format!("failed to fsync {}", self.dir.display()), e))
    }
}

impl PositionStore for FilePositionStore {
    fn read(&self, consumer_id: &str) -> StoreResult<Option<Position>> {
        Ok(self.read_record(consumer_id)?.map(|record| record.position))
    }

    fn write(&self, consumer_id: &str, position: Position) -> StoreResult<()> {
        validate_consumer_id(consumer_id)?;

        let record = CheckpointRecord::new(consumer_id, position);
        let json = serde_json::to_string_pretty(&record).map_err(|e| {
            StoreError::io(
                "failed to serialize checkpoint",
                io::Error::new(io::ErrorKind::InvalidData, e),
            )
        })?;

        fs::create_dir_all(&self.dir).map_err(|e| {
            StoreError::io(format!("failed to create {}", self.dir.display()), e)
        })?;

        let path = self.record_path(consumer_id);
        let tmp_path = path.with_extension("json.tmp");

        let mut file = File::create(&tmp_path).map_err(|e| {
            StoreError::io(format!("failed to create {}", tmp_path.display()), e)
        })?;
        file.write_all(json.as_bytes()).map_err(|e| {
            StoreError::io(format!("failed to write {}", tmp_path.display()), e)
        })?;
        file.sync_all().map_err(|e| {
            StoreError::io(format!("failed to fsync {}", tmp_path.display()), e)
        })?;
        drop(file);

        fs::rename(&tmp_path, &path).map_err(|e| {
            StoreError::io(
                format!("failed to rename {} into place", tmp_path.display()),
                e,
            )
        })?;

        self.sync_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_record_reads_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FilePositionStore::new(temp_dir.path().join("checkpoints"));

        assert_eq!(store.read("orders").unwrap(), None);
        assert!(store.consumers().unwrap().is_empty());
    }

    #[test]
    fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let store = FilePositionStore::new(temp_dir.path().join("checkpoints"));

        store.write("orders", Position::new(1065, 3)).unwrap();
        assert_eq!(store.read("orders").unwrap(), Some(Position::new(1065, 3)));

        let record = store.read_record("orders").unwrap().unwrap();
        assert_eq!(record.consumer_id, "orders");
        assert_eq!(record.format_version, RECORD_FORMAT_VERSION);
        assert!(chrono::DateTime::parse_from_rfc3339(&record.written_at).is_ok());
    }

    #[test]
    fn test_write_overwrites_and_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FilePositionStore::new(temp_dir.path());

        store.write("orders", Position::new(10, 0)).unwrap();
        store.write("orders", Position::new(99, 2)).unwrap();

        assert_eq!(store.read("orders").unwrap(), Some(Position::new(99, 2)));
        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["orders.checkpoint.json".to_string()]);
    }

    #[test]
    fn test_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = FilePositionStore::new(temp_dir.path());
            store.write("orders", Position::new(7, 7)).unwrap();
        }
        let store = FilePositionStore::new(temp_dir.path());
        assert_eq!(store.read("orders").unwrap(), Some(Position::new(7, 7)));
    }

    #[test]
    fn test_checksum_mismatch_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let store = FilePositionStore::new(temp_dir.path());
        store.write("orders", Position::new(100, 1)).unwrap();

        let path = store.record_path("orders");
        let tampered = fs::read_to_string(&path)
            .unwrap()
            .replace("\"seconds\": 100", "\"seconds\": 900");
        fs::write(&path, tampered).unwrap();

        assert!(matches!(
            store.read("orders"),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_invalid_json_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let store = FilePositionStore::new(temp_dir.path());
        fs::write(store.record_path("orders"), "not json").unwrap();

        assert!(matches!(
            store.read("orders"),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_record_for_other_consumer_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let store = FilePositionStore::new(temp_dir.path());
        store.write("a", Position::new(1, 0)).unwrap();
        fs::copy(store.record_path("a"), store.record_path("b")).unwrap();

        assert!(matches!(store.read("b"), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_clear_and_consumers() {
        let temp_dir = TempDir::new().unwrap();
        let store = FilePositionStore::new(temp_dir.path());
        store.write("b", Position::new(2, 0)).unwrap();
        store.write("a", Position::new(1, 0)).unwrap();

        assert_eq!(store.consumers().unwrap(), vec!["a", "b"]);
        assert!(store.clear("a").unwrap());
        assert!(!store.clear("a").unwrap());
        assert_eq!(store.read("a").unwrap(), None);
        assert_eq!(store.consumers().unwrap(), vec!["b"]);
    }

    #[test]
    fn test_invalid_consumer_never_touches_disk() {
        let temp_dir = TempDir::new().unwrap();
        let store = FilePositionStore::new(temp_dir.path());

        assert!(matches!(
            store.write("../escape", Position::default()),
            Err(StoreError::InvalidConsumerId(_))
        ));
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }
}
