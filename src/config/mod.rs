//! Tailer configuration
//!
//! Loaded from a single JSON file. Optional fields carry serde defaults and
//! the whole config is validated before anything is opened.
//!
//! ```json
//! {
//!   "consumer_id": "orders-indexer",
//!   "feed_path": "/var/lib/feed/orders.jsonl",
//!   "store_dir": "/var/lib/feedtail",
//!   "mode": "batched",
//!   "start_from": "now",
//!   "pull_limit": 500
//! }
//! ```

mod errors;

pub use errors::{ConfigError, ConfigResult};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cursor::FileCursor;
use crate::observability::{JsonLogSink, LogSink, TracingLogSink};
use crate::position::Position;
use crate::store::{validate_consumer_id, FilePositionStore};
use crate::tailer::{CheckpointedTailer, StartFrom, TailerMode};

/// Where tailer log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Through the global `tracing` subscriber
    #[default]
    Tracing,
    /// One JSON object per line on stderr
    Json,
}

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TailerConfig {
    /// Consumer identity, also the checkpoint key (required)
    pub consumer_id: String,

    /// JSON-lines feed to tail (required)
    pub feed_path: PathBuf,

    /// Directory holding checkpoint files (required)
    pub store_dir: PathBuf,

    /// Commit mode (optional, default "continuous")
    #[serde(default = "default_mode")]
    pub mode: TailerMode,

    /// Start position when no checkpoint exists: "now" or "seconds:ordinal"
    #[serde(default = "default_start_from")]
    pub start_from: String,

    /// Max events per pull (optional, default unbounded)
    #[serde(default)]
    pub pull_limit: Option<usize>,

    /// How long an idle pull waits for new lines (optional, default 1000)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Log destination (optional, default "tracing")
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_mode() -> TailerMode {
    TailerMode::Continuous
}
fn default_start_from() -> String {
    "now".to_string()
}
fn default_poll_interval_ms() -> u64 {
    1000
}

impl TailerConfig {
    /// Minimal config with every optional field at its default.
    pub fn new(
        consumer_id: impl Into<String>,
        feed_path: impl Into<PathBuf>,
        store_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            feed_path: feed_path.into(),
            store_dir: store_dir.into(),
            mode: default_mode(),
            start_from: default_start_from(),
            pull_limit: None,
            poll_interval_ms: default_poll_interval_ms(),
            log_format: LogFormat::default(),
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: TailerConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        validate_consumer_id(&self.consumer_id)
            .map_err(|e| ConfigError::invalid("consumer_id", e.to_string()))?;

        if self.feed_path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("feed_path", "must not be empty"));
        }
        if self.store_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("store_dir", "must not be empty"));
        }

        if self.pull_limit == Some(0) {
            return Err(ConfigError::invalid("pull_limit", "must be > 0"));
        }

        self.start_from()?;
        Ok(())
    }

    /// Parsed `start_from`.
    pub fn start_from(&self) -> ConfigResult<StartFrom> {
        if self.start_from == "now" {
            return Ok(StartFrom::UpstreamNow);
        }
        self.start_from
            .parse::<Position>()
            .map(StartFrom::Position)
            .map_err(|e| {
                ConfigError::invalid(
                    "start_from",
                    format!("'{}': expected \"now\" or \"seconds:ordinal\" ({})", self.start_from, e),
                )
            })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn store(&self) -> FilePositionStore {
        FilePositionStore::new(&self.store_dir)
    }

    pub fn cursor(&self) -> FileCursor {
        FileCursor::new(&self.feed_path, self.poll_interval())
    }

    pub fn log_sink(&self) -> Arc<dyn LogSink> {
        match self.log_format {
            LogFormat::Tracing => Arc::new(TracingLogSink),
            LogFormat::Json => Arc::new(JsonLogSink::stderr()),
        }
    }

    /// Wires a tailer over the file cursor and file store.
    pub fn build_tailer(&self) -> ConfigResult<CheckpointedTailer<FileCursor, FilePositionStore>> {
        let tailer = CheckpointedTailer::new(
            self.cursor(),
            self.store(),
            self.consumer_id.clone(),
            self.mode,
            self.start_from()?,
        )
        .with_pull_limit(self.pull_limit)
        .with_log_sink(self.log_sink());
        Ok(tailer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"{
        "consumer_id": "orders",
        "feed_path": "/tmp/feed.jsonl",
        "store_dir": "/tmp/feedtail"
    }"#;

    #[test]
    fn test_defaults() {
        let config = TailerConfig::from_json(MINIMAL).unwrap();

        assert_eq!(config.mode, TailerMode::Continuous);
        assert_eq!(config.start_from().unwrap(), StartFrom::UpstreamNow);
        assert_eq!(config.pull_limit, None);
        assert_eq!(config.poll_interval(), Duration::from_millis(1000));
        assert_eq!(config.log_format, LogFormat::Tracing);
    }

    #[test]
    fn test_full_config() {
        let config = TailerConfig::from_json(
            r#"{
                "consumer_id": "orders",
                "feed_path": "feed.jsonl",
                "store_dir": "state",
                "mode": "batched",
                "start_from": "1000:3",
                "pull_limit": 50,
                "poll_interval_ms": 10,
                "log_format": "json"
            }"#,
        )
        .unwrap();

        assert_eq!(config.mode, TailerMode::Batched);
        assert_eq!(
            config.start_from().unwrap(),
            StartFrom::Position(Position::new(1000, 3))
        );
        assert_eq!(config.pull_limit, Some(50));
        assert_eq!(config.log_format, LogFormat::Json);

        let tailer = config.build_tailer().unwrap();
        assert_eq!(tailer.mode(), TailerMode::Batched);
        assert_eq!(tailer.pull_limit(), Some(50));
        assert_eq!(tailer.consumer_id(), "orders");
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = TailerConfig::new("orders", "feed.jsonl", "state");
        assert!(config.validate().is_ok());

        config.start_from = "yesterday".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "start_from", .. }));

        config.start_from = "now".to_string();
        config.pull_limit = Some(0);
        assert_eq!(config.validate().unwrap_err().as_code(), "FEEDTAIL_CONFIG_INVALID");

        config.pull_limit = None;
        config.consumer_id = "../escape".to_string();
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Invalid { field: "consumer_id", .. }
        ));
    }

    #[test]
    fn test_rejects_unknown_mode_and_fields() {
        let bad_mode = MINIMAL.replace("\"orders\",", "\"orders\", \"mode\": \"eventually\",");
        assert!(matches!(
            TailerConfig::from_json(&bad_mode),
            Err(ConfigError::Parse(_))
        ));

        let unknown = MINIMAL.replace("\"orders\",", "\"orders\", \"verbose\": true,");
        assert!(matches!(
            TailerConfig::from_json(&unknown),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = TailerConfig::load(file.path()).unwrap();
        assert_eq!(config.consumer_id, "orders");

        let missing = TailerConfig::load(Path::new("/nonexistent/feedtail.json"));
        assert_eq!(missing.unwrap_err().as_code(), "FEEDTAIL_CONFIG_READ");
    }
}
