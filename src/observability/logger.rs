//! Structured log sinks
//!
//! The tailer never logs through a global. It is handed a [`LogSink`] and
//! every line it emits goes there: one event name, one severity, and a flat
//! list of string fields.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use serde_json::{Map, Value};

use super::events::TailerEvent;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-batch detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
    /// Unrecoverable
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Destination for structured log lines.
pub trait LogSink: Send + Sync {
    fn log(&self, severity: Severity, event: &str, fields: &[(&str, &str)]);

    /// Logs a typed tailer event at its own severity.
    fn emit(&self, event: TailerEvent, fields: &[(&str, &str)]) {
        self.log(event.severity(), event.as_str(), fields);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogSink;

impl LogSink for NullLogSink {
    fn log(&self, _severity: Severity, _event: &str, _fields: &[(&str, &str)]) {}
}

/// Forwards to the `tracing` macros under the `feedtail` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

struct FieldList<'a>(&'a [(&'a str, &'a str)]);

impl fmt::Display for FieldList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

impl LogSink for TracingLogSink {
    fn log(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let fields = FieldList(fields);
        match severity {
            Severity::Trace => tracing::trace!(target: "feedtail", event, "{}", fields),
            Severity::Info => tracing::info!(target: "feedtail", event, "{}", fields),
            Severity::Warn => tracing::warn!(target: "feedtail", event, "{}", fields),
            Severity::Error | Severity::Fatal => {
                tracing::error!(target: "feedtail", event, severity = severity.as_str(), "{}", fields)
            }
        }
    }
}

/// One JSON object per line.
///
/// Keys are emitted in sorted order so identical events produce identical
/// lines. `event` and `severity` are reserved and win over caller fields.
pub struct JsonLogSink<W: Write + Send> {
    writer: Mutex<W>,
    min_severity: Severity,
}

impl JsonLogSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl JsonLogSink<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> JsonLogSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            min_severity: Severity::Trace,
        }
    }

    /// Drops lines below `severity`.
    pub fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }

    /// Gives back the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    /// Renders one log line, including the trailing newline.
    pub fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut object = Map::new();
        for (key, value) in fields {
            object.insert((*key).to_string(), Value::String((*value).to_string()));
        }
        object.insert("event".to_string(), Value::String(event.to_string()));
        object.insert(
            "severity".to_string(),
            Value::String(severity.as_str().to_string()),
        );

        let mut line = Value::Object(object).to_string();
        line.push('\n');
        line
    }
}

impl<W: Write + Send> LogSink for JsonLogSink<W> {
    fn log(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if severity < self.min_severity {
            return;
        }

        let line = Self::render(severity, event, fields);
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        // A failing log destination must not fail the tailer.
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }
}

/// A captured log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub severity: Severity,
    pub event: String,
    pub fields: Vec<(String, String)>,
}

impl LogRecord {
    /// Value of field `key`, if present.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records for one event name, oldest first.
    pub fn records_for(&self, event: TailerEvent) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.event == event.as_str())
            .collect()
    }

    pub fn count(&self, event: TailerEvent) -> usize {
        self.records_for(event).len()
    }
}

impl LogSink for MemoryLogSink {
    fn log(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let record = LogRecord {
            severity,
            event: event.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        };
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let sink = JsonLogSink::new(Vec::new());
        sink.log(severity, event, fields);
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn test_json_line_format() {
        let output = capture(
            Severity::Info,
            "CHECKPOINT_SAVED",
            &[("position", "1065:3"), ("consumer_id", "orders")],
        );

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["event"], "CHECKPOINT_SAVED");
        assert_eq!(parsed["severity"], "INFO");
        assert_eq!(parsed["position"], "1065:3");
        assert_eq!(parsed["consumer_id"], "orders");
    }

    #[test]
    fn test_json_deterministic_ordering() {
        let a = capture(Severity::Info, "T", &[("zebra", "1"), ("apple", "2")]);
        let b = capture(Severity::Info, "T", &[("apple", "2"), ("zebra", "1")]);
        assert_eq!(a, b);
        assert!(a.find("apple").unwrap() < a.find("zebra").unwrap());
    }

    #[test]
    fn test_json_one_line_and_escaped() {
        let output = capture(Severity::Warn, "T", &[("message", "a \"quoted\"\nvalue")]);

        assert_eq!(output.matches('\n').count(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["message"], "a \"quoted\"\nvalue");
    }

    #[test]
    fn test_reserved_keys_win() {
        let output = capture(Severity::Error, "REAL", &[("event", "spoofed")]);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["event"], "REAL");
    }

    #[test]
    fn test_min_severity_filters() {
        let sink = JsonLogSink::new(Vec::new()).with_min_severity(Severity::Warn);
        sink.log(Severity::Info, "QUIET", &[]);
        sink.log(Severity::Error, "LOUD", &[]);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(!output.contains("QUIET"));
        assert!(output.contains("LOUD"));
    }

    #[test]
    fn test_memory_sink_captures_typed_events() {
        let sink = MemoryLogSink::new();
        sink.emit(TailerEvent::CheckpointSaved, &[("position", "1:0")]);
        sink.emit(TailerEvent::CheckpointSaved, &[("position", "70:0")]);
        sink.emit(TailerEvent::CallbackFailed, &[]);

        assert_eq!(sink.count(TailerEvent::CheckpointSaved), 2);
        let failed = sink.records_for(TailerEvent::CallbackFailed);
        assert_eq!(failed[0].severity, Severity::Error);

        let saved = sink.records_for(TailerEvent::CheckpointSaved);
        assert_eq!(saved[1].field("position"), Some("70:0"));
        assert_eq!(saved[1].field("missing"), None);
    }

    #[test]
    fn test_tracing_and_null_sinks_do_not_panic() {
        TracingLogSink.emit(TailerEvent::CursorOpened, &[("start", "0:0")]);
        TracingLogSink.log(Severity::Fatal, "BOOM", &[]);
        NullLogSink.emit(TailerEvent::CursorOpened, &[]);
    }
}
