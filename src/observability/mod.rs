//! Observability for the tailer
//!
//! - Typed events ([`TailerEvent`]) with fixed severities
//! - An injected [`LogSink`]; the tailer never logs through a global
//! - Sinks: JSON lines, `tracing`, in-memory capture, null
//!
//! Logging is synchronous and never affects tailer state: a sink that fails
//! to write drops the line.

mod events;
mod logger;

pub use events::TailerEvent;
pub use logger::{
    JsonLogSink, LogRecord, LogSink, MemoryLogSink, NullLogSink, Severity, TracingLogSink,
};

use tracing_subscriber::EnvFilter;

/// Environment variable holding the `tracing` filter directive.
pub const LOG_ENV_VAR: &str = "FEEDTAIL_LOG";

/// Installs a global `tracing` subscriber writing compact lines to stderr.
///
/// The filter comes from `FEEDTAIL_LOG` (e.g. `feedtail=debug`), falling back
/// to `default_directive`. Installing twice is not an error; the first
/// subscriber stays.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        tracing::warn!("{err}");
    }
}
