//! CLI command implementations
//!
//! `tail` wires a file cursor and a file store from the config and streams
//! events to stdout. Every event line is flushed before the tailer sees the
//! callback return, so no checkpoint ever covers an unflushed line.

use std::io::{self, Write};
use std::path::Path;

use serde_json::{json, Value};

use crate::config::{LogFormat, TailerConfig};
use crate::cursor::{Event, StreamCursor};
use crate::observability::init_tracing;
use crate::position::Position;
use crate::store::{FilePositionStore, PositionStore};
use crate::tailer::{CheckpointedTailer, TailerMode};

use super::args::{CheckpointAction, Command};
use super::errors::CliResult;
use super::io::{write_event, write_response};

/// Run the CLI
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Tail { config, once, from } => tail(&config, once, from),
        Command::Checkpoint { action } => checkpoint(action),
    }
}

/// Tail the feed named in the config file.
pub fn tail(config_path: &Path, once: bool, from: Option<Position>) -> CliResult<()> {
    let config = TailerConfig::load(config_path)?;
    if config.log_format == LogFormat::Tracing {
        init_tracing("feedtail=info");
    }

    let mut tailer = config.build_tailer()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    drive(&mut tailer, &mut out, once, from)
}

/// Runs `tailer`, writing each event to `out` as a flushed JSON line.
///
/// `from` overrides the stored checkpoint. Continuous mode without `once`
/// blocks until the feed closes. Otherwise pulls one at a time, committing
/// in batched mode after each pull that moved the delivered position, and
/// returns when the feed closes or (with `once`) is caught up.
pub fn drive<C, S, W>(
    tailer: &mut CheckpointedTailer<C, S>,
    out: &mut W,
    once: bool,
    from: Option<Position>,
) -> CliResult<()>
where
    C: StreamCursor,
    S: PositionStore,
    W: Write,
{
    let mut emit = |event: Event| -> io::Result<()> {
        write_event(&mut *out, &event)?;
        out.flush()
    };

    if tailer.mode() == TailerMode::Continuous && !once {
        match from {
            Some(position) => tailer.resume_at(position, &mut emit)?,
            None => tailer.resume(&mut emit)?,
        }
        return Ok(());
    }

    match from {
        Some(position) => tailer.start_at(position)?,
        None => tailer.start()?,
    };
    loop {
        let delivery = tailer.deliver_next(&mut emit)?;

        if tailer.mode() == TailerMode::Batched && !tailer.state().is_caught_up() {
            tailer.commit_batch()?;
        }

        if delivery.is_closed() || (once && delivery.is_caught_up()) {
            return Ok(());
        }
    }
}

/// Checkpoint maintenance commands
pub fn checkpoint(action: CheckpointAction) -> CliResult<()> {
    let data = match action {
        CheckpointAction::Show {
            store_dir,
            consumer,
        } => show_checkpoint(&FilePositionStore::new(store_dir), &consumer)?,
        CheckpointAction::Set {
            store_dir,
            consumer,
            position,
        } => set_checkpoint(&FilePositionStore::new(store_dir), &consumer, position)?,
        CheckpointAction::Clear {
            store_dir,
            consumer,
        } => clear_checkpoint(&FilePositionStore::new(store_dir), &consumer)?,
        CheckpointAction::List { store_dir } => {
            json!({ "consumers": FilePositionStore::new(store_dir).consumers()? })
        }
    };
    write_response(data)
}

/// Stored record for `consumer`, or a null position if there is none.
pub fn show_checkpoint(store: &FilePositionStore, consumer: &str) -> CliResult<Value> {
    match store.read_record(consumer)? {
        Some(record) => {
            let mut value = serde_json::to_value(&record)?;
            value["position_text"] = json!(record.position.to_string());
            value["position_time"] = json!(record.position.to_rfc3339());
            Ok(value)
        }
        None => Ok(json!({ "consumer_id": consumer, "position": null })),
    }
}

pub fn set_checkpoint(
    store: &FilePositionStore,
    consumer: &str,
    position: Position,
) -> CliResult<Value> {
    store.write(consumer, position)?;
    show_checkpoint(store, consumer)
}

pub fn clear_checkpoint(store: &FilePositionStore, consumer: &str) -> CliResult<Value> {
    let cleared = store.clear(consumer)?;
    Ok(json!({ "consumer_id": consumer, "cleared": cleared }))
}
