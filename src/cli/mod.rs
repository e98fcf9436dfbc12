//! CLI module for feedtail
//!
//! Provides command-line interface for:
//! - tail: Stream a feed to stdout under a checkpoint
//! - checkpoint: Show, set, clear or list stored checkpoints

mod args;
mod commands;
mod errors;
mod io;

pub use args::{CheckpointAction, Cli, Command};
pub use commands::{
    checkpoint, clear_checkpoint, drive, run, run_command, set_checkpoint, show_checkpoint, tail,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_event, write_response};
