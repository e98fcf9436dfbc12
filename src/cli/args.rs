//! CLI argument definitions using clap
//!
//! Commands:
//! - feedtail tail --config <path> [--once] [--from <seconds:ordinal>]
//! - feedtail checkpoint show|set|clear|list --store-dir <dir> ...

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::position::Position;

/// feedtail - checkpointed change-feed tailer
#[derive(Parser, Debug)]
#[command(name = "feedtail")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Tail the configured feed, printing each event as a JSON line
    Tail {
        /// Path to configuration file
        #[arg(long, default_value = "./feedtail.json")]
        config: PathBuf,

        /// Stop once the feed is caught up instead of waiting for more
        #[arg(long)]
        once: bool,

        /// Start here instead of at the stored checkpoint (seconds:ordinal)
        #[arg(long)]
        from: Option<Position>,
    },

    /// Inspect or edit stored checkpoints
    Checkpoint {
        #[command(subcommand)]
        action: CheckpointAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CheckpointAction {
    /// Print the stored checkpoint for a consumer
    Show {
        /// Checkpoint directory
        #[arg(long)]
        store_dir: PathBuf,
        /// Consumer identity
        #[arg(long)]
        consumer: String,
    },

    /// Overwrite the checkpoint for a consumer
    Set {
        /// Checkpoint directory
        #[arg(long)]
        store_dir: PathBuf,
        /// Consumer identity
        #[arg(long)]
        consumer: String,
        /// New position as seconds:ordinal
        #[arg(long)]
        position: Position,
    },

    /// Delete the checkpoint so the next run uses its default start
    Clear {
        /// Checkpoint directory
        #[arg(long)]
        store_dir: PathBuf,
        /// Consumer identity
        #[arg(long)]
        consumer: String,
    },

    /// List consumers with a stored checkpoint
    List {
        /// Checkpoint directory
        #[arg(long)]
        store_dir: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
