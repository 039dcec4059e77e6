//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Record command arguments.
#[derive(Debug, Args)]
pub struct RecordCommand {
    /// Flight snapshot JSON file
    pub snapshot: PathBuf,

    /// Record date in epoch milliseconds (defaults to now)
    #[arg(long, value_name = "MILLIS")]
    pub at: Option<i64>,
}

/// Duration command arguments.
#[derive(Debug, Args)]
pub struct DurationCommand {
    /// Flight snapshot JSON file
    pub snapshot: PathBuf,
}

/// Latest command arguments.
#[derive(Debug, Args)]
pub struct LatestCommand {
    /// Flight number, e.g. BA117
    pub flight_number: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Routes command arguments.
#[derive(Debug, Args)]
pub struct RoutesCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Route statistics command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Departure airport code
    pub departure: String,

    /// Arrival airport code
    pub arrival: String,

    /// Look-back window in days (defaults to the configured window)
    #[arg(short, long)]
    pub days: Option<u32>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Prune command arguments.
#[derive(Debug, Args)]
pub struct PruneCommand {
    /// Delete records older than this epoch-millisecond cutoff
    /// (defaults to the configured retention)
    #[arg(long, value_name = "MILLIS")]
    pub before: Option<i64>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
