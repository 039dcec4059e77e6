//! Command-line interface for flightstats.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DurationCommand, LatestCommand, PruneCommand, RecordCommand, RoutesCommand,
    StatsCommand,
};

use crate::logging::Verbosity;

/// flightstats - Flight durations and route history
///
/// Computes flight durations from status snapshots and keeps a local history
/// of observed flights for per-route statistics.
#[derive(Debug, Parser)]
#[command(name = "flightstats")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store a flight snapshot as a history record
    Record(RecordCommand),

    /// Print the duration of a flight snapshot
    Duration(DurationCommand),

    /// Show the latest record for a flight
    Latest(LatestCommand),

    /// List recorded routes
    Routes(RoutesCommand),

    /// Show average duration and counts for a route
    Stats(StatsCommand),

    /// Delete old records
    Prune(PruneCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }
}
