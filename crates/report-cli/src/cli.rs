//! Command-line interface definition using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Report App - offline core of the report mini app
#[derive(Parser, Debug)]
#[command(name = "report-app")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to state directory
    #[arg(short, long)]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a report JSON file
    Validate {
        /// Path to the report file
        file: PathBuf,
    },

    /// Validate and submit a report, queueing it if the service is unreachable
    Submit {
        /// Path to the report file
        file: PathBuf,
    },

    /// Inspect or edit the pending queue
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },

    /// Run one sync pass over the pending queue
    Sync,

    /// Probe the report service
    Health,

    /// Manage the offline asset cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Run background sync, driven by periodic health probes
    Watch,
}

#[derive(Subcommand, Debug)]
pub enum QueueCommand {
    /// List pending submissions
    List {
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove a pending submission
    Remove {
        /// Submission ID
        id: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Precache the asset list under the current version
    Install,

    /// Activate the current version, deleting stale caches
    Activate,

    /// Fetch a URL through the cache
    Fetch {
        /// URL or path relative to the app scope
        url: String,
    },

    /// Show cache state
    Status,
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Cli {
    /// Log filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "report_app=info,report_cli=info,report_sync=info,report_cache=info,warn",
            1 => "report_app=debug,report_cli=debug,report_sync=debug,report_cache=debug,report_persistence=debug,info",
            2 => "report_app=trace,report_cli=trace,report_sync=trace,report_cache=trace,report_persistence=trace,debug",
            _ => "trace",
        }
    }
}
