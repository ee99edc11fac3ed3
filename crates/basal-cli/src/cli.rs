//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::add::AddArgs;

/// Insulin basal-rate schedule tracker.
///
/// Records the basal rates of an insulin pump as day schedules, shows the
/// schedule in effect on any date, and answers free-form questions about the
/// history through a local LLM.
#[derive(Debug, Parser)]
#[command(name = "basal", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record a day schedule, from arguments or interactively.
    Add(AddArgs),

    /// Show the schedule in effect on a date.
    Show {
        /// Date to show: YYYY-MM-DD, today, yesterday, or "N days ago" (default: today).
        date: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List all recorded schedules, newest first.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete a schedule by ID.
    Delete {
        /// Schedule ID as shown by `basal list`.
        id: i64,
    },

    /// Ask a question about your basal history in plain language.
    Ask {
        /// The question, e.g. "which day had the highest total?".
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Print the effective configuration.
    Config,
}
