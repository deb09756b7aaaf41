//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Reelhouse - load catalog snapshots into a DuckDB star schema
#[derive(Parser, Debug)]
#[command(name = "reelhouse")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override the warehouse database path
    #[arg(short, long, global = true)]
    pub database: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Truncate the warehouse and load it from the source snapshots
    Load(LoadArgs),

    /// Empty every warehouse table (same as `load --mode truncate-only`)
    Truncate(TruncateArgs),

    /// Show the last run-state marker
    Status(StatusArgs),

    /// Print the table load order and sources without touching the database
    Plan(PlanArgs),
}

/// Run mode for the load command
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Load every row of every source
    Full,
    /// Load a bounded prefix of each source
    Test,
    /// Truncate every table and stop
    TruncateOnly,
    /// Full load with constraints enforced and an integrity probe
    Validated,
}

/// Output format for commands that print structured data
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table output
    Text,
    /// JSON output
    Json,
}

/// Arguments for the load command
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Run mode
    #[arg(short, long, value_enum, default_value = "full")]
    pub mode: LoadMode,

    /// Rows read per source in test mode (default: test_limit from config)
    #[arg(short, long)]
    pub limit: Option<u64>,

    /// Write the run report as JSON to this path
    #[arg(long)]
    pub report_json: Option<String>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the truncate command
#[derive(Args, Debug)]
pub struct TruncateArgs {
    /// Write the run report as JSON to this path
    #[arg(long)]
    pub report_json: Option<String>,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Run mode to plan for
    #[arg(short, long, value_enum, default_value = "full")]
    pub mode: LoadMode,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
