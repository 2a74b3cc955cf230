//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// lea - a minimalist SQL transformation orchestrator
#[derive(Parser, Debug)]
#[command(name = "lea")]
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
    /// Directory where the SQL scripts live
    #[arg(long, global = true, default_value = "scripts")]
    pub scripts: PathBuf,

    /// Warehouse database (DuckDB path, `md:` for MotherDuck)
    #[arg(long, global = true, default_value = "warehouse.duckdb")]
    pub database: String,

    /// SQL dialect used for parsing
    #[arg(long, global = true, default_value = "duckdb")]
    pub dialect: String,

    /// Run against production instead of the per-user dev namespace
    #[arg(long, global = true)]
    pub production: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Materialise the selected scripts with write-audit-publish
    Run(RunArgs),

    /// Run only the test scripts
    Test(TestArgs),

    /// List scripts and their dependencies
    Ls(LsArgs),

    /// Drop the development database namespace
    Teardown(TeardownArgs),
}

/// Output formats for run/ls output
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// Machine-readable JSON lines
    Json,
}

/// Arguments for the run command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Selector atoms (repeatable): schema.table, +node, node+, schema/, git
    #[arg(short, long)]
    pub select: Vec<String>,

    /// Selector atoms subtracted from the selection (repeatable)
    #[arg(long)]
    pub unselect: Vec<String>,

    /// Drop audit checkpoints and rerun everything selected
    #[arg(long)]
    pub restart: bool,

    /// Stop on the first error
    #[arg(long)]
    pub fail_fast: bool,

    /// Render unselected ancestors against production
    #[arg(long)]
    pub freeze_unselected: bool,

    /// Maximum concurrent warehouse queries
    #[arg(long, default_value_t = lea_core::RunConfig::DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Incremental field name and value (repeatable)
    #[arg(long, num_args = 2, value_names = ["FIELD", "VALUE"], action = clap::ArgAction::Append)]
    pub incremental: Vec<String>,

    /// Per-node timeout in seconds
    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// Plan only, touch nothing
    #[arg(long)]
    pub dry: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the test command
#[derive(Args, Debug)]
pub struct TestArgs {
    /// Extra selector atoms on top of `tests/`
    #[arg(short, long)]
    pub select: Vec<String>,

    /// Stop on the first failing test
    #[arg(long)]
    pub fail_fast: bool,

    /// Maximum concurrent warehouse queries
    #[arg(long, default_value_t = lea_core::RunConfig::DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the ls command
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Selector atoms to filter the listing
    #[arg(short, long)]
    pub select: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the teardown command
#[derive(Args, Debug)]
pub struct TeardownArgs {
    /// Confirm dropping the namespace
    #[arg(long)]
    pub yes: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
