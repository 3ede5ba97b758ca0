//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ledgermail - Route emailed credit memos through extraction into the ledger.
#[derive(Debug, Parser)]
#[command(name = "ledgermail")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "LEDGERMAIL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the mailbox until Ctrl+C, refreshing routing rules in the background
    Run,

    /// Run a single poll cycle and print its summary
    Poll,

    /// Compare archived documents with their booked transactions
    Reconcile(ReconcileArgs),

    /// Print the active routing rules
    Rules(RulesArgs),
}

/// Arguments for the reconcile command.
#[derive(Debug, Parser)]
pub struct ReconcileArgs {
    /// Archive directory (defaults to the configured local archive)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    pub report: Option<PathBuf>,
}

/// Arguments for the rules command.
#[derive(Debug, Parser)]
pub struct RulesArgs {
    /// Fetch from the rule source before printing
    #[arg(long)]
    pub refresh: bool,
}
