//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Coffer - Scheduled backups with integrity checks
#[derive(Parser, Debug)]
#[command(name = "coffer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to config.json
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one backup now
    Run,

    /// Run backups on the configured interval until interrupted
    Watch,

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Show recent runs from the audit log
    History(HistoryArgs),

    /// Check source integrity without backing up
    Verify(VerifyArgs),
}

// Config commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a default config.json
    Init(ConfigInitArgs),

    /// Show the effective configuration
    Show(ConfigShowArgs),

    /// Set a single configuration key
    Set(ConfigSetArgs),

    /// Print the configuration file location
    Path,
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigSetArgs {
    /// Configuration key (e.g. source_path, s3_bucket, interval_minutes)
    pub key: String,

    /// New value
    pub value: String,
}

// History command
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Maximum number of runs to show, most recent last
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Verify command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// File to check
    pub path: Utf8PathBuf,
}
