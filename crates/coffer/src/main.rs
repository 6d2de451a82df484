//! Coffer CLI - Scheduled backups with integrity checks
//!
//! This is the main entry point for the Coffer command-line interface.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize rustls crypto provider (required for rustls 0.23+)
    // This must be done before any TLS operations
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    // Parse CLI args
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose, cli.quiet);

    // Run command
    match cli.command {
        Commands::Run => commands::run::run(cli.config.as_deref()).await,
        Commands::Watch => commands::watch::run(cli.config.as_deref()).await,
        Commands::Config(cmd) => commands::config::run(cmd, cli.config.as_deref()).await,
        Commands::History(args) => commands::history::run(args).await,
        Commands::Verify(args) => commands::verify::run(args).await,
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(log_filter(verbose, quiet))
        .init();
}

/// Level filter from the verbosity flags; RUST_LOG takes precedence when set
fn log_filter(verbose: u8, quiet: bool) -> EnvFilter {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            // Default to info level so scheduled runs report their progress
            // Use --quiet to suppress, or -v/-vv for more detail
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
