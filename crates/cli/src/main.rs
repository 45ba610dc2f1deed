//! # Telemetry Demux CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - JSON-lines ingestion and per-kind batching
//! - Graceful shutdown handling

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_pipeline, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_tracing(cli.log_format.into(), cli.log_level())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Telemetry Demux CLI starting"
    );

    let result = match &cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}
