//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Telemetry Demux - fan telemetry batches out to configured sinks
#[derive(Parser, Debug)]
#[command(
    name = "telemetry-demux",
    author,
    version,
    about = "Telemetry fan-out to multiple sinks",
    long_about = "Reads points, events and spans as JSON lines, batches them per kind \n\
                  and broadcasts every batch to all sinks configured for that kind.\n\n\
                  Sink failures are reported per batch and never stop the run."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TELEMETRY_DEMUX_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TELEMETRY_DEMUX_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log level derived from `-q` / `-v`
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read records and broadcast them to the configured sinks
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display sink wiring per record kind
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "TELEMETRY_DEMUX_CONFIG"
    )]
    pub config: PathBuf,

    /// JSON-lines input file ("-" reads stdin)
    #[arg(short, long, default_value = "-", env = "TELEMETRY_DEMUX_INPUT")]
    pub input: String,

    /// Records per batch before a kind is flushed
    #[arg(
        long,
        default_value = "100",
        value_parser = clap::value_parser!(u64).range(1..),
        env = "TELEMETRY_DEMUX_BATCH_SIZE"
    )]
    pub batch_size: u64,

    /// Deadline for each broadcast in milliseconds (0 = none)
    #[arg(long, default_value = "0", env = "TELEMETRY_DEMUX_CALL_TIMEOUT_MS")]
    pub call_timeout_ms: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TELEMETRY_DEMUX_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without reading input
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["telemetry-demux", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.input, "-");
        assert_eq!(args.batch_size, 100);
        assert_eq!(args.call_timeout_ms, 0);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_batch_size_must_be_positive() {
        let result = Cli::try_parse_from(["telemetry-demux", "run", "--batch-size", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level() {
        let cli = Cli::try_parse_from(["telemetry-demux", "-vv", "info"]).unwrap();
        assert_eq!(cli.log_level(), "trace");

        let cli = Cli::try_parse_from(["telemetry-demux", "-q", "info"]).unwrap();
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["telemetry-demux", "-q", "-v", "info"]);
        assert!(result.is_err());
    }
}
