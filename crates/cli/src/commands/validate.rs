//! `validate` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{DemuxBlueprint, RecordKind};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    mode: String,
    sink_count: usize,
    points_sinks: usize,
    events_sinks: usize,
    spans_sinks: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let routing = ConfigLoader::routing(&blueprint);
            let count = |kind| routing.sinks(kind).len();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    mode: format!("{:?}", blueprint.fanout.mode),
                    sink_count: blueprint.sinks.len(),
                    points_sinks: count(RecordKind::Points),
                    events_sinks: count(RecordKind::Events),
                    spans_sinks: count(RecordKind::Spans),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &DemuxBlueprint) -> Vec<String> {
    if blueprint.sinks.is_empty() {
        return vec!["No sinks configured - every batch will be discarded".to_string()];
    }

    ConfigLoader::routing(blueprint)
        .unrouted()
        .into_iter()
        .map(|kind| format!("No sinks receive {kind} - those records will be discarded"))
        .collect()
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Fan-out mode: {}", summary.mode);
            println!("  Sinks: {}", summary.sink_count);
            println!(
                "  Routing: points={} events={} spans={}",
                summary.points_sinks, summary.events_sinks, summary.spans_sinks
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SinkConfig, SinkType};
    use std::io::Write;

    #[test]
    fn test_warnings_no_sinks() {
        let warnings = collect_warnings(&DemuxBlueprint::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("No sinks configured"));
    }

    #[test]
    fn test_warnings_unrouted_kind() {
        let blueprint = DemuxBlueprint {
            sinks: vec![SinkConfig {
                name: "log".into(),
                sink_type: SinkType::Log,
                kinds: vec![RecordKind::Points, RecordKind::Spans],
                params: Default::default(),
            }],
            ..Default::default()
        };
        let warnings = collect_warnings(&blueprint);
        assert_eq!(warnings, vec!["No sinks receive events - those records will be discarded"]);
    }

    #[test]
    fn test_validate_config_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[[sinks]]\nname = \"log\"\nsink_type = \"log\"").unwrap();
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };

        let result = validate_config(&args);
        assert!(result.valid);
        assert!(result.warnings.is_none());
        assert_eq!(result.summary.unwrap().spans_sinks, 1);
    }

    #[test]
    fn test_validate_missing_file() {
        let args = ValidateArgs {
            config: "/no/such/config.toml".into(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
