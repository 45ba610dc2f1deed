//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{DemuxBlueprint, RecordKind, SinkConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    mode: String,
    sinks: Vec<SinkInfo>,
    routing: BTreeMap<String, Vec<String>>,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    kinds: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn sink_info(sink: &SinkConfig) -> SinkInfo {
    SinkInfo {
        name: sink.name.clone(),
        sink_type: format!("{:?}", sink.sink_type),
        kinds: sink.kinds.iter().map(ToString::to_string).collect(),
        params: sink
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

fn build_config_info(blueprint: &DemuxBlueprint) -> ConfigInfo {
    let routing = ConfigLoader::routing(blueprint)
        .iter()
        .map(|(kind, sinks)| (kind.to_string(), sinks.to_vec()))
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        mode: format!("{:?}", blueprint.fanout.mode),
        sinks: blueprint.sinks.iter().map(sink_info).collect(),
        routing,
    }
}

fn print_config_info(blueprint: &DemuxBlueprint) {
    println!("=== Telemetry Demux Configuration ===\n");
    println!("Version: {:?}", blueprint.version);
    println!("Fan-out mode: {:?}", blueprint.fanout.mode);

    println!("\nSinks ({})", blueprint.sinks.len());
    for (i, sink) in blueprint.sinks.iter().enumerate() {
        let is_last = i + 1 == blueprint.sinks.len();
        let prefix = if is_last { "└─" } else { "├─" };
        let kinds: Vec<_> = sink.kinds.iter().map(ToString::to_string).collect();
        println!(
            "   {} {} ({:?}) [{}]",
            prefix,
            sink.name,
            sink.sink_type,
            kinds.join(", ")
        );
    }

    println!("\nRouting (invocation order)");
    for (i, (kind, sinks)) in ConfigLoader::routing(blueprint).iter().enumerate() {
        let is_last = i + 1 == RecordKind::ALL.len();
        let prefix = if is_last { "└─" } else { "├─" };
        if sinks.is_empty() {
            println!("   {} {}: (no sinks)", prefix, kind);
        } else {
            println!("   {} {}: {}", prefix, kind, sinks.join(" -> "));
        }
    }

    println!();
}
