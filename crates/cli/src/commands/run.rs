//! `run` command implementation.

use anyhow::{Context as _, Result};
use contracts::{Context, DemuxBlueprint, RecordKind};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{InputSource, Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        sinks = blueprint.sinks.len(),
        mode = ?blueprint.fanout.mode,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        input: InputSource::parse(&args.input),
        batch_size: usize::try_from(args.batch_size).unwrap_or(usize::MAX),
        call_timeout: (args.call_timeout_ms > 0)
            .then(|| Duration::from_millis(args.call_timeout_ms)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    // Shutdown signal cancels the root context; in-flight broadcasts see it
    let ctx = Context::background();
    let shutdown = ctx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, stopping pipeline...");
        shutdown.cancel();
    });

    let stats = Pipeline::new(pipeline_config)
        .run(ctx)
        .await
        .context("Pipeline execution failed")?;

    stats.print_summary();

    if stats.has_failures() {
        warn!(
            failed_batches = stats.broadcasts.total_failed_batches(),
            "Some batches were not accepted by every sink"
        );
    }

    info!("Telemetry Demux finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &DemuxBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Fan-out mode: {:?}", blueprint.fanout.mode);

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!("\nRouting:");
    for kind in RecordKind::ALL {
        let names: Vec<_> = blueprint.sinks_for(kind).map(|s| s.name.as_str()).collect();
        println!("  {kind}: {}", format_names(&names));
    }

    println!();
}

fn format_names(names: &[&str]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(" -> ")
    }
}
