//! Pipeline orchestrator - reads records, batches them and broadcasts.

use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use contracts::{Context, DemuxBlueprint, RecordKind};
use demultiplexer::{Demultiplexer, DemultiplexerBuilder};
use tracing::{debug, info, warn};

use super::{Batch, Batcher, InputSource, PipelineStats, RecordReader};
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Sink wiring
    pub blueprint: DemuxBlueprint,

    /// Record source
    pub input: InputSource,

    /// Records per batch
    pub batch_size: usize,

    /// Deadline for each broadcast (None = no deadline)
    pub call_timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the input ends or `ctx` is cancelled
    pub async fn run(self, ctx: Context) -> Result<PipelineStats> {
        let start_time = Instant::now();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let (demux, _inventory) = DemultiplexerBuilder::from_blueprint(&self.config.blueprint)
            .await
            .context("Failed to build demultiplexer")?;

        for kind in RecordKind::ALL {
            if demux.sink_count(kind) == 0 {
                warn!(kind = %kind, "No sinks configured - records of this kind go nowhere");
            }
        }

        let mut reader = RecordReader::open(&self.config.input)
            .await
            .with_context(|| format!("Failed to open input {}", self.config.input))?;

        info!(
            input = %self.config.input,
            batch_size = self.config.batch_size,
            call_timeout_ms = ?self.config.call_timeout.map(|t| t.as_millis()),
            "Pipeline running"
        );

        let mut stats = self.pump(&demux, &mut reader, &ctx).await?;
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            records = stats.broadcasts.total_records(),
            failed_batches = stats.broadcasts.total_failed_batches(),
            "Pipeline finished"
        );

        Ok(stats)
    }

    async fn pump(
        &self,
        demux: &Demultiplexer,
        reader: &mut RecordReader,
        ctx: &Context,
    ) -> Result<PipelineStats> {
        let mut stats = PipelineStats {
            sink_counts: RecordKind::ALL
                .iter()
                .map(|kind| (*kind, demux.sink_count(*kind)))
                .collect(),
            ..Default::default()
        };
        let mut batcher = Batcher::new(self.config.batch_size);

        loop {
            let next = tokio::select! {
                biased;
                _ = ctx.done() => {
                    stats.cancelled = true;
                    break;
                }
                next = reader.next_record() => next,
            };

            match next {
                Ok(Some(record)) => {
                    if let Some(batch) = batcher.push(record) {
                        self.broadcast(demux, ctx, batch, &mut stats).await;
                    }
                }
                Ok(None) => break,
                Err(CliError::InvalidRecord { line, message }) => {
                    warn!(line, error = %message, "Skipping invalid record");
                    stats.invalid_lines += 1;
                }
                Err(e) => return Err(e).context("Failed to read input"),
            }
        }

        stats.lines_read = reader.line_number();

        if stats.cancelled {
            stats.records_discarded = batcher.pending() as u64;
            warn!(
                discarded = stats.records_discarded,
                "Cancelled, pending records not broadcast"
            );
        } else {
            for batch in batcher.drain() {
                self.broadcast(demux, ctx, batch, &mut stats).await;
            }
        }

        Ok(stats)
    }

    /// Broadcast one batch under a per-call child context
    async fn broadcast(
        &self,
        demux: &Demultiplexer,
        ctx: &Context,
        batch: Batch,
        stats: &mut PipelineStats,
    ) {
        let call_ctx = match self.config.call_timeout {
            Some(timeout) => ctx.child().with_timeout(timeout),
            None => ctx.child(),
        };
        let kind = batch.kind();
        let len = batch.len();

        let result = match &batch {
            Batch::Points(points) => demux.add_datapoints(&call_ctx, points).await,
            Batch::Events(events) => demux.add_events(&call_ctx, events).await,
            Batch::Spans(spans) => demux.add_spans(&call_ctx, spans).await,
        };

        match result {
            Ok(()) => {
                debug!(kind = %kind, records = len, "Batch broadcast");
                stats.broadcasts.update(kind, len, &[]);
            }
            Err(err) => {
                for failure in err.failures() {
                    warn!(
                        kind = %kind,
                        index = failure.index,
                        sink = %failure.sink,
                        error = %failure.error,
                        "Sink failed"
                    );
                }
                stats.broadcasts.update(kind, len, &err.sink_names());
            }
        }
    }
}
