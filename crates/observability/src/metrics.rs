//! Fan-out metrics
//!
//! Prometheus counters via the `metrics` facade, plus an in-memory aggregator
//! used to print run summaries.

use std::collections::HashMap;

use contracts::RecordKind;
use metrics::{counter, histogram};

/// Record a non-empty batch entering the fan-out
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_batch;
///
/// record_batch(RecordKind::Points, points.len());
/// ```
pub fn record_batch(kind: RecordKind, len: usize) {
    counter!("telemetry_demux_batches_total", "kind" => kind.as_str()).increment(1);
    counter!("telemetry_demux_records_total", "kind" => kind.as_str()).increment(len as u64);
    histogram!("telemetry_demux_batch_size", "kind" => kind.as_str()).record(len as f64);
}

/// Record an empty batch that short-circuited without touching any sink
pub fn record_batch_skipped(kind: RecordKind) {
    counter!("telemetry_demux_batches_skipped_total", "kind" => kind.as_str()).increment(1);
}

/// Record the outcome of a single sink call
pub fn record_sink_call(kind: RecordKind, sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "telemetry_demux_sink_calls_total",
        "kind" => kind.as_str(),
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Fan-out aggregator
///
/// Aggregates broadcast outcomes in memory for summaries.
#[derive(Debug, Clone, Default)]
pub struct BroadcastStatsAggregator {
    /// Per-kind statistics
    pub kinds: HashMap<RecordKind, KindStats>,
}

/// Statistics for one record kind
#[derive(Debug, Clone, Default)]
pub struct KindStats {
    /// Broadcasts issued (non-empty batches)
    pub batches: u64,

    /// Records broadcast
    pub records: u64,

    /// Broadcasts where at least one sink failed
    pub failed_batches: u64,

    /// Batch size statistics
    pub batch_size: RunningStats,

    /// Failure count per sink
    pub sink_failures: HashMap<String, u64>,
}

impl BroadcastStatsAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with the outcome of one broadcast
    ///
    /// `failed_sinks` lists the sinks that reported a failure, in invocation order.
    pub fn update(&mut self, kind: RecordKind, batch_len: usize, failed_sinks: &[&str]) {
        if batch_len == 0 {
            return;
        }

        let stats = self.kinds.entry(kind).or_default();
        stats.batches += 1;
        stats.records += batch_len as u64;
        stats.batch_size.push(batch_len as f64);

        if !failed_sinks.is_empty() {
            stats.failed_batches += 1;
            for sink in failed_sinks {
                *stats.sink_failures.entry((*sink).to_string()).or_insert(0) += 1;
            }
        }
    }

    /// Statistics for one kind, if anything was broadcast
    pub fn get(&self, kind: RecordKind) -> Option<&KindStats> {
        self.kinds.get(&kind)
    }

    /// Total records across kinds
    pub fn total_records(&self) -> u64 {
        self.kinds.values().map(|s| s.records).sum()
    }

    /// Total failed broadcasts across kinds
    pub fn total_failed_batches(&self) -> u64 {
        self.kinds.values().map(|s| s.failed_batches).sum()
    }

    /// Build a summary report
    pub fn summary(&self) -> MetricsSummary {
        let kinds = RecordKind::ALL
            .iter()
            .filter_map(|kind| {
                self.kinds.get(kind).map(|stats| KindSummary {
                    kind: *kind,
                    batches: stats.batches,
                    records: stats.records,
                    failed_batches: stats.failed_batches,
                    failure_rate: if stats.batches > 0 {
                        stats.failed_batches as f64 / stats.batches as f64 * 100.0
                    } else {
                        0.0
                    },
                    batch_size: StatsSummary::from(&stats.batch_size),
                    sink_failures: stats.sink_failures.clone(),
                })
            })
            .collect();

        MetricsSummary { kinds }
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    /// One entry per kind that saw traffic, in canonical kind order
    pub kinds: Vec<KindSummary>,
}

/// Summary for one record kind
#[derive(Debug, Clone)]
pub struct KindSummary {
    pub kind: RecordKind,
    pub batches: u64,
    pub records: u64,
    pub failed_batches: u64,
    pub failure_rate: f64,
    pub batch_size: StatsSummary,
    pub sink_failures: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Fan-out Summary ===")?;
        if self.kinds.is_empty() {
            return writeln!(f, "No records broadcast");
        }

        for kind in &self.kinds {
            writeln!(
                f,
                "{}: {} records in {} batches, {} failed ({:.2}%)",
                kind.kind, kind.records, kind.batches, kind.failed_batches, kind.failure_rate
            )?;
            writeln!(f, "  batch size: {}", kind.batch_size)?;

            let mut sinks: Vec<_> = kind.sink_failures.iter().collect();
            sinks.sort();
            for (sink, count) in sinks {
                writeln!(f, "  {sink}: {count} failures")?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a sample
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
