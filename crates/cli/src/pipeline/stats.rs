//! Pipeline statistics.

use std::time::Duration;

use contracts::RecordKind;
use observability::BroadcastStatsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Input lines consumed
    pub lines_read: u64,

    /// Lines that did not parse as a telemetry record
    pub invalid_lines: u64,

    /// Records still batched when the run was cancelled
    pub records_discarded: u64,

    /// Whether the run stopped on a shutdown signal
    pub cancelled: bool,

    /// Total duration of the run
    pub duration: Duration,

    /// Sinks wired per kind
    pub sink_counts: Vec<(RecordKind, usize)>,

    /// Broadcast outcomes
    pub broadcasts: BroadcastStatsAggregator,
}

impl PipelineStats {
    /// Records broadcast per second
    pub fn records_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.broadcasts.total_records() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Whether any broadcast reported a sink failure
    pub fn has_failures(&self) -> bool {
        self.broadcasts.total_failed_batches() > 0
    }

    pub fn print_summary(&self) {
        println!("\n=== Run Statistics ===\n");
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!("Lines read: {}", self.lines_read);
        println!("Invalid lines: {}", self.invalid_lines);
        println!("Records broadcast: {}", self.broadcasts.total_records());
        println!("Records/s: {:.2}", self.records_per_sec());
        if self.cancelled {
            println!(
                "Cancelled: yes ({} batched records discarded)",
                self.records_discarded
            );
        }

        println!("\nSinks per kind:");
        for (kind, count) in &self.sink_counts {
            println!("  {kind}: {count}");
        }

        println!("\n{}", self.broadcasts.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_per_sec() {
        let mut stats = PipelineStats {
            duration: Duration::from_secs(2),
            ..Default::default()
        };
        stats.broadcasts.update(RecordKind::Points, 10, &[]);
        stats.broadcasts.update(RecordKind::Spans, 6, &["zipkin"]);

        assert!((stats.records_per_sec() - 8.0).abs() < f64::EPSILON);
        assert!(stats.has_failures());
    }

    #[test]
    fn test_zero_duration() {
        assert_eq!(PipelineStats::default().records_per_sec(), 0.0);
        assert!(!PipelineStats::default().has_failures());
    }
}
