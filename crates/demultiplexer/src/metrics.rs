//! Fan-out counters for in-process observability

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::RecordKind;

/// Counters for one record kind
#[derive(Debug, Default)]
pub struct FanoutMetrics {
    /// Non-empty batches broadcast
    broadcasts: AtomicU64,
    /// Empty batches short-circuited
    skipped: AtomicU64,
    /// Records broadcast
    records: AtomicU64,
    /// Individual sink invocations
    sink_calls: AtomicU64,
    /// Individual sink failures
    sink_failures: AtomicU64,
    /// Broadcasts with at least one failure
    failed_broadcasts: AtomicU64,
}

impl FanoutMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one completed broadcast
    pub fn record_broadcast(&self, records: usize, sink_calls: usize, sink_failures: usize) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.records.fetch_add(records as u64, Ordering::Relaxed);
        self.sink_calls.fetch_add(sink_calls as u64, Ordering::Relaxed);
        self.sink_failures
            .fetch_add(sink_failures as u64, Ordering::Relaxed);
        if sink_failures > 0 {
            self.failed_broadcasts.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn broadcasts(&self) -> u64 {
        self.broadcasts.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> FanoutSnapshot {
        FanoutSnapshot {
            broadcasts: self.broadcasts(),
            skipped: self.skipped(),
            records: self.records.load(Ordering::Relaxed),
            sink_calls: self.sink_calls.load(Ordering::Relaxed),
            sink_failures: self.sink_failures(),
            failed_broadcasts: self.failed_broadcasts.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of fan-out counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutSnapshot {
    pub broadcasts: u64,
    pub skipped: u64,
    pub records: u64,
    pub sink_calls: u64,
    pub sink_failures: u64,
    pub failed_broadcasts: u64,
}

/// Counters for all three record kinds
#[derive(Debug, Default)]
pub struct DemuxMetrics {
    points: FanoutMetrics,
    events: FanoutMetrics,
    spans: FanoutMetrics,
}

impl DemuxMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters of one kind
    pub fn for_kind(&self, kind: RecordKind) -> &FanoutMetrics {
        match kind {
            RecordKind::Points => &self.points,
            RecordKind::Events => &self.events,
            RecordKind::Spans => &self.spans,
        }
    }
}
