//! Demultiplexer - fan-out of telemetry batches to per-kind sink lists

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use tracing::{instrument, trace};

use contracts::{
    Context, ContractError, Datapoint, Event, EventSink, FanoutMode, PointSink, RecordKind, Span,
    SpanSink,
};

use crate::error::{BroadcastError, SinkFailure};
use crate::metrics::DemuxMetrics;

/// Forwards every batch it sees to all sinks of the batch's kind
///
/// The three sink lists are fixed at construction. Each entry point attempts
/// every sink of its list exactly once and returns all failures; an empty
/// batch returns `Ok(())` without invoking any sink.
pub struct Demultiplexer {
    name: String,
    mode: FanoutMode,
    datapoint_sinks: Vec<Arc<dyn PointSink>>,
    event_sinks: Vec<Arc<dyn EventSink>>,
    span_sinks: Vec<Arc<dyn SpanSink>>,
    metrics: DemuxMetrics,
}

impl Demultiplexer {
    /// Create a sequential demultiplexer over the given sink lists
    pub fn new(
        datapoint_sinks: Vec<Arc<dyn PointSink>>,
        event_sinks: Vec<Arc<dyn EventSink>>,
        span_sinks: Vec<Arc<dyn SpanSink>>,
    ) -> Self {
        Self {
            name: "demultiplexer".to_string(),
            mode: FanoutMode::Sequential,
            datapoint_sinks,
            event_sinks,
            span_sinks,
            metrics: DemuxMetrics::new(),
        }
    }

    /// Set the name reported when this demultiplexer is nested as a sink
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set how sinks within one list are driven
    pub fn with_mode(mut self, mode: FanoutMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> FanoutMode {
        self.mode
    }

    /// Number of sinks wired for a kind
    pub fn sink_count(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Points => self.datapoint_sinks.len(),
            RecordKind::Events => self.event_sinks.len(),
            RecordKind::Spans => self.span_sinks.len(),
        }
    }

    /// Sink names wired for a kind, in invocation order
    pub fn sink_names(&self, kind: RecordKind) -> Vec<&str> {
        match kind {
            RecordKind::Points => self.datapoint_sinks.iter().map(|s| s.name()).collect(),
            RecordKind::Events => self.event_sinks.iter().map(|s| s.name()).collect(),
            RecordKind::Spans => self.span_sinks.iter().map(|s| s.name()).collect(),
        }
    }

    /// Fan-out counters
    pub fn metrics(&self) -> &DemuxMetrics {
        &self.metrics
    }

    /// Forward points to every datapoint sink
    ///
    /// # Errors
    /// Every failure reported by a sink, in list order.
    #[instrument(
        name = "demux_add_datapoints",
        skip_all,
        fields(demux = %self.name, batch = points.len(), sinks = self.datapoint_sinks.len())
    )]
    pub async fn add_datapoints(
        &self,
        ctx: &Context,
        points: &[Datapoint],
    ) -> Result<(), BroadcastError> {
        self.fan_out(RecordKind::Points, &self.datapoint_sinks, ctx, points)
            .await
    }

    /// Forward events to every event sink
    ///
    /// # Errors
    /// Every failure reported by a sink, in list order.
    #[instrument(
        name = "demux_add_events",
        skip_all,
        fields(demux = %self.name, batch = events.len(), sinks = self.event_sinks.len())
    )]
    pub async fn add_events(&self, ctx: &Context, events: &[Event]) -> Result<(), BroadcastError> {
        self.fan_out(RecordKind::Events, &self.event_sinks, ctx, events)
            .await
    }

    /// Forward spans to every span sink
    ///
    /// # Errors
    /// Every failure reported by a sink, in list order.
    #[instrument(
        name = "demux_add_spans",
        skip_all,
        fields(demux = %self.name, batch = spans.len(), sinks = self.span_sinks.len())
    )]
    pub async fn add_spans(&self, ctx: &Context, spans: &[Span]) -> Result<(), BroadcastError> {
        self.fan_out(RecordKind::Spans, &self.span_sinks, ctx, spans)
            .await
    }

    async fn fan_out<R, S>(
        &self,
        kind: RecordKind,
        sinks: &[Arc<S>],
        ctx: &Context,
        batch: &[R],
    ) -> Result<(), BroadcastError>
    where
        R: Sync,
        S: Accept<R> + ?Sized,
    {
        let metrics = self.metrics.for_kind(kind);

        if batch.is_empty() {
            metrics.inc_skipped();
            observability::record_batch_skipped(kind);
            return Ok(());
        }
        observability::record_batch(kind, batch.len());

        let outcomes = match self.mode {
            FanoutMode::Sequential => {
                let mut outcomes = Vec::with_capacity(sinks.len());
                for sink in sinks {
                    outcomes.push(sink.accept(ctx, batch).await);
                }
                outcomes
            }
            FanoutMode::Concurrent => join_all(sinks.iter().map(|s| s.accept(ctx, batch))).await,
        };

        let failures: Vec<SinkFailure> = sinks
            .iter()
            .zip(outcomes)
            .enumerate()
            .filter_map(|(index, (sink, outcome))| {
                observability::record_sink_call(kind, sink.sink_name(), outcome.is_ok());
                outcome.err().map(|error| SinkFailure {
                    index,
                    sink: sink.sink_name().to_string(),
                    error,
                })
            })
            .collect();

        metrics.record_broadcast(batch.len(), sinks.len(), failures.len());
        trace!(
            kind = %kind,
            sinks = sinks.len(),
            failures = failures.len(),
            "Fan-out complete"
        );

        BroadcastError::from_failures(kind, sinks.len(), failures)
    }
}

/// Uniform view over the three sink capabilities
trait Accept<R>: Send + Sync {
    fn sink_name(&self) -> &str;

    fn accept<'a>(
        &'a self,
        ctx: &'a Context,
        batch: &'a [R],
    ) -> BoxFuture<'a, Result<(), ContractError>>;
}

impl Accept<Datapoint> for dyn PointSink {
    fn sink_name(&self) -> &str {
        self.name()
    }

    fn accept<'a>(
        &'a self,
        ctx: &'a Context,
        batch: &'a [Datapoint],
    ) -> BoxFuture<'a, Result<(), ContractError>> {
        self.add_datapoints(ctx, batch)
    }
}

impl Accept<Event> for dyn EventSink {
    fn sink_name(&self) -> &str {
        self.name()
    }

    fn accept<'a>(
        &'a self,
        ctx: &'a Context,
        batch: &'a [Event],
    ) -> BoxFuture<'a, Result<(), ContractError>> {
        self.add_events(ctx, batch)
    }
}

impl Accept<Span> for dyn SpanSink {
    fn sink_name(&self) -> &str {
        self.name()
    }

    fn accept<'a>(
        &'a self,
        ctx: &'a Context,
        batch: &'a [Span],
    ) -> BoxFuture<'a, Result<(), ContractError>> {
        self.add_spans(ctx, batch)
    }
}

// A demultiplexer is itself a sink of every kind, so fan-outs can be nested.

#[async_trait]
impl PointSink for Demultiplexer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add_datapoints(
        &self,
        ctx: &Context,
        points: &[Datapoint],
    ) -> Result<(), ContractError> {
        Demultiplexer::add_datapoints(self, ctx, points)
            .await
            .map_err(|e| ContractError::downstream(&self.name, e))
    }
}

#[async_trait]
impl EventSink for Demultiplexer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add_events(&self, ctx: &Context, events: &[Event]) -> Result<(), ContractError> {
        Demultiplexer::add_events(self, ctx, events)
            .await
            .map_err(|e| ContractError::downstream(&self.name, e))
    }
}

#[async_trait]
impl SpanSink for Demultiplexer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add_spans(&self, ctx: &Context, spans: &[Span]) -> Result<(), ContractError> {
        Demultiplexer::add_spans(self, ctx, spans)
            .await
            .map_err(|e| ContractError::downstream(&self.name, e))
    }
}
