//! LogSink - logs batch summaries via tracing

use std::collections::BTreeSet;

use async_trait::async_trait;
use contracts::{Context, ContractError, Datapoint, Event, EventSink, PointSink, Span, SpanSink};
use tracing::{info, instrument};

/// Sink that logs batch summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Up to three distinct values, joined for a one-line summary
fn sample<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let distinct: BTreeSet<&str> = values.collect();
    let mut shown: Vec<&str> = distinct.iter().take(3).copied().collect();
    if distinct.len() > 3 {
        shown.push("...");
    }
    shown.join(",")
}

#[async_trait]
impl PointSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_add_datapoints",
        skip_all,
        fields(sink = %self.name, batch = points.len())
    )]
    async fn add_datapoints(
        &self,
        _ctx: &Context,
        points: &[Datapoint],
    ) -> Result<(), ContractError> {
        info!(
            sink = %self.name,
            count = points.len(),
            metrics = %sample(points.iter().map(|p| p.metric.as_str())),
            "Datapoints received"
        );
        Ok(())
    }
}

#[async_trait]
impl EventSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_add_events",
        skip_all,
        fields(sink = %self.name, batch = events.len())
    )]
    async fn add_events(&self, _ctx: &Context, events: &[Event]) -> Result<(), ContractError> {
        info!(
            sink = %self.name,
            count = events.len(),
            event_types = %sample(events.iter().map(|e| e.event_type.as_str())),
            "Events received"
        );
        Ok(())
    }
}

#[async_trait]
impl SpanSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_add_spans",
        skip_all,
        fields(sink = %self.name, batch = spans.len())
    )]
    async fn add_spans(&self, _ctx: &Context, spans: &[Span]) -> Result<(), ContractError> {
        let traces: BTreeSet<&str> = spans.iter().map(|s| s.trace_id.as_str()).collect();
        info!(
            sink = %self.name,
            count = spans.len(),
            traces = traces.len(),
            "Spans received"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sink_accepts_all_kinds() {
        let sink = LogSink::new("test_log");
        let ctx = Context::background();

        assert!(sink
            .add_datapoints(&ctx, &[Datapoint::gauge("cpu", 1.0)])
            .await
            .is_ok());
        assert!(sink.add_events(&ctx, &[Event::new("deploy")]).await.is_ok());
        assert!(sink.add_spans(&ctx, &[Span::new("t", "1")]).await.is_ok());
    }

    #[test]
    fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }

    #[test]
    fn test_sample_truncates() {
        let names = ["d", "a", "c", "b", "a"];
        assert_eq!(sample(names.iter().copied()), "a,b,c,...");
        assert_eq!(sample(["x"].iter().copied()), "x");
    }
}
