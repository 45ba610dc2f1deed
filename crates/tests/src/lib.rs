//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - contract snapshot checks
//! - config -> builder -> broadcast flows (no network peers required)
//! - failure aggregation scenarios across sink lists

#[cfg(test)]
mod contract_tests {
    use contracts::{ContractError, RecordKind, TelemetryRecord};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(RecordKind::ALL.len(), 3);
    }

    #[test]
    fn test_record_wire_tag() {
        let line = r#"{"type":"span","trace_id":"t","id":"1","kind":"CLIENT"}"#;
        let record: TelemetryRecord = serde_json::from_str(line).unwrap();
        assert_eq!(record.kind(), RecordKind::Spans);
    }

    #[test]
    fn test_context_errors_are_flagged() {
        let err = ContractError::Cancelled {
            sink_name: "x".into(),
        };
        assert!(err.is_context_error());
        assert!(!ContractError::sink_write("x", "boom").is_context_error());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        Context, ContractError, Datapoint, Event, EventSink, PointSink, RecordKind, Span,
        SpanSink,
    };
    use demultiplexer::{DemultiplexerBuilder, FileSink, MemorySink};
    use observability::BroadcastStatsAggregator;

    /// Sink that records every call and optionally fails with a fixed message
    struct ScriptedSink {
        name: String,
        fail_with: Option<String>,
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedSink {
        fn ok(name: &str) -> Arc<Self> {
            Self::build(name, None)
        }

        fn failing(name: &str, message: &str) -> Arc<Self> {
            Self::build(name, Some(message.to_string()))
        }

        fn build(name: &str, fail_with: Option<String>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                fail_with,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }

        fn handle(&self, labels: Vec<String>) -> Result<(), ContractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().extend(labels);
            match &self.fail_with {
                Some(message) => Err(ContractError::sink_write(&self.name, message.clone())),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl PointSink for ScriptedSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn add_datapoints(
            &self,
            _ctx: &Context,
            points: &[Datapoint],
        ) -> Result<(), ContractError> {
            self.handle(points.iter().map(|p| p.metric.clone()).collect())
        }
    }

    #[async_trait]
    impl EventSink for ScriptedSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn add_events(&self, _ctx: &Context, events: &[Event]) -> Result<(), ContractError> {
            self.handle(events.iter().map(|e| e.event_type.clone()).collect())
        }
    }

    #[async_trait]
    impl SpanSink for ScriptedSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn add_spans(&self, _ctx: &Context, spans: &[Span]) -> Result<(), ContractError> {
            self.handle(spans.iter().map(|s| s.id.clone()).collect())
        }
    }

    fn three_points() -> Vec<Datapoint> {
        vec![
            Datapoint::gauge("p1", 1.0),
            Datapoint::gauge("p2", 2.0),
            Datapoint::gauge("p3", 3.0),
        ]
    }

    /// [A ok, B fails "timeout", C ok] with three points
    #[tokio::test]
    async fn test_middle_sink_failure_scenario() {
        let a = ScriptedSink::ok("A");
        let b = ScriptedSink::failing("B", "timeout");
        let c = ScriptedSink::ok("C");
        let demux = DemultiplexerBuilder::new()
            .sink(a.clone(), &[RecordKind::Points])
            .sink(b.clone(), &[RecordKind::Points])
            .sink(c.clone(), &[RecordKind::Points])
            .build();

        let err = demux
            .add_datapoints(&Context::background(), &three_points())
            .await
            .unwrap_err();

        for sink in [&a, &b, &c] {
            assert_eq!(sink.calls(), 1);
            assert_eq!(sink.seen(), vec!["p1", "p2", "p3"]);
        }
        assert_eq!(err.len(), 1);
        assert_eq!(err.failures()[0].sink, "B");
        assert_eq!(err.failures()[0].index, 1);
        assert!(err.to_string().contains("timeout"));
    }

    /// Same wiring with an empty batch
    #[tokio::test]
    async fn test_empty_batch_scenario() {
        let a = ScriptedSink::ok("A");
        let b = ScriptedSink::failing("B", "timeout");
        let demux = DemultiplexerBuilder::new()
            .sink(a.clone(), &RecordKind::ALL)
            .sink(b.clone(), &RecordKind::ALL)
            .build();
        let ctx = Context::background();

        assert!(demux.add_datapoints(&ctx, &[]).await.is_ok());
        assert!(demux.add_events(&ctx, &[]).await.is_ok());
        assert!(demux.add_spans(&ctx, &[]).await.is_ok());
        assert_eq!(a.calls(), 0);
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_event_failures_do_not_touch_spans() {
        let failing = ScriptedSink::failing("events_down", "unavailable");
        let spans = ScriptedSink::ok("spans");
        let demux = DemultiplexerBuilder::new()
            .sink(failing.clone(), &[RecordKind::Events])
            .sink(spans.clone(), &[RecordKind::Spans])
            .build();
        let ctx = Context::background();

        assert!(demux.add_events(&ctx, &[Event::new("e")]).await.is_err());
        assert!(demux
            .add_spans(&ctx, &[Span::new("t", "s1")])
            .await
            .is_ok());
        assert_eq!(spans.seen(), vec!["s1"]);
    }

    #[tokio::test]
    async fn test_all_failures_are_kept_in_order() {
        let demux = DemultiplexerBuilder::new()
            .sink(ScriptedSink::failing("x", "first"), &[RecordKind::Spans])
            .sink(ScriptedSink::ok("y"), &[RecordKind::Spans])
            .sink(ScriptedSink::failing("z", "second"), &[RecordKind::Spans])
            .build();

        let err = demux
            .add_spans(&Context::background(), &[Span::new("t", "1")])
            .await
            .unwrap_err();

        assert_eq!(err.sink_names(), vec!["x", "z"]);
        assert_eq!(err.attempted(), 3);
        let text = err.to_string();
        assert!(text.contains("first") && text.contains("second"), "{text}");
    }

    const CONFIG: &str = r#"
[fanout]
mode = "concurrent"

[[sinks]]
name = "everything"
sink_type = "memory"

[[sinks]]
name = "small"
sink_type = "memory"
kinds = ["points"]
[sinks.params]
capacity = "2"

[[sinks]]
name = "debug"
sink_type = "log"
kinds = ["events"]
"#;

    #[tokio::test]
    async fn test_config_to_broadcast() {
        let blueprint = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let (demux, inventory) = DemultiplexerBuilder::from_blueprint(&blueprint)
            .await
            .unwrap();
        let ctx = Context::background();
        let mut stats = BroadcastStatsAggregator::new();

        let points = three_points();
        let result = demux.add_datapoints(&ctx, &points).await;
        let failed = result.as_ref().err().map(|e| e.sink_names()).unwrap_or_default();
        stats.update(RecordKind::Points, points.len(), &failed);

        let err = result.unwrap_err();
        assert_eq!(err.sink_names(), vec!["small"]);
        assert!(matches!(
            err.failures()[0].error,
            ContractError::BufferOverflow { max: 2, .. }
        ));

        demux.add_events(&ctx, &[Event::new("deploy")]).await.unwrap();
        stats.update(RecordKind::Events, 1, &[]);

        let everything: Arc<MemorySink> = inventory.memory("everything").unwrap();
        assert_eq!(everything.len(RecordKind::Points), 3);
        assert_eq!(everything.len(RecordKind::Events), 1);
        assert!(inventory.memory("small").unwrap().is_empty());

        let summary = stats.summary().to_string();
        assert!(summary.contains("small: 1 failures"), "{summary}");
        assert_eq!(stats.total_records(), 4);
    }

    #[tokio::test]
    async fn test_nested_demultiplexer_reports_downstream() {
        let inner = Arc::new(
            DemultiplexerBuilder::new()
                .name("inner")
                .sink(ScriptedSink::failing("leaf", "disk full"), &RecordKind::ALL)
                .build(),
        );
        let outer = DemultiplexerBuilder::new()
            .sink(ScriptedSink::ok("first"), &[RecordKind::Points])
            .sink(inner, &[RecordKind::Points])
            .build();

        let err = outer
            .add_datapoints(&Context::background(), &three_points())
            .await
            .unwrap_err();

        assert_eq!(err.sink_names(), vec!["inner"]);
        assert!(matches!(
            err.failures()[0].error,
            ContractError::Downstream { .. }
        ));
        assert!(err.to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn test_file_sink_alongside_failing_sink() {
        let dir = tempfile::tempdir().unwrap();
        let file = Arc::new(
            FileSink::new(
                "disk",
                demultiplexer::sinks::FileSinkConfig {
                    base_path: dir.path().to_path_buf(),
                },
            )
            .await
            .unwrap(),
        );
        let demux = DemultiplexerBuilder::new()
            .sink(ScriptedSink::failing("remote", "refused"), &[RecordKind::Events])
            .sink(file, &[RecordKind::Events])
            .build();

        let result = demux
            .add_events(&Context::background(), &[Event::new("a"), Event::new("b")])
            .await;

        assert!(result.is_err());
        let written: usize = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| {
                std::fs::read_to_string(entry.unwrap().path())
                    .unwrap()
                    .lines()
                    .count()
            })
            .sum();
        assert_eq!(written, 2);
    }

    #[tokio::test]
    async fn test_cancelled_context_reaches_every_sink() {
        let blueprint = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let (demux, inventory) = DemultiplexerBuilder::from_blueprint(&blueprint)
            .await
            .unwrap();
        let ctx = Context::background();
        ctx.cancel();

        let err = demux
            .add_datapoints(&ctx, &three_points())
            .await
            .unwrap_err();

        assert_eq!(err.sink_names(), vec!["everything", "small"]);
        assert!(err.failures().iter().all(|f| f.error.is_context_error()));
        assert!(inventory.memory("everything").unwrap().is_empty());
    }
}
