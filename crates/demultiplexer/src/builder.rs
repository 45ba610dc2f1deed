//! DemultiplexerBuilder - wires sinks into per-kind lists

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use contracts::{
    DemuxBlueprint, EventSink, FanoutMode, PointSink, RecordKind, SinkConfig, SinkType, SpanSink,
};

use crate::demultiplexer::Demultiplexer;
use crate::error::DemuxError;
use crate::sinks::{FileSink, LogSink, MemorySink, NetworkSink};

/// Builder for creating a Demultiplexer
///
/// Sinks keep the order in which they are added; that order is the
/// invocation order of each list.
pub struct DemultiplexerBuilder {
    name: String,
    mode: FanoutMode,
    datapoint_sinks: Vec<Arc<dyn PointSink>>,
    event_sinks: Vec<Arc<dyn EventSink>>,
    span_sinks: Vec<Arc<dyn SpanSink>>,
}

impl Default for DemultiplexerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DemultiplexerBuilder {
    pub fn new() -> Self {
        Self {
            name: "demultiplexer".to_string(),
            mode: FanoutMode::default(),
            datapoint_sinks: Vec::new(),
            event_sinks: Vec::new(),
            span_sinks: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn mode(mut self, mode: FanoutMode) -> Self {
        self.mode = mode;
        self
    }

    /// Append a sink to the points list
    pub fn point_sink(mut self, sink: Arc<dyn PointSink>) -> Self {
        self.datapoint_sinks.push(sink);
        self
    }

    /// Append a sink to the events list
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sinks.push(sink);
        self
    }

    /// Append a sink to the spans list
    pub fn span_sink(mut self, sink: Arc<dyn SpanSink>) -> Self {
        self.span_sinks.push(sink);
        self
    }

    /// Append one sink instance to the list of every kind in `kinds`
    pub fn sink<S>(mut self, sink: Arc<S>, kinds: &[RecordKind]) -> Self
    where
        S: PointSink + EventSink + SpanSink + 'static,
    {
        self.wire(sink, kinds);
        self
    }

    fn wire<S>(&mut self, sink: Arc<S>, kinds: &[RecordKind])
    where
        S: PointSink + EventSink + SpanSink + 'static,
    {
        for kind in kinds {
            match kind {
                RecordKind::Points => self.datapoint_sinks.push(sink.clone()),
                RecordKind::Events => self.event_sinks.push(sink.clone()),
                RecordKind::Spans => self.span_sinks.push(sink.clone()),
            }
        }
    }

    pub fn build(self) -> Demultiplexer {
        Demultiplexer::new(self.datapoint_sinks, self.event_sinks, self.span_sinks)
            .with_name(self.name)
            .with_mode(self.mode)
    }

    /// Create every configured sink and wire it per its `kinds`
    ///
    /// Memory sinks are also returned in the inventory so callers can read
    /// back what they received.
    #[instrument(
        name = "demultiplexer_from_blueprint",
        skip(blueprint),
        fields(sink_count = blueprint.sinks.len())
    )]
    pub async fn from_blueprint(
        blueprint: &DemuxBlueprint,
    ) -> Result<(Demultiplexer, SinkInventory), DemuxError> {
        let mut builder = Self::new().mode(blueprint.fanout.mode);
        let mut inventory = SinkInventory::default();

        for config in &blueprint.sinks {
            builder.add_configured(config, &mut inventory).await?;
        }

        let demux = builder.build();
        info!(
            points = demux.sink_count(RecordKind::Points),
            events = demux.sink_count(RecordKind::Events),
            spans = demux.sink_count(RecordKind::Spans),
            mode = ?demux.mode(),
            "Demultiplexer built"
        );
        Ok((demux, inventory))
    }

    #[instrument(
        name = "demultiplexer_create_sink",
        skip(self, config, inventory),
        fields(sink = %config.name, sink_type = ?config.sink_type)
    )]
    async fn add_configured(
        &mut self,
        config: &SinkConfig,
        inventory: &mut SinkInventory,
    ) -> Result<(), DemuxError> {
        let kinds = config.kinds.as_slice();
        match config.sink_type {
            SinkType::Log => {
                self.wire(Arc::new(LogSink::new(&config.name)), kinds);
            }
            SinkType::Memory => {
                let sink = MemorySink::from_params(&config.name, &config.params)
                    .map_err(|e| DemuxError::sink_creation(&config.name, e.to_string()))?;
                let sink = Arc::new(sink);
                inventory.memory.insert(config.name.clone(), sink.clone());
                self.wire(sink, kinds);
            }
            SinkType::File => {
                let sink = FileSink::from_params(&config.name, &config.params)
                    .await
                    .map_err(|e| DemuxError::sink_creation(&config.name, e.to_string()))?;
                self.wire(Arc::new(sink), kinds);
            }
            SinkType::Network => {
                let sink = NetworkSink::from_params(&config.name, &config.params)
                    .await
                    .map_err(|e| DemuxError::sink_creation(&config.name, e.to_string()))?;
                self.wire(Arc::new(sink), kinds);
            }
        }
        debug!(sink = %config.name, kinds = ?config.kinds, "Sink wired");
        Ok(())
    }
}

/// Handles to configured sinks whose contents can be inspected
#[derive(Default)]
pub struct SinkInventory {
    memory: HashMap<String, Arc<MemorySink>>,
}

impl SinkInventory {
    /// Memory sink configured under `name`
    pub fn memory(&self, name: &str) -> Option<Arc<MemorySink>> {
        self.memory.get(name).cloned()
    }

    /// Names of all configured memory sinks
    pub fn memory_names(&self) -> impl Iterator<Item = &str> {
        self.memory.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }
}
