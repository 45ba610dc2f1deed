//! MemorySink - keeps received records in memory

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use contracts::{
    Context, ContractError, Datapoint, Event, EventSink, PointSink, RecordKind, Span, SpanSink,
};
use tracing::debug;

#[derive(Debug, Default)]
struct Store {
    points: Vec<Datapoint>,
    events: Vec<Event>,
    spans: Vec<Span>,
    batches: HashMap<RecordKind, usize>,
}

/// Sink that stores every record it receives
///
/// Used for local aggregation and inspection. With a capacity set, a batch
/// that would push a kind past the capacity is refused as a whole.
pub struct MemorySink {
    name: String,
    capacity: Option<usize>,
    store: Mutex<Store>,
}

impl MemorySink {
    /// Create an unbounded MemorySink
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: None,
            store: Mutex::new(Store::default()),
        }
    }

    /// Bound the number of records kept per kind
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Create from params (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let capacity = params
            .get("capacity")
            .map(|s| {
                s.parse::<usize>().map_err(|e| {
                    ContractError::config_validation(
                        format!("sinks[{name}].params.capacity"),
                        format!("invalid capacity '{s}': {e}"),
                    )
                })
            })
            .transpose()?;

        Ok(Self {
            capacity,
            ..Self::new(name)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Copy of the stored points
    pub fn points(&self) -> Vec<Datapoint> {
        self.lock().points.clone()
    }

    /// Copy of the stored events
    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    /// Copy of the stored spans
    pub fn spans(&self) -> Vec<Span> {
        self.lock().spans.clone()
    }

    /// Number of stored records of a kind
    pub fn len(&self, kind: RecordKind) -> usize {
        let store = self.lock();
        match kind {
            RecordKind::Points => store.points.len(),
            RecordKind::Events => store.events.len(),
            RecordKind::Spans => store.spans.len(),
        }
    }

    /// Whether nothing of any kind is stored
    pub fn is_empty(&self) -> bool {
        RecordKind::ALL.iter().all(|k| self.len(*k) == 0)
    }

    /// Number of accepted batches of a kind
    pub fn batches(&self, kind: RecordKind) -> usize {
        self.lock().batches.get(&kind).copied().unwrap_or(0)
    }

    /// Drop everything stored
    pub fn clear(&self) {
        *self.lock() = Store::default();
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_room(&self, held: usize, incoming: usize) -> Result<(), ContractError> {
        match self.capacity {
            Some(max) if held + incoming > max => Err(ContractError::BufferOverflow {
                sink_name: self.name.clone(),
                depth: held + incoming,
                max,
            }),
            _ => Ok(()),
        }
    }

    fn store_batch<R: Clone>(
        &self,
        ctx: &Context,
        kind: RecordKind,
        batch: &[R],
        select: impl FnOnce(&mut Store) -> &mut Vec<R>,
    ) -> Result<(), ContractError> {
        ctx.check(&self.name)?;

        let mut store = self.lock();
        let records = select(&mut store);
        self.ensure_room(records.len(), batch.len())?;
        records.extend_from_slice(batch);
        let stored = records.len();
        *store.batches.entry(kind).or_insert(0) += 1;

        debug!(sink = %self.name, kind = %kind, stored, "Batch stored");
        Ok(())
    }
}

#[async_trait]
impl PointSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add_datapoints(
        &self,
        ctx: &Context,
        points: &[Datapoint],
    ) -> Result<(), ContractError> {
        self.store_batch(ctx, RecordKind::Points, points, |s| &mut s.points)
    }
}

#[async_trait]
impl EventSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add_events(&self, ctx: &Context, events: &[Event]) -> Result<(), ContractError> {
        self.store_batch(ctx, RecordKind::Events, events, |s| &mut s.events)
    }
}

#[async_trait]
impl SpanSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add_spans(&self, ctx: &Context, spans: &[Span]) -> Result<(), ContractError> {
        self.store_batch(ctx, RecordKind::Spans, spans, |s| &mut s.spans)
    }
}
