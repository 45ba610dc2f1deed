//! Sink traits - demultiplexer output interfaces
//!
//! One capability per record kind. A concrete sink implements any subset of
//! them; the demultiplexer only ever sees `Arc<dyn PointSink>` and friends.
//!
//! The traits use `async_trait` to stay object safe.

use async_trait::async_trait;

use crate::{Context, ContractError, Datapoint, Event, Span};

/// Consumer of metric datapoints
#[async_trait]
pub trait PointSink: Send + Sync {
    /// Sink name (used for logging/metrics and failure attribution)
    fn name(&self) -> &str;

    /// Accept a batch of datapoints
    ///
    /// The batch is shared with every other sink in the same list and must
    /// be treated as read-only.
    ///
    /// # Errors
    /// Returns the sink's failure reason (should include context)
    async fn add_datapoints(&self, ctx: &Context, points: &[Datapoint])
        -> Result<(), ContractError>;
}

/// Consumer of discrete events
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Sink name (used for logging/metrics and failure attribution)
    fn name(&self) -> &str;

    /// Accept a batch of events
    ///
    /// # Errors
    /// Returns the sink's failure reason (should include context)
    async fn add_events(&self, ctx: &Context, events: &[Event]) -> Result<(), ContractError>;
}

/// Consumer of trace spans
#[async_trait]
pub trait SpanSink: Send + Sync {
    /// Sink name (used for logging/metrics and failure attribution)
    fn name(&self) -> &str;

    /// Accept a batch of spans
    ///
    /// # Errors
    /// Returns the sink's failure reason (should include context)
    async fn add_spans(&self, ctx: &Context, spans: &[Span]) -> Result<(), ContractError>;
}
