//! # Demultiplexer
//!
//! Telemetry fan-out.
//!
//! Responsibilities:
//! - Broadcast each batch of points, events or spans to every sink of its kind
//! - Attempt every sink exactly once, whatever its siblings report
//! - Return every sink failure to the caller, in invocation order

pub mod builder;
pub mod demultiplexer;
pub mod error;
pub mod metrics;
pub mod sinks;

pub use builder::{DemultiplexerBuilder, SinkInventory};
pub use contracts::{Context, EventSink, PointSink, SpanSink};
pub use demultiplexer::Demultiplexer;
pub use error::{BroadcastError, DemuxError, SinkFailure};
pub use metrics::{DemuxMetrics, FanoutMetrics, FanoutSnapshot};
pub use sinks::{FileSink, LogSink, MemorySink, NetworkSink};
