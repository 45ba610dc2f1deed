//! Sink implementations
//!
//! Contains LogSink, MemorySink, FileSink and NetworkSink. Each one accepts
//! all three record kinds; wiring decides which lists it joins.

mod file;
mod log;
mod memory;
mod network;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;
pub use self::memory::MemorySink;
pub use self::network::{
    NetworkFormat, NetworkSink, NetworkSinkConfig, ReceivedBatch, WireBatch,
};
