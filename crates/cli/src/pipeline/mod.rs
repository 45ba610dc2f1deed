//! Pipeline orchestration module.

mod batcher;
mod input;
mod orchestrator;
mod stats;

pub use batcher::{Batch, Batcher};
pub use input::{InputSource, RecordReader};
pub use orchestrator::{Pipeline, PipelineConfig};
pub use stats::PipelineStats;
