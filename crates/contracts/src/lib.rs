//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace:
//! telemetry record shapes, the sink capabilities, the cancellation context
//! and the configuration blueprint.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Points and events carry wall-clock `DateTime<Utc>` timestamps
//! - Spans carry Zipkin-style microsecond epoch timestamps and durations

mod blueprint;
mod context;
mod error;
mod record;
mod sink;

pub use blueprint::*;
pub use context::Context;
pub use error::*;
pub use record::*;
pub use sink::*;
