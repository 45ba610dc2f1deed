//! DemuxBlueprint - Config Loader output
//!
//! Describes the fan-out wiring: which sinks exist, how each is configured and
//! which record kinds it receives.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::RecordKind;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete demultiplexer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct DemuxBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Fan-out behaviour
    #[serde(default)]
    pub fanout: FanoutConfig,

    /// Sink definitions, in invocation order
    #[serde(default)]
    #[validate(nested)]
    pub sinks: Vec<SinkConfig>,
}

impl DemuxBlueprint {
    /// Sinks wired to the given record kind, in config order
    pub fn sinks_for(&self, kind: RecordKind) -> impl Iterator<Item = &SinkConfig> {
        self.sinks.iter().filter(move |s| s.receives(kind))
    }
}

/// Fan-out settings
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// How sinks within one list are driven
    #[serde(default)]
    pub mode: FanoutMode,
}

/// How sinks within one list are driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutMode {
    /// One sink at a time, in list order
    #[default]
    Sequential,
    /// All sinks of the list polled together on the calling task
    Concurrent,
}

/// Sink output config
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink name
    #[validate(length(min = 1, message = "sink name cannot be empty"))]
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Record kinds routed to this sink
    #[serde(default = "default_kinds")]
    #[validate(length(min = 1, message = "sink must receive at least one record kind"))]
    pub kinds: Vec<RecordKind>,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl SinkConfig {
    /// Whether this sink is wired into the list of `kind`
    pub fn receives(&self, kind: RecordKind) -> bool {
        self.kinds.contains(&kind)
    }
}

fn default_kinds() -> Vec<RecordKind> {
    RecordKind::ALL.to_vec()
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// In-memory store
    Memory,
    /// JSON-lines files
    File,
    /// UDP datagrams
    Network,
}
