//! Layered error definitions
//!
//! Categorized by source: config / sink / context

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    /// Sink refused a batch because it would exceed its capacity
    #[error("buffer overflow for sink '{sink_name}': depth={depth}, max={max}")]
    BufferOverflow {
        sink_name: String,
        depth: usize,
        max: usize,
    },

    /// Failure reported by a nested fan-out
    #[error("sink '{sink_name}' downstream failure: {source}")]
    Downstream {
        sink_name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ===== Context Errors =====
    /// Context was cancelled before the sink finished
    #[error("sink '{sink_name}' cancelled")]
    Cancelled { sink_name: String },

    /// Context deadline passed before the sink finished
    #[error("sink '{sink_name}' deadline exceeded")]
    DeadlineExceeded { sink_name: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink connection error
    pub fn sink_connection(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkConnection {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Wrap an error raised by a nested fan-out
    pub fn downstream(
        sink_name: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Downstream {
            sink_name: sink_name.into(),
            source: Box::new(source),
        }
    }

    /// Whether this failure was caused by the context rather than the sink itself
    pub fn is_context_error(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::DeadlineExceeded { .. })
    }
}
