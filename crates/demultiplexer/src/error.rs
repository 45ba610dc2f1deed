//! Demultiplexer error types

use std::fmt;

use contracts::{ContractError, RecordKind};
use thiserror::Error;

/// One sink's failure within a broadcast
#[derive(Debug)]
pub struct SinkFailure {
    /// Position of the sink in its list
    pub index: usize,
    /// Sink name
    pub sink: String,
    /// Failure reported by the sink
    pub error: ContractError,
}

impl fmt::Display for SinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}: {}", self.index, self.sink, self.error)
    }
}

/// Aggregated failure of one broadcast call
///
/// Never empty: a broadcast with no failures is `Ok(())`.
/// Failures are kept in invocation order.
#[derive(Debug)]
pub struct BroadcastError {
    kind: RecordKind,
    attempted: usize,
    failures: Vec<SinkFailure>,
}

impl BroadcastError {
    /// Aggregate the failures of one broadcast
    ///
    /// Returns `Ok(())` when `failures` is empty.
    pub fn from_failures(
        kind: RecordKind,
        attempted: usize,
        failures: Vec<SinkFailure>,
    ) -> Result<(), Self> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Self {
                kind,
                attempted,
                failures,
            })
        }
    }

    /// Record kind that was broadcast
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Number of sinks invoked by the broadcast
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    /// All failures, in invocation order
    pub fn failures(&self) -> &[SinkFailure] {
        &self.failures
    }

    /// Number of failed sinks (always >= 1)
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Always false; present for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Names of the failed sinks, in invocation order
    pub fn sink_names(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.sink.as_str()).collect()
    }

    /// Failure of the last sink to fail
    pub fn last(&self) -> Option<&SinkFailure> {
        self.failures.last()
    }

    /// Consume into the individual failures
    pub fn into_failures(self) -> Vec<SinkFailure> {
        self.failures
    }
}

impl fmt::Display for BroadcastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} {} sinks failed: ",
            self.failures.len(),
            self.attempted,
            self.kind
        )?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BroadcastError {}

/// Errors raised while wiring a demultiplexer
#[derive(Debug, Error)]
pub enum DemuxError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Contract error
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DemuxError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(index: usize, sink: &str, message: &str) -> SinkFailure {
        SinkFailure {
            index,
            sink: sink.to_string(),
            error: ContractError::sink_write(sink, message),
        }
    }

    #[test]
    fn test_no_failures_is_ok() {
        assert!(BroadcastError::from_failures(RecordKind::Points, 3, Vec::new()).is_ok());
    }

    #[test]
    fn test_keeps_every_failure() {
        let err = BroadcastError::from_failures(
            RecordKind::Spans,
            4,
            vec![failure(0, "a", "refused"), failure(3, "d", "timeout")],
        )
        .unwrap_err();

        assert_eq!(err.len(), 2);
        assert_eq!(err.attempted(), 4);
        assert_eq!(err.sink_names(), vec!["a", "d"]);
        assert_eq!(err.last().map(|f| f.index), Some(3));
    }

    #[test]
    fn test_display_lists_all_failures() {
        let err = BroadcastError::from_failures(
            RecordKind::Events,
            2,
            vec![failure(0, "a", "refused"), failure(1, "b", "timeout")],
        )
        .unwrap_err();

        let text = err.to_string();
        assert!(text.starts_with("2/2 events sinks failed"));
        assert!(text.contains("#0 a: sink 'a' write error: refused"));
        assert!(text.contains("#1 b: sink 'b' write error: timeout"));
    }
}
