//! Context - cancellation and deadline propagated to every sink
//!
//! The demultiplexer never interprets the context; it only hands it to sinks,
//! which are expected to stop promptly and report a failure once it is done.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::ContractError;

/// Cancellation/deadline context for one broadcast call
///
/// Cloning is cheap and shares the same cancellation state.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Root context: never cancelled unless [`Context::cancel`] is called, no deadline
    pub fn background() -> Self {
        Self::default()
    }

    /// Context driven by an existing cancellation token
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Attach a deadline, keeping the earlier one if already set
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Attach a deadline `timeout` from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a child context
    ///
    /// Cancelling the parent cancels the child; cancelling the child leaves the
    /// parent untouched. The deadline is inherited.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancel this context and all of its children
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether [`Context::cancel`] was called on this context or a parent
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline (zero once passed), `None` without deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Whether the context is cancelled or past its deadline
    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolve once the context is cancelled or its deadline passes
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Fail fast for a sink about to do work under a finished context
    ///
    /// # Errors
    /// `Cancelled` when cancelled, `DeadlineExceeded` when past the deadline.
    pub fn check(&self, sink_name: &str) -> Result<(), ContractError> {
        if self.is_cancelled() {
            return Err(ContractError::Cancelled {
                sink_name: sink_name.to_string(),
            });
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ContractError::DeadlineExceeded {
                sink_name: sink_name.to_string(),
            });
        }
        Ok(())
    }

    /// Underlying cancellation token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
