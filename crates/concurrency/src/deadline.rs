//! Cooperative cancellation at I/O boundaries
//!
//! Long-running operations — a merge replaying a large branch delta, a
//! paginated query resuming a cursor — accept a [`Deadline`] and check it at
//! each suspension point rather than relying on the caller to race a
//! `tokio::time::timeout` around the whole call. This keeps partial work
//! (a half-replayed merge) from being silently abandoned mid-mutation: the
//! check happens between atomic steps, not inside one.

use std::time::{Duration, Instant};

/// A point in time after which an operation should stop and return
/// [`branchgraph_core::GraphError::Transient`].
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// No deadline: the operation runs to completion.
    pub fn none() -> Self {
        Deadline { at: None }
    }

    /// A deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Deadline {
            at: Some(Instant::now() + timeout),
        }
    }

    /// Whether the deadline has passed.
    pub fn is_expired(&self) -> bool {
        matches!(self.at, Some(at) if Instant::now() >= at)
    }

    /// Time remaining, or `None` if there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Check the deadline, returning a `Transient` error if it has expired.
    pub fn check(&self) -> branchgraph_core::GraphResult<()> {
        if self.is_expired() {
            Err(branchgraph_core::GraphError::Transient(
                "deadline exceeded".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Deadline::none()
    }
}
