//! Retry policies for the two retryable error kinds
//!
//! `GraphError::Conflict` (an optimistic-concurrency check lost a race) is
//! retried at most once, immediately — the assumption is that the
//! conflicting writer has already released its lock by the time the caller
//! notices. `GraphError::Transient` (lock contention, a busy downstream
//! dependency) gets up to three retries with exponential backoff, since the
//! condition causing it may take longer than one scheduler tick to clear.

use branchgraph_core::{GraphError, GraphResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff schedule for [`retry_transient`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of additional attempts after the first.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Up to 3 retries, starting at 10ms and doubling.
    pub const fn standard() -> Self {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(10),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::standard()
    }
}

/// Retry `op` once if it fails with `GraphError::Conflict`, otherwise return
/// immediately on the first error or success.
pub async fn retry_conflict<T, F, Fut>(mut op: F) -> GraphResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = GraphResult<T>>,
{
    match op().await {
        Err(GraphError::Conflict { entity, branch }) => {
            warn!(%entity, %branch, "retrying after write conflict");
            op().await
        }
        other => other,
    }
}

/// Retry `op` with exponential backoff while it fails with
/// `GraphError::Transient`, up to `policy.max_retries` additional attempts.
pub async fn retry_transient<T, F, Fut>(policy: RetryPolicy, mut op: F) -> GraphResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = GraphResult<T>>,
{
    let mut delay = policy.base_delay;
    let mut attempt = 0;
    loop {
        match op().await {
            Err(GraphError::Transient(reason)) if attempt < policy.max_retries => {
                warn!(attempt, %reason, "retrying after transient failure");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn conflict_retries_exactly_once() {
        let calls = AtomicU32::new(0);
        let result = retry_conflict(|| async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(GraphError::Conflict {
                    entity: "n1".into(),
                    branch: "main".into(),
                })
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn conflict_does_not_retry_twice() {
        let calls = AtomicU32::new(0);
        let result: GraphResult<()> = retry_conflict(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(GraphError::Conflict {
                entity: "n1".into(),
                branch: "main".into(),
            })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transient_gives_up_after_max_retries() {
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        };
        let calls = AtomicU32::new(0);
        let result: GraphResult<()> = retry_transient(policy, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(GraphError::Transient("busy".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn transient_succeeds_before_exhausting_retries() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(RetryPolicy::standard(), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(GraphError::Transient("busy".into()))
            } else {
                Ok("ok")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
    }
}
