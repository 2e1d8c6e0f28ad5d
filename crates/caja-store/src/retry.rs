//! # Retry & Timeout Policy
//!
//! Wraps every remote operation with an explicit per-attempt timeout and a
//! bounded exponential-backoff retry for transient failures.
//!
//! ## Why
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A hung remote call must never hang the UI action forever, and a       │
//! │  short-lived lock conflict must not surface as a user-facing error.    │
//! │                                                                         │
//! │  attempt 1 ──timeout──► transient? ──yes──► sleep(backoff) ──► attempt 2│
//! │                              │                                          │
//! │                              no                                         │
//! │                              ▼                                          │
//! │                    terminal error to caller                             │
//! │                                                                         │
//! │  Retries apply only to errors classified transient (pool exhaustion,   │
//! │  lock contention, timeouts). NotFound, validation failures and failed  │
//! │  preconditions return immediately - retrying them cannot help.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Retried operations must be repeatable: single-statement writes are, and
//! transactional closures are because a failed attempt rolls back whole.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tracing::warn;

use crate::config::RetryConfig;
use crate::error::{StoreError, StoreResult};

/// Bounded retry policy for remote operations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1).
    pub max_attempts: u32,
    /// Per-attempt timeout.
    pub op_timeout: Duration,
    /// Initial backoff between attempts.
    pub initial_backoff: Duration,
    /// Backoff ceiling.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            op_timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts.max(1),
            op_timeout: Duration::from_millis(config.timeout_ms),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_secs(config.max_backoff_secs),
        }
    }
}

impl RetryPolicy {
    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        }
    }
}

/// Runs `attempt` under the policy: per-attempt timeout, bounded retries
/// with exponential backoff for transient failures, terminal errors
/// surfaced whole.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    op: &'static str,
    mut attempt: F,
) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut backoff = policy.create_backoff();

    for attempt_no in 1..=policy.max_attempts {
        let result = match tokio::time::timeout(policy.op_timeout, attempt()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout { op }),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt_no < policy.max_attempts => {
                let delay = backoff.next_backoff().unwrap_or(policy.max_backoff);
                warn!(op = %op, attempt = attempt_no, ?delay, error = %err, "Transient failure, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }

    // max_attempts >= 1, so the loop always returns
    unreachable!("retry loop exited without a result")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use caja_db::DbError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            op_timeout: Duration::from_millis(200),
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let calls = AtomicU32::new(0);
        let result: StoreResult<u32> = with_retry(&fast_policy(), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(StoreError::Remote(DbError::PoolExhausted))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_terminal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: StoreResult<u32> = with_retry(&fast_policy(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Remote(DbError::not_found("sales", "s1"))) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hung_attempts_time_out() {
        let result: StoreResult<()> = with_retry(&fast_policy(), "hung-op", || async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(StoreError::Timeout { op: "hung-op" })));
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let calls = AtomicU32::new(0);
        let result: StoreResult<()> = with_retry(&fast_policy(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Remote(DbError::PoolExhausted)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
