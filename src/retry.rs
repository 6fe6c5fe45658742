//! Retry with exponential backoff for provider calls.
//!
//! Transient failures (HTTP 429, 5xx, transport errors, see
//! [`QaError::is_transient`]) are retried up to a fixed attempt budget with
//! exponentially growing, jittered delays. Any other failure, or exhaustion
//! of the budget, returns the last error to the caller.
//!
//! The delay schedule is computed by [`RetryPolicy::delay`], which is pure up
//! to the jitter draw; [`RetryPolicy::no_backoff`] gives tests a policy that
//! exercises the full loop without real elapsed time.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::QaError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // 1s, 2s, 4s, 8s, 16s, capped at 32s, plus up to 500ms jitter.
        Self {
            max_attempts: 6,
            base_delay_ms: 1000,
            max_delay_ms: 32_000,
            jitter_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget as the default policy, but no waiting between
    /// attempts. Intended for tests.
    pub fn no_backoff() -> Self {
        Self {
            max_attempts: 6,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter_ms: 0,
        }
    }

    /// Delay taken after failed attempt number `attempt` (counting from 0):
    /// `min(max_delay, base * 2^attempt)` plus a jitter in `0..=jitter_ms`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(1u64 << attempt.min(16))
            .min(self.max_delay_ms);
        let jitter = rand::thread_rng().gen_range(0..=self.jitter_ms);
        Duration::from_millis(exp + jitter)
    }
}

/// Run `op`, retrying transient failures per `policy`. Non-transient errors
/// return immediately; a transient error returned from here means the attempt
/// budget was exhausted.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, QaError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, QaError>>,
{
    let mut last_err = None;

    for attempt in 0..policy.max_attempts {
        if attempt > 0 {
            tokio::time::sleep(policy.delay(attempt - 1)).await;
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                tracing::debug!(attempt, error = %e, "transient upstream failure, will retry");
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| QaError::Internal("retry loop ran zero attempts".into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> QaError {
        QaError::Upstream {
            status: 503,
            message: "unavailable".into(),
        }
    }

    fn fatal() -> QaError {
        QaError::Upstream {
            status: 400,
            message: "bad request".into(),
        }
    }

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let policy = RetryPolicy {
            jitter_ms: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay(0), Duration::from_millis(1000));
        assert_eq!(policy.delay(1), Duration::from_millis(2000));
        assert_eq!(policy.delay(4), Duration::from_millis(16_000));
        assert_eq!(policy.delay(5), Duration::from_millis(32_000));
        assert_eq!(policy.delay(10), Duration::from_millis(32_000));
    }

    #[test]
    fn delay_jitter_stays_in_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let d = policy.delay(0).as_millis() as u64;
            assert!((1000..=1500).contains(&d), "delay {} out of bounds", d);
        }
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let result = retry_with_backoff(&RetryPolicy::no_backoff(), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient())
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_backoff(&RetryPolicy::no_backoff(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(fatal()) }
        })
        .await;
        assert!(matches!(
            result,
            Err(QaError::Upstream { status: 400, .. })
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_returns_the_last_transient_error() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_backoff(&RetryPolicy::no_backoff(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;
        let err = result.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(attempts.load(Ordering::SeqCst), 6);
    }
}
