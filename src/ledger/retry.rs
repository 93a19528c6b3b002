//! Bounded retry with exponential backoff.
//!
//! Used only by the refund path: everything else retries by broker
//! redelivery, which keeps the in-process retry surface small. Business
//! errors pass through on the first attempt; only transient store errors
//! are retried.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::error::LedgerError;
use crate::config::RefundRetryConfig;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: u32,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            multiplier: 2,
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl From<&RefundRetryConfig> for RetryPolicy {
    fn from(config: &RefundRetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            multiplier: config.multiplier,
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

/// A failed operation together with how many attempts were made.
#[derive(Debug)]
pub struct RetryExhausted {
    pub error: LedgerError,
    pub attempts: u32,
}

/// Run `op` under `policy`.
///
/// Transient errors sleep and retry up to `max_attempts` total attempts;
/// any other error returns immediately with the attempt count so far.
pub async fn with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, RetryExhausted>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut attempt = 1u32;
    let mut delay = policy.initial_backoff;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if !error.is_transient() || attempt >= policy.max_attempts => {
                return Err(RetryExhausted { error, attempts: attempt });
            }
            Err(error) => {
                warn!(
                    attempt = attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Transient failure; backing off"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * policy.multiplier).min(policy.max_backoff);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            multiplier: 2,
            max_backoff: Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, LedgerError>(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_error_retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(&fast_policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(LedgerError::Database("connection reset".into()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_transient_error_exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LedgerError::Database("still down".into())) }
        })
        .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert!(exhausted.error.is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_business_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(LedgerError::InsufficientBalance {
                    current: 0,
                    required: 100,
                })
            }
        })
        .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 1);
        assert!(!exhausted.error.is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
