//! Generic retry-with-backoff combinator.
//!
//! One retry loop shared by every call site that talks to a flaky remote:
//! the model gateway and the outbound email transport both use it with their
//! own retryable-error predicates.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Backoff policy. `max_retries` counts *extra* attempts after the first,
/// so the total attempt count is `max_retries + 1`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }

    /// Single extra attempt with a short delay, suited to email transport.
    pub fn single() -> Self {
        Self::new(1, Duration::from_secs(2))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(1))
    }
}

/// Run `operation` until it succeeds, the error is not retryable, or the
/// attempt budget is spent. Delay between attempts is
/// `initial_delay * 2^attempt` plus uniform jitter in `[0, initial_delay)`.
///
/// Returns the last error unchanged when giving up; classification of that
/// error (alerting, wrapping) is the caller's concern.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    op_name: &str,
    is_retryable: P,
    mut operation: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries && is_retryable(&e) => {
                let base = policy.initial_delay.as_secs_f64();
                let jitter = rand::rng().random_range(0.0..base.max(0.001));
                let delay = Duration::from_secs_f64(base * 2f64.powi(attempt as i32) + jitter);
                warn!(
                    op = op_name,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retryable failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use std::sync::Mutex;

    struct Script {
        results: Mutex<Vec<std::result::Result<String, GatewayError>>>,
        calls: Mutex<usize>,
    }

    impl Script {
        fn new(results: Vec<std::result::Result<String, GatewayError>>) -> Self {
            Self {
                results: Mutex::new(results),
                calls: Mutex::new(0),
            }
        }

        fn next(&self) -> std::result::Result<String, GatewayError> {
            *self.calls.lock().unwrap() += 1;
            self.results.lock().unwrap().remove(0)
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_then_succeeds() {
        let script = Script::new(vec![
            Err(GatewayError::RateLimited { retry_after_secs: 5 }),
            Err(GatewayError::Network("reset".into())),
            Ok("done".into()),
        ]);

        let result = retry_with_backoff(
            &RetryPolicy::default(),
            "test",
            GatewayError::is_retryable,
            || async { script.next() },
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        // 2 failures + 1 success
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test]
    async fn fatal_error_gets_single_attempt() {
        let script = Script::new(vec![Err(GatewayError::Auth("bad key".into()))]);

        let result = retry_with_backoff(
            &RetryPolicy::default(),
            "test",
            GatewayError::is_retryable,
            || async { script.next() },
        )
        .await;

        assert!(matches!(result.unwrap_err(), GatewayError::Auth(_)));
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_exhaustion_returns_last_error() {
        let script = Script::new(vec![
            Err(GatewayError::Timeout("30s".into())),
            Err(GatewayError::Timeout("30s".into())),
            Err(GatewayError::Network("refused".into())),
        ]);

        let result = retry_with_backoff(
            &RetryPolicy::default(),
            "test",
            GatewayError::is_retryable,
            || async { script.next() },
        )
        .await;

        assert!(matches!(result.unwrap_err(), GatewayError::Network(_)));
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test]
    async fn zero_retries_means_one_attempt() {
        let script = Script::new(vec![Err(GatewayError::Network("down".into()))]);

        let result = retry_with_backoff(
            &RetryPolicy::new(0, Duration::from_millis(1)),
            "test",
            GatewayError::is_retryable,
            || async { script.next() },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn immediate_success_skips_backoff() {
        let script = Script::new(vec![Ok("first".into())]);

        let result = retry_with_backoff(
            &RetryPolicy::default(),
            "test",
            GatewayError::is_retryable,
            || async { script.next() },
        )
        .await;

        assert_eq!(result.unwrap(), "first");
        assert_eq!(script.calls(), 1);
    }
}
