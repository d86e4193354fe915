//! The retry governor: error classification, exponential backoff, exhaustion.
//!
//! Holds no locks and carries no cross-call state; each `run` call is an
//! independent attempt loop over whatever invocation the caller passes in.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::{ClientError, RetryExhaustedError};

const RETRYABLE_SUBSTRINGS: &[&str] = &[
    "header not found",
    "timeout",
    "connection reset",
    "temporary unavailable",
    "try again",
    "underpriced",
    "nonce too low",
    "rate limit",
    "too many requests",
    "429",
    "internal error",
    "-32603",
    "server busy",
    "overloaded",
];

/// Configuration for the retry governor's backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Base delay for the second attempt (N=2); doubles each subsequent attempt.
    pub base: Duration,
    /// Upper bound on any single delay, before jitter is applied.
    pub max_delay: Duration,
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { base: Duration::from_millis(200), max_delay: Duration::from_secs(5), max_attempts: 3 }
    }
}

/// Whether a failure should be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryable {
    /// The governor should sleep and attempt again.
    Yes,
    /// The governor should surface this failure immediately.
    No,
}

/// Classifies a [`ClientError`] as retryable or not, per the exact message
/// and error-shape rules this SDK's retry policy is built around.
#[must_use]
pub fn classify(err: &ClientError) -> Retryable {
    match err {
        ClientError::Revert(_) => Retryable::No,
        ClientError::Io(_) => Retryable::Yes,
        ClientError::Rpc(rpc) => {
            if let Some(data) = &rpc.data {
                if ClientError::rpc_data_looks_like_revert(data) {
                    return Retryable::No;
                }
            }
            let lower = rpc.message.to_lowercase();
            if lower.contains("insufficient funds") {
                return Retryable::No;
            }
            if RETRYABLE_SUBSTRINGS.iter().any(|needle| lower.contains(needle)) {
                Retryable::Yes
            } else {
                Retryable::No
            }
        }
        _ => Retryable::No,
    }
}

fn jitter_factor() -> f64 {
    1.0 + rand::random_range(0.10..=0.25)
}

fn backoff_delay(attempt: u32, config: &RetryConfig) -> Duration {
    debug_assert!(attempt >= 2, "backoff is only defined for attempt N >= 2");
    let exponent = attempt - 2;
    let scaled = config.base.saturating_mul(1u32.checked_shl(exponent).unwrap_or(u32::MAX));
    let capped = scaled.min(config.max_delay);
    capped.mul_f64(jitter_factor())
}

/// Wraps an RPC invocation with classification-driven exponential backoff.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryGovernor {
    config: RetryConfig,
}

impl RetryGovernor {
    /// Builds a governor with the given backoff schedule.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Runs `attempt`, retrying on classification [`Retryable::Yes`] up to
    /// `max_attempts` times, sleeping between attempts per the configured
    /// backoff schedule. On exhaustion, returns
    /// [`ClientError::RetryExhausted`] aggregating every prior failure.
    ///
    /// Dropping the returned future mid-sleep (task cancellation) simply
    /// abandons the loop, mirroring thread-interruption semantics: the last
    /// observed error is never synthesized into success.
    pub async fn run<F, Fut, T>(&self, mut attempt: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let started = Instant::now();
        let mut causes = Vec::new();
        for n in 1..=self.config.max_attempts {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let retryable = classify(&err);
                    causes.push(err.to_string());
                    if retryable == Retryable::No || n == self.config.max_attempts {
                        if retryable == Retryable::No {
                            return Err(err);
                        }
                        return Err(ClientError::RetryExhausted(RetryExhaustedError {
                            attempts: n,
                            elapsed: started.elapsed(),
                            causes,
                        }));
                    }
                    #[cfg(feature = "telemetry")]
                    tracing::debug!(attempt = n, error = %err, "retrying rpc invocation");
                    tokio::time::sleep(backoff_delay(n + 1, &self.config)).await;
                }
            }
        }
        unreachable!("loop always returns by the final attempt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn rpc(message: &str) -> ClientError {
        ClientError::Rpc(RpcError { code: -32000, message: message.to_owned(), data: None, request_id: None })
    }

    #[test]
    fn classifies_timeout_as_retryable() {
        assert_eq!(classify(&rpc("Timeout waiting for response")), Retryable::Yes);
    }

    #[test]
    fn classifies_insufficient_funds_as_non_retryable() {
        assert_eq!(classify(&rpc("insufficient funds for gas * price + value")), Retryable::No);
    }

    #[test]
    fn classifies_unknown_message_as_non_retryable() {
        assert_eq!(classify(&rpc("execution reverted")), Retryable::No);
    }

    #[test]
    fn backoff_is_monotonic_and_capped() {
        let config = RetryConfig { base: Duration::from_millis(200), max_delay: Duration::from_secs(5), max_attempts: 5 };
        let d2 = backoff_delay(2, &config);
        let d3 = backoff_delay(3, &config);
        assert!(d2.as_millis() >= 200 && d2.as_millis() <= 250);
        assert!(d3 > d2);
        let d_big = backoff_delay(10, &config);
        assert!(d_big.as_secs_f64() <= 5.0 * 1.25);
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts_with_all_causes() {
        let governor = RetryGovernor::new(RetryConfig {
            base: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            max_attempts: 3,
        });
        let calls = AtomicU32::new(0);
        let result: Result<(), ClientError> = governor
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(rpc("rate limit exceeded")) }
            })
            .await;
        match result {
            Err(ClientError::RetryExhausted(e)) => assert_eq!(e.attempts, 3),
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_surfaces_immediately() {
        let governor = RetryGovernor::default();
        let calls = AtomicU32::new(0);
        let result: Result<(), ClientError> = governor
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(rpc("insufficient funds")) }
            })
            .await;
        assert!(matches!(result, Err(ClientError::Rpc(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
