//! Bounded exponential-backoff retry around a single remote call.
//!
//! A [`RetryPolicy`] is a plain value handed to whoever issues the call. The
//! caller also supplies the classifier that decides which failures are worth
//! another attempt; everything else propagates on the first occurrence.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use thiserror::Error;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Retry schedule: `base_delay * 2^(n-1)` before retry `n`, at most `max_retries` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Retries allowed after the first attempt.
    pub max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Outcome of a call that did not succeed under a [`RetryPolicy`].
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a transient error.
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: E,
    },

    /// A non-retryable failure, returned as soon as it occurred.
    #[error(transparent)]
    Fatal(E),
}

impl RetryPolicy {
    #[must_use]
    pub fn new(base_delay: Duration, max_retries: usize) -> Self {
        Self {
            base_delay,
            max_retries,
        }
    }

    /// A policy that never waits and never retries.
    #[must_use]
    pub fn none() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    /// Delay before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Build the backoff schedule for this policy.
    ///
    /// No jitter: the schedule is exactly `base, 2*base, 4*base, ...`.
    #[must_use]
    pub fn backoff(&self) -> ExponentialBuilder {
        let ceiling = self
            .delay_for(u32::try_from(self.max_retries).unwrap_or(u32::MAX))
            .max(self.base_delay);
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(ceiling)
            .with_factor(2.0)
            .with_max_times(self.max_retries)
    }

    /// Run `operation`, retrying while `is_transient` accepts the error.
    ///
    /// `label` names the call in log output.
    ///
    /// # Errors
    /// [`RetryError::Fatal`] for a non-transient error, [`RetryError::Exhausted`]
    /// when the last permitted attempt still failed transiently.
    pub async fn run<T, E, F, Fut, C>(
        &self,
        label: &str,
        mut operation: F,
        is_transient: C,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        C: Fn(&E) -> bool,
    {
        let attempt = AtomicU32::new(0);

        let attempt_op = || {
            attempt.fetch_add(1, Ordering::SeqCst);
            operation()
        };

        let result = attempt_op
            .retry(self.backoff())
            .when(|e| is_transient(e))
            .notify(|err, dur| {
                tracing::warn!(
                    call = label,
                    attempt = attempt.load(Ordering::SeqCst),
                    max_retries = self.max_retries,
                    delay_ms = dur.as_millis() as u64,
                    error = %err,
                    "Transient failure, retrying"
                );
            })
            .await;

        result.map_err(|err| {
            let attempts = attempt.load(Ordering::SeqCst);
            if is_transient(&err) {
                tracing::error!(call = label, attempts, error = %err, "Retries exhausted");
                RetryError::Exhausted {
                    attempts,
                    source: err,
                }
            } else {
                RetryError::Fatal(err)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    struct TestError {
        message: &'static str,
        transient: bool,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    impl std::error::Error for TestError {}

    fn transient() -> TestError {
        TestError {
            message: "connection reset",
            transient: true,
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay, Duration::from_secs(2));
        assert_eq!(policy.max_retries, 3);
    }

    #[test]
    fn test_delay_doubles_per_retry() {
        let policy = RetryPolicy::new(Duration::from_secs(2), 3);
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn test_delay_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::new(Duration::from_secs(u64::MAX / 2), 3);
        assert_eq!(policy.delay_for(40), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn run_recovers_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);
        let policy = RetryPolicy::new(Duration::from_secs(2), 3);

        let started = tokio::time::Instant::now();
        let result = policy
            .run(
                "search",
                move || {
                    let calls_capture = Arc::clone(&calls_capture);
                    async move {
                        if calls_capture.fetch_add(1, Ordering::SeqCst) < 2 {
                            Err(transient())
                        } else {
                            Ok(7u32)
                        }
                    }
                },
                |e: &TestError| e.transient,
            )
            .await;

        assert_eq!(result.expect("third attempt succeeds"), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 2s + 4s of backoff.
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(6), "waited {waited:?}");
        assert!(waited < Duration::from_secs(7), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn run_exhausts_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);
        let policy = RetryPolicy::new(Duration::from_secs(2), 3);

        let started = tokio::time::Instant::now();
        let err = policy
            .run(
                "search",
                move || {
                    let calls_capture = Arc::clone(&calls_capture);
                    async move {
                        calls_capture.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>(transient())
                    }
                },
                |e: &TestError| e.transient,
            )
            .await
            .expect_err("always failing");

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match err {
            RetryError::Exhausted { attempts, source } => {
                assert_eq!(attempts, 4);
                assert_eq!(source.message, "connection reset");
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        // 2s + 4s + 8s of backoff.
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(14), "waited {waited:?}");
        assert!(waited < Duration::from_secs(15), "waited {waited:?}");
    }

    #[tokio::test]
    async fn run_does_not_retry_fatal_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let err = RetryPolicy::default()
            .run(
                "search",
                move || {
                    let calls_capture = Arc::clone(&calls_capture);
                    async move {
                        calls_capture.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>(TestError {
                            message: "bad credentials",
                            transient: false,
                        })
                    }
                },
                |e: &TestError| e.transient,
            )
            .await
            .expect_err("expected error");

        assert!(matches!(err, RetryError::Fatal(_)));
        assert_eq!(err.to_string(), "bad credentials");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_retry_policy_makes_a_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let err = RetryPolicy::none()
            .run(
                "search",
                move || {
                    let calls_capture = Arc::clone(&calls_capture);
                    async move {
                        calls_capture.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>(transient())
                    }
                },
                |e: &TestError| e.transient,
            )
            .await
            .expect_err("expected error");

        assert!(matches!(err, RetryError::Exhausted { attempts: 1, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
