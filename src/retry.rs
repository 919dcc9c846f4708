//! Time-bounded retry for transient remote conflicts.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

/// Total time a retried operation may spend before giving up.
pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_secs(30);

/// First wait after a retryable failure.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(500);

/// Upper bound for a single wait.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// How one attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<E> {
    /// Transient failure; try again if the budget allows.
    Retry(E),
    /// Permanent failure; stop now.
    Abort(E),
}

/// A retry budget with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total time budget measured from the first attempt.
    pub timeout: Duration,
    /// Delay before the first retry. Doubles after every retry.
    pub min_delay: Duration,
    /// Cap on a single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// A policy with the given budget and the default backoff.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// The delay before retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.min(16));
        self.min_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `op` until it succeeds, aborts, or the budget is spent. The last
    /// wait is shortened to end on the deadline so one final attempt lands
    /// there. On exhaustion the last transient error is returned.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Attempt<E>>>,
    {
        let started = Instant::now();
        let mut retry = 0u32;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(Attempt::Abort(err)) => return Err(err),
                Err(Attempt::Retry(err)) => {
                    let remaining = self.timeout.saturating_sub(started.elapsed());
                    if remaining.is_zero() {
                        warn!(
                            attempts = retry + 1,
                            timeout_secs = self.timeout.as_secs(),
                            "Retry budget exhausted"
                        );
                        return Err(err);
                    }

                    let delay = self.delay(retry).min(remaining);
                    debug!(
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                },
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_RETRY_TIMEOUT,
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_millis(500));
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(5), Duration::from_secs(10));
        assert_eq!(policy.delay(100), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let attempts = &AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result: Result<&str, &str> = policy
            .run(move || async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 3 {
                    Err(Attempt::Retry("busy"))
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_is_not_retried() {
        let attempts = &AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result: Result<(), &str> = policy
            .run(move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Attempt::Abort("denied"))
            })
            .await;

        assert_eq!(result, Err("denied"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_timeout() {
        let attempts = &AtomicU32::new(0);
        let policy = RetryPolicy::default();
        let started = Instant::now();

        let result: Result<(), u32> = policy
            .run(move || async move {
                Err(Attempt::Retry(attempts.fetch_add(1, Ordering::SeqCst)))
            })
            .await;

        // 0.5 + 1 + 2 + 4 + 8 + 10 = 25.5s, then a 4.5s wait up to the deadline.
        assert_eq!(result, Err(7));
        assert_eq!(attempts.load(Ordering::SeqCst), 8);
        assert_eq!(started.elapsed(), DEFAULT_RETRY_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_attempt_uses_remaining_budget() {
        let attempts = &AtomicU32::new(0);
        let policy = RetryPolicy::default();
        let started = Instant::now();

        // Only the attempt made on the deadline succeeds.
        let result: Result<u32, ()> = policy
            .run(move || async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 7 {
                    Err(Attempt::Retry(()))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(started.elapsed(), DEFAULT_RETRY_TIMEOUT);
    }
}
