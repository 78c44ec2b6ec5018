//! Exponential backoff around fallible service calls
//!
//! Only rate-limit and transient upstream failures are retried. Everything
//! else propagates on the first attempt.

use atelier_core::Result;
use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_INITIAL_DELAY_MS: u64 = 4000;
const DEFAULT_MAX_JITTER_MS: u64 = 1000;

/// Something that can block the current thread for a while.
///
/// Injected so pacing and backoff can be observed in tests without waiting.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps for real
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested sleeps and returns immediately
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    calls: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every duration requested so far, in order
    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(duration);
        }
    }
}

/// How many times to try and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    /// Upper bound of the uniform random jitter added to each wait
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_jitter: Duration::from_millis(DEFAULT_MAX_JITTER_MS),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `retry` (0-based): `initial * 2^retry + jitter`
    fn delay_for(&self, retry: u32) -> Duration {
        let base = self
            .initial_delay
            .saturating_mul(1u32.checked_shl(retry).unwrap_or(u32::MAX));
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        base.saturating_add(Duration::from_millis(jitter))
    }
}

/// Run `operation`, retrying retryable failures with exponential backoff.
///
/// Each call gets its own attempt counter. After `max_attempts` the last
/// error is returned.
pub fn with_retry<T, F>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    label: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt - 1);
                tracing::warn!(
                    operation = label,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after retryable failure"
                );
                sleeper.sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::{AtelierError, ServiceErrorKind};

    fn no_jitter() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(4000),
            max_jitter: Duration::ZERO,
        }
    }

    #[test]
    fn test_success_first_try_does_not_sleep() {
        let sleeper = RecordingSleeper::new();
        let value = with_retry(&no_jitter(), &sleeper, "test", || Ok(7)).unwrap();
        assert_eq!(value, 7);
        assert!(sleeper.calls().is_empty());
    }

    #[test]
    fn test_retries_rate_limit_with_doubling_delay() {
        let sleeper = RecordingSleeper::new();
        let mut calls = 0;
        let value = with_retry(&no_jitter(), &sleeper, "test", || {
            calls += 1;
            if calls < 3 {
                Err(AtelierError::service(ServiceErrorKind::RateLimited, "429"))
            } else {
                Ok("done")
            }
        })
        .unwrap();

        assert_eq!(value, "done");
        assert_eq!(calls, 3);
        assert_eq!(
            sleeper.calls(),
            vec![Duration::from_millis(4000), Duration::from_millis(8000)]
        );
    }

    #[test]
    fn test_gives_up_after_max_attempts_with_last_error() {
        let sleeper = RecordingSleeper::new();
        let mut calls = 0;
        let err = with_retry(&no_jitter(), &sleeper, "test", || -> Result<()> {
            calls += 1;
            Err(AtelierError::service(
                ServiceErrorKind::TransientUpstream,
                format!("503 attempt {}", calls),
            ))
        })
        .unwrap_err();

        assert_eq!(calls, 5);
        assert_eq!(sleeper.calls().len(), 4);
        assert_eq!(sleeper.calls()[3], Duration::from_millis(32000));
        assert!(err.to_string().contains("attempt 5"));
    }

    #[test]
    fn test_non_retryable_propagates_immediately() {
        let sleeper = RecordingSleeper::new();
        let mut calls = 0;
        let err = with_retry(&no_jitter(), &sleeper, "test", || -> Result<()> {
            calls += 1;
            Err(AtelierError::NoOutputProduced("no image".to_string()))
        })
        .unwrap_err();

        assert_eq!(calls, 1);
        assert!(sleeper.calls().is_empty());
        assert!(matches!(err, AtelierError::NoOutputProduced(_)));

        let mut calls = 0;
        let err = with_retry(&no_jitter(), &sleeper, "test", || -> Result<()> {
            calls += 1;
            Err(AtelierError::service(
                ServiceErrorKind::AuthenticationInvalid,
                "bad key",
            ))
        })
        .unwrap_err();
        assert_eq!(calls, 1);
        assert!(err.is_authentication());
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let policy = RetryPolicy {
            max_attempts: 2,
            initial_delay: Duration::from_millis(100),
            max_jitter: Duration::from_millis(1000),
        };
        for _ in 0..50 {
            let d = policy.delay_for(0);
            assert!(d >= Duration::from_millis(100));
            assert!(d <= Duration::from_millis(1100));
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay, Duration::from_millis(4000));
        assert_eq!(policy.max_jitter, Duration::from_millis(1000));
    }
}
