//! Bounded retry with exponential backoff for idempotent reads.
//!
//! Only reads go through here. Mutating calls are never retried because a
//! lost response may still have created a job on the remote side.

use crate::error::{Error, Result};
use std::thread;
use std::time::Duration;

/// Retry behaviour for idempotent calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_factor: f64,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Create a retry config with custom settings.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

/// Execute an operation, retrying retryable errors with backoff.
///
/// Non-retryable errors (not found, auth, conflicts) are returned at once.
pub fn with_retry<T, F>(config: &RetryConfig, what: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let attempts = config.max_attempts.max(1);
    let mut last_error: Option<Error> = None;

    for attempt in 0..attempts {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() || attempt + 1 >= attempts {
                    return Err(e);
                }

                let delay = config.delay_for_attempt(attempt);
                log::debug!(
                    "{what}: attempt {}/{attempts} failed: {e}; retrying in {:?}",
                    attempt + 1,
                    delay
                );
                thread::sleep(delay);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::Other(format!("{what}: retry exhausted"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_with_retry_success_first_try() {
        let result = with_retry(&RetryConfig::no_retry(), "get", || Ok::<_, Error>(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_with_retry_not_found_is_not_retried() {
        let attempts = Cell::new(0);
        let result: Result<()> = with_retry(&fast(5), "get", || {
            attempts.set(attempts.get() + 1);
            Err(Error::NotFound("env".to_string()))
        });

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_with_retry_eventual_success() {
        let attempts = Cell::new(0);
        let result = with_retry(&fast(3), "get", || {
            let current = attempts.get();
            attempts.set(current + 1);
            if current < 2 {
                Err(Error::http("connection reset", None))
            } else {
                Ok("ok")
            }
        });

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_with_retry_is_bounded() {
        let attempts = Cell::new(0);
        let result: Result<()> = with_retry(&fast(3), "get", || {
            attempts.set(attempts.get() + 1);
            Err(Error::http("bad gateway", Some(502)))
        });

        assert!(result.is_err());
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_delay_is_capped() {
        let config = RetryConfig {
            max_delay: Duration::from_secs(5),
            ..RetryConfig::new(5, Duration::from_secs(2), 2.0)
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(5));
    }
}
