//! Exponential-backoff retry helper.

use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
        }
    }
}

/// Retry `f` up to `policy.max_retries` additional times after its first
/// attempt, sleeping `initial_delay * backoff_factor^n` between attempts.
/// Re-surfaces the last failure if every attempt fails.
pub fn retry_with_backoff<T, E, F>(policy: &RetryPolicy, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    let mut delay = policy.initial_delay;
    let mut attempt = 0u32;

    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempt >= policy.max_retries {
                    log::error!("all {} attempts failed: {e}", policy.max_retries + 1);
                    return Err(e);
                }
                log::warn!(
                    "attempt {} failed: {e}. retrying in {:.1}s...",
                    attempt + 1,
                    delay.as_secs_f64()
                );
                thread::sleep(delay);
                delay = delay.mul_f64(policy.backoff_factor);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
        }
    }

    #[test]
    fn succeeds_immediately_without_retry() {
        let calls = Cell::new(0);
        let result: Result<i32, &str> = retry_with_backoff(&fast_policy(3), || {
            calls.set(calls.get() + 1);
            Ok(42)
        });
        assert_eq!(result, Ok(42));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let result: Result<i32, &str> = retry_with_backoff(&fast_policy(3), || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err("transient")
            } else {
                Ok(7)
            }
        });
        assert_eq!(result, Ok(7));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn re_surfaces_last_failure_after_exhausting_retries() {
        let calls = Cell::new(0);
        let result: Result<i32, &str> = retry_with_backoff(&fast_policy(2), || {
            calls.set(calls.get() + 1);
            Err("persistent")
        });
        assert_eq!(result, Err("persistent"));
        assert_eq!(calls.get(), 3);
    }
}
