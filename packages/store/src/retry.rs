//! Retrying conflicted writes from the caller's side.
//!
//! [`VarStore`](crate::VarStore) never retries on its own. Callers that
//! would rather wait than surface a
//! [`StoreError::ConcurrentModification`] wrap their update in
//! [`retry_on_conflict`].

use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::StoreError;

/// Exponential backoff with full jitter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Backoff ceiling before the first retry; doubles on each later one.
    pub base_delay: Duration,
    /// Upper bound on any single backoff.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Retry immediately, up to `max_attempts` in total.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Backoff ceiling for the given retry (0-based).
    fn ceiling(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    fn backoff(&self, retry: u32) -> Duration {
        let ceiling = self.ceiling(retry);
        if ceiling.is_zero() {
            return ceiling;
        }
        rand::thread_rng().gen_range(Duration::ZERO..=ceiling)
    }
}

/// Run `op` until it succeeds, fails with something other than a conflict,
/// or the policy runs out of attempts. The last error is returned.
pub fn retry_on_conflict<T, F>(policy: &RetryPolicy, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Result<T, StoreError>,
{
    let attempts = policy.max_attempts.max(1);
    let mut retry = 0;
    loop {
        match op() {
            Err(err) if err.is_conflict() && retry + 1 < attempts => {
                let delay = policy.backoff(retry);
                log::warn!(
                    "{} (attempt {}/{}), backing off {:?}",
                    err,
                    retry + 1,
                    attempts,
                    delay
                );
                thread::sleep(delay);
                retry += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn conflict() -> StoreError {
        StoreError::ConcurrentModification {
            path: PathBuf::from("vars"),
        }
    }

    #[test]
    fn succeeds_after_conflicts() {
        let mut calls = 0;
        let result = retry_on_conflict(&RetryPolicy::immediate(5), || {
            calls += 1;
            if calls < 3 {
                Err(conflict())
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: Result<(), _> = retry_on_conflict(&RetryPolicy::immediate(3), || {
            calls += 1;
            Err(conflict())
        });
        assert!(result.unwrap_err().is_conflict());
        assert_eq!(calls, 3);
    }

    #[test]
    fn other_errors_are_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = retry_on_conflict(&RetryPolicy::immediate(5), || {
            calls += 1;
            Err(StoreError::NoCacheDir)
        });
        assert!(matches!(result, Err(StoreError::NoCacheDir)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let mut calls = 0;
        let _ = retry_on_conflict(&RetryPolicy::immediate(0), || {
            calls += 1;
            Err::<(), _>(conflict())
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
        };
        assert_eq!(policy.ceiling(0), Duration::from_millis(10));
        assert_eq!(policy.ceiling(1), Duration::from_millis(20));
        assert_eq!(policy.ceiling(3), Duration::from_millis(50));
        assert_eq!(policy.ceiling(40), Duration::from_millis(50));
        for retry in 0..8 {
            assert!(policy.backoff(retry) <= Duration::from_millis(50));
        }
    }
}
