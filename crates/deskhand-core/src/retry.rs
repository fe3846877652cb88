//! Bounded retry with exponential or fixed backoff.
//!
//! Used by the plan interpreter around language-model calls. The loop is
//! bounded by [`RetryPolicy::max_attempts`]; a predicate decides whether a
//! given error is worth another attempt.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// `initial_delay * base^(retry - 1)`, capped at `max_delay`.
    Exponential {
        /// Growth factor (typically 2.0).
        base: f64,
    },
    /// Always `initial_delay`, capped at `max_delay`.
    Fixed,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential { base: 2.0 }
    }
}

/// Retry bounds and pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay growth.
    pub backoff: Backoff,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        backoff: Backoff,
        initial_delay: Duration,
        max_delay: Duration,
    ) -> Self {
        Self {
            max_attempts,
            backoff,
            initial_delay,
            max_delay,
        }
    }

    /// A single attempt, no retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::Fixed,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to sleep before attempt number `attempt` (0-indexed).
    ///
    /// Attempt 0 has no delay.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let initial_ms = self.initial_delay.as_millis() as f64;
        let delay_ms = match self.backoff {
            Backoff::Fixed => initial_ms,
            Backoff::Exponential { base } => {
                let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
                initial_ms * base.max(1.0).powi(exponent)
            },
        };
        let capped = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    /// Whether another attempt is allowed after `attempts_made` attempts.
    #[must_use]
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

/// Result of a retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    /// An attempt succeeded.
    Success(T),
    /// The last attempt failed and no further attempt was allowed.
    Exhausted {
        /// The final error.
        error: E,
        /// Attempts made.
        attempts: u32,
    },
    /// The error was not retryable.
    Aborted {
        /// The error that stopped the loop.
        error: E,
        /// Attempts made.
        attempts: u32,
    },
}

impl<T, E> RetryOutcome<T, E> {
    /// Whether an attempt succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Attempts made before the loop ended, if it failed.
    #[must_use]
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Success(_) => None,
            Self::Exhausted { attempts, .. } | Self::Aborted { attempts, .. } => Some(*attempts),
        }
    }

    /// Convert to a `Result`, dropping the attempt count.
    #[allow(clippy::missing_errors_doc)]
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Exhausted { error, .. } | Self::Aborted { error, .. } => Err(error),
        }
    }
}

/// Run `operation` until it succeeds, the error is not retryable, or the
/// policy's attempt budget is spent.
///
/// `operation` receives the 0-indexed attempt number. Sleeps between
/// attempts with [`tokio::time::sleep`], so callers that need cancellation
/// should race the returned future against their token.
///
/// ```rust,no_run
/// use deskhand_core::retry::{RetryPolicy, retry};
///
/// # async fn example() {
/// let policy = RetryPolicy::default();
/// let outcome = retry(&policy, |_attempt| async { Ok::<_, String>(1) }, |_err| true).await;
/// assert!(outcome.is_success());
/// # }
/// ```
pub async fn retry<T, E, Fut, F, P>(
    policy: &RetryPolicy,
    mut operation: F,
    should_retry: P,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt: u32 = 0;
    loop {
        match operation(attempt).await {
            Ok(value) => return RetryOutcome::Success(value),
            Err(error) => {
                let attempts = attempt.saturating_add(1);
                if !should_retry(&error) {
                    return RetryOutcome::Aborted { error, attempts };
                }
                if !policy.should_retry(attempts) {
                    return RetryOutcome::Exhausted { error, attempts };
                }
                attempt = attempts;
                tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Backoff::Exponential { base: 2.0 },
            Duration::from_millis(1),
            Duration::from_millis(10),
        )
    }

    #[test]
    fn exponential_delays() {
        let policy = RetryPolicy::new(
            5,
            Backoff::Exponential { base: 2.0 },
            Duration::from_millis(100),
            Duration::from_secs(10),
        );
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn fixed_delays() {
        let policy = RetryPolicy::new(
            5,
            Backoff::Fixed,
            Duration::from_millis(250),
            Duration::from_secs(1),
        );
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(250));
    }

    #[test]
    fn delay_caps_at_max() {
        let policy = RetryPolicy::new(
            10,
            Backoff::Exponential { base: 2.0 },
            Duration::from_millis(100),
            Duration::from_millis(500),
        );
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_millis(500));
    }

    #[test]
    fn attempt_budget() {
        let policy = quick(3);
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));

        assert!(!RetryPolicy::no_retry().should_retry(1));
        assert!(!quick(0).should_retry(1));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let outcome = retry(
            &quick(5),
            |attempt| async move {
                if attempt < 2 {
                    Err("transient")
                } else {
                    Ok("recovered")
                }
            },
            |_| true,
        )
        .await;
        assert_eq!(outcome, RetryOutcome::Success("recovered"));
    }

    #[tokio::test]
    async fn exhausts_budget() {
        let outcome = retry(&quick(3), |_| async { Err::<(), _>("down") }, |_| true).await;
        assert_eq!(
            outcome,
            RetryOutcome::Exhausted {
                error: "down",
                attempts: 3
            }
        );
    }

    #[tokio::test]
    async fn stops_on_non_retryable() {
        let outcome = retry(&quick(5), |_| async { Err::<(), _>("auth") }, |e| *e != "auth").await;
        assert_eq!(
            outcome,
            RetryOutcome::Aborted {
                error: "auth",
                attempts: 1
            }
        );
        assert_eq!(outcome.into_result(), Err("auth"));
    }
}
