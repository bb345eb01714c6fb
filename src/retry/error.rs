//! Errors produced by retry and timeout combinators.

use std::time::Duration;

use thiserror::Error;

/// Every attempt allowed by the policy rejected.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use undertow::prelude::*;
/// use undertow::testing::test_runtime;
///
/// let policy = RetryPolicy::constant(Duration::from_millis(5)).with_max_retries(2);
/// let effect = reject::<(), _, ()>("down").retry(policy);
///
/// let (runtime, scheduler) = test_runtime();
/// let fiber = runtime.fork(&effect, ());
/// scheduler.run_to_end();
///
/// let exhausted = fiber.poll_outcome().unwrap().unwrap_err().rejection().unwrap();
/// assert_eq!(exhausted.final_error, "down");
/// assert_eq!(exhausted.attempts, 3);
/// assert_eq!(exhausted.total_duration, Duration::from_millis(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("gave up after {attempts} attempts over {total_duration:?}: {final_error:?}")]
pub struct RetryExhausted<E> {
    /// Rejection of the last attempt.
    pub final_error: E,
    /// Attempts made, the first one included.
    pub attempts: u32,
    /// Scheduler time between the first fork and the last rejection.
    pub total_duration: Duration,
}

impl<E> RetryExhausted<E> {
    /// Wrap the last rejection with attempt bookkeeping.
    pub fn new(final_error: E, attempts: u32, total_duration: Duration) -> Self {
        RetryExhausted {
            final_error,
            attempts,
            total_duration,
        }
    }

    /// Drop the metadata and keep the last error.
    pub fn into_error(self) -> E {
        self.final_error
    }
}

/// Rejection of an effect guarded by
/// [`with_timeout`](crate::EffectExt::with_timeout).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeoutError<E> {
    /// The deadline passed first.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The effect rejected before the deadline.
    #[error("{0:?}")]
    Inner(E),
}

impl<E> TimeoutError<E> {
    /// Returns true if the deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TimeoutError::Timeout(_))
    }

    /// The wrapped rejection, if the effect rejected on its own.
    pub fn into_inner(self) -> Option<E> {
        match self {
            TimeoutError::Inner(e) => Some(e),
            TimeoutError::Timeout(_) => None,
        }
    }
}
