//! Backoff policies.

use std::time::Duration;

use thiserror::Error;

/// How long to wait between attempts, and how many attempts to make.
///
/// A policy is plain data. The [`retry`](crate::EffectExt::retry)
/// combinator asks it for the delay before each new attempt and stops when
/// it returns `None`.
///
/// Without `max_retries` a policy retries indefinitely; [`validate`]
/// rejects policies that carry neither a retry count nor a delay cap.
///
/// [`validate`]: RetryPolicy::validate
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use undertow::RetryPolicy;
///
/// let policy = RetryPolicy::exponential(Duration::from_millis(10))
///     .with_max_retries(3)
///     .with_max_delay(Duration::from_millis(25));
///
/// assert_eq!(policy.delay_for_attempt(0), Some(Duration::from_millis(10)));
/// assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(20)));
/// assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(25)));
/// assert_eq!(policy.delay_for_attempt(3), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryPolicy {
    strategy: RetryStrategy,
    max_retries: Option<u32>,
    max_delay: Option<Duration>,
    jitter: JitterStrategy,
}

/// Shape of the delay curve.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RetryStrategy {
    /// The same delay every time.
    Constant(Duration),
    /// `base * (attempt + 1)`.
    Linear {
        /// Step size.
        base: Duration,
    },
    /// `base * 2^attempt`.
    Exponential {
        /// First delay.
        base: Duration,
    },
    /// `base * fib(attempt + 1)`.
    Fibonacci {
        /// Unit multiplied by the sequence.
        base: Duration,
    },
}

/// Randomization applied on top of the computed delay.
///
/// Without the `jitter` feature every variant behaves like `None`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JitterStrategy {
    /// Use the computed delay unchanged.
    #[default]
    None,
    /// Spread the delay by `± factor` of itself.
    Proportional(f64),
    /// Anywhere between zero and the computed delay.
    Full,
    /// Between the computed delay and three times the previous delay.
    Decorrelated,
}

/// A policy that cannot be used as configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// Neither a retry count nor a delay cap was set.
    #[error("retry policy needs max_retries or max_delay")]
    Unbounded,
    /// A proportional jitter factor outside `0.0..=1.0`.
    #[error("jitter factor must be within 0.0..=1.0")]
    JitterOutOfRange,
}

impl RetryPolicy {
    fn with_strategy(strategy: RetryStrategy) -> Self {
        RetryPolicy {
            strategy,
            max_retries: None,
            max_delay: None,
            jitter: JitterStrategy::None,
        }
    }

    /// Wait `delay` before every retry.
    pub fn constant(delay: Duration) -> Self {
        Self::with_strategy(RetryStrategy::Constant(delay))
    }

    /// Wait `base`, `2 * base`, `3 * base`, ...
    pub fn linear(base: Duration) -> Self {
        Self::with_strategy(RetryStrategy::Linear { base })
    }

    /// Wait `base`, `2 * base`, `4 * base`, ...
    pub fn exponential(base: Duration) -> Self {
        Self::with_strategy(RetryStrategy::Exponential { base })
    }

    /// Wait `base`, `base`, `2 * base`, `3 * base`, `5 * base`, ...
    pub fn fibonacci(base: Duration) -> Self {
        Self::with_strategy(RetryStrategy::Fibonacci { base })
    }

    /// Retry at most `n` times after the first attempt.
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Never wait longer than `d` between attempts.
    pub fn with_max_delay(mut self, d: Duration) -> Self {
        self.max_delay = Some(d);
        self
    }

    /// Spread each delay by `± factor`.
    pub fn with_jitter(mut self, factor: f64) -> Self {
        let factor = if factor.is_finite() { factor } else { 0.0 };
        self.jitter = JitterStrategy::Proportional(factor);
        self
    }

    /// Pick each delay uniformly between zero and the computed delay.
    pub fn with_full_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Full;
        self
    }

    /// Derive each delay from the previous one.
    pub fn with_decorrelated_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Decorrelated;
        self
    }

    /// Retry budget, if bounded.
    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    /// Upper bound on a single delay.
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// The jitter applied to each delay.
    pub fn jitter(&self) -> &JitterStrategy {
        &self.jitter
    }

    /// The base delay sequence.
    pub fn strategy(&self) -> &RetryStrategy {
        &self.strategy
    }

    /// Delay before retry number `attempt` (zero-based), or `None` once
    /// the retry budget is spent.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if self.max_retries.is_some_and(|max| attempt >= max) {
            return None;
        }

        let delay = match &self.strategy {
            RetryStrategy::Constant(d) => *d,
            RetryStrategy::Linear { base } => base.saturating_mul(attempt.saturating_add(1)),
            RetryStrategy::Exponential { base } => {
                base.saturating_mul(2u32.saturating_pow(attempt))
            }
            RetryStrategy::Fibonacci { base } => {
                base.saturating_mul(fibonacci(attempt.saturating_add(1)))
            }
        };

        Some(self.cap(delay))
    }

    /// [`delay_for_attempt`](Self::delay_for_attempt) with the jitter
    /// strategy applied. `prev_delay` feeds decorrelated jitter.
    pub fn delay_with_jitter(&self, attempt: u32, prev_delay: Option<Duration>) -> Option<Duration> {
        let delay = self.delay_for_attempt(attempt)?;
        Some(self.cap(self.jitter.apply(delay, prev_delay)))
    }

    /// Check that the policy terminates and its jitter is well formed.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.max_retries.is_none() && self.max_delay.is_none() {
            return Err(PolicyError::Unbounded);
        }
        if let JitterStrategy::Proportional(factor) = self.jitter {
            if !(0.0..=1.0).contains(&factor) {
                return Err(PolicyError::JitterOutOfRange);
            }
        }
        Ok(())
    }

    fn cap(&self, delay: Duration) -> Duration {
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

impl JitterStrategy {
    /// Randomize `delay`.
    #[cfg(feature = "jitter")]
    pub fn apply(&self, delay: Duration, prev_delay: Option<Duration>) -> Duration {
        use rand::Rng;

        let mut rng = rand::rng();
        let millis = delay.as_millis() as u64;
        match self {
            JitterStrategy::None => delay,
            JitterStrategy::Proportional(factor) => {
                let factor = if factor.is_finite() {
                    factor.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let spread = millis as f64 * factor;
                let low = (millis as f64 - spread).max(0.0);
                let high = millis as f64 + spread;
                Duration::from_millis(rng.random_range(low..=high) as u64)
            }
            JitterStrategy::Full => Duration::from_millis(rng.random_range(0..=millis)),
            JitterStrategy::Decorrelated => {
                let ceiling = prev_delay
                    .unwrap_or(delay)
                    .as_millis()
                    .saturating_mul(3) as u64;
                if ceiling <= millis {
                    delay
                } else {
                    Duration::from_millis(rng.random_range(millis..=ceiling))
                }
            }
        }
    }

    /// Randomize `delay`. Without the `jitter` feature this is the
    /// identity.
    #[cfg(not(feature = "jitter"))]
    pub fn apply(&self, delay: Duration, _prev_delay: Option<Duration>) -> Duration {
        delay
    }
}

fn fibonacci(n: u32) -> u32 {
    let (mut a, mut b) = (0u32, 1u32);
    for _ in 0..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    a
}
