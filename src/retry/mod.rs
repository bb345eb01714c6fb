//! Retry policies and the errors of the resilience combinators.
//!
//! A [`RetryPolicy`] is data: a delay curve plus optional bounds and
//! jitter. [`EffectExt::retry`](crate::EffectExt::retry) consults it after
//! every typed rejection and waits on the scheduler, so retries are driven
//! by virtual time under [`TestScheduler`](crate::TestScheduler).
//!
//! # Strategies
//!
//! - **Constant**: the same delay every time
//! - **Linear**: 100ms, 200ms, 300ms, ...
//! - **Exponential**: 100ms, 200ms, 400ms, ...
//! - **Fibonacci**: 100ms, 100ms, 200ms, 300ms, 500ms, ...
//!
//! # Jitter
//!
//! Randomized delays need the `jitter` feature:
//!
//! ```toml
//! undertow = { version = "0.1", features = ["jitter"] }
//! ```
//!
//! ```rust
//! use std::time::Duration;
//! use undertow::RetryPolicy;
//!
//! let policy = RetryPolicy::exponential(Duration::from_millis(100))
//!     .with_jitter(0.25)
//!     .with_max_retries(5);
//! ```

mod error;
mod policy;

pub use error::{RetryExhausted, TimeoutError};
pub use policy::{JitterStrategy, PolicyError, RetryPolicy, RetryStrategy};

#[cfg(test)]
mod tests;
