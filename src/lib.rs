//! # Undertow
//!
//! Lazy, cancellable, environment-aware effects on a single-threaded
//! cooperative scheduler.
//!
//! An effect is a value describing an asynchronous computation. It needs an
//! environment of type `Env`, it may reject with a typed `Error`, and it
//! resolves with an `Output`. Building an effect does nothing. Forking it on
//! a [`Runtime`] starts the work and returns a [`Cancel`] handle, and
//! forking it again starts the work again.
//!
//! ## Quick Example
//!
//! ```rust
//! use std::time::Duration;
//! use undertow::prelude::*;
//!
//! #[derive(Clone)]
//! struct Config {
//!     greeting: String,
//! }
//!
//! let greet = access::<Config, _, String, _>(|c: Config| c.greeting)
//!     .zip(of("world"))
//!     .map(|(greeting, name)| format!("{greeting}, {name}!"))
//!     .delay(Duration::from_millis(5));
//!
//! # tokio_test::block_on(async {
//! let config = Config { greeting: "hello".into() };
//! let out = default_runtime().run(&greet, config).await;
//! assert_eq!(out, Ok("hello, world!".to_string()));
//! # });
//! ```
//!
//! ## Deterministic tests
//!
//! Time is owned by the scheduler. A [`TestScheduler`] only moves its clock
//! when told to, so timer-driven code can be tested without sleeping:
//!
//! ```rust
//! use std::time::Duration;
//! use undertow::prelude::*;
//! use undertow::testing::test_runtime;
//!
//! let effect = of::<_, String, ()>(1)
//!     .delay(Duration::from_secs(60))
//!     .race(timeout(2, Duration::from_secs(30)));
//!
//! let (runtime, scheduler) = test_runtime();
//! let fiber = runtime.fork(&effect, ());
//! scheduler.advance_by(Duration::from_secs(30));
//! assert_eq!(fiber.poll_outcome(), Some(Ok(2)));
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod cancel;
mod cause;
pub mod effect;
mod fmap;
mod reference;
pub mod retry;
pub mod runtime;
pub mod scheduler;
pub mod testing;

pub use cancel::{Cancel, IntoCancel};
pub use cause::{Cause, Panic, RunError};
pub use effect::{
    access, access_m, access_p, bracket, encase, encase_p, environment, from_fn, lift, never, of,
    reject, timeout, BoxedEffect, Effect, EffectExt, Reject, Resolve, Settle, Status,
};
pub use fmap::{FMap, MapError};
pub use reference::Ref;
pub use retry::{RetryExhausted, RetryPolicy, TimeoutError};
pub use runtime::{default_runtime, Fiber, Runtime, RuntimeBuilder, RuntimeConfig};
pub use scheduler::{DefaultScheduler, Scheduler, TestScheduler};

pub use effect::prelude;
