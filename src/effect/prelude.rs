//! Everything needed to build and run effects, in one import.
//!
//! ```rust
//! use undertow::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let effect = of::<_, String, ()>(2).zip(of(3)).map(|(a, b)| a + b);
//! assert_eq!(default_runtime().run(&effect, ()).await, Ok(5));
//! # });
//! ```

pub use crate::effect::{
    access, access_m, access_p, bracket, encase, encase_p, environment, from_fn, lift, never, of,
    reject, timeout, BoxedEffect, Effect, EffectExt, Settle, Status,
};

pub use crate::cancel::Cancel;
pub use crate::cause::{Cause, Panic, RunError};
pub use crate::retry::{RetryExhausted, RetryPolicy, TimeoutError};
pub use crate::runtime::{default_runtime, Fiber, Runtime};
pub use crate::scheduler::Scheduler;
