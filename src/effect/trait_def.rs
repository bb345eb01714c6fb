//! Effect trait definition - the fork contract every node implements.
//!
//! An effect is an immutable description. Nothing happens until a runtime
//! forks it with a concrete environment and a pair of callbacks:
//!
//! ```text
//! fork(env, reject, resolve, runtime) -> Cancel
//! ```
//!
//! Across one fork at most one of `reject`/`resolve` is invoked, and at most
//! once. If the returned [`Cancel`] fires while the fork is still pending,
//! neither is invoked. An effect value may be forked any number of times;
//! each fork is independent.

use std::rc::Rc;

use crate::cancel::Cancel;
use crate::cause::Cause;
use crate::runtime::Runtime;

/// Callback receiving the rejection of a fork.
pub type Reject<E> = Box<dyn FnOnce(Cause<E>)>;

/// Callback receiving the resolved value of a fork.
pub type Resolve<A> = Box<dyn FnOnce(A)>;

/// The core Effect trait.
///
/// # Type Parameters
///
/// * `Output` - The value produced on success
/// * `Error` - The declared error type
/// * `Env` - The environment the effect needs; cloned into every child fork
///
/// Implementors live on a single thread and may hold `Rc` state; nothing
/// here is `Send`.
///
/// # Example
///
/// ```rust
/// use undertow::prelude::*;
/// use undertow::testing::test_runtime;
///
/// fn double(n: i32) -> impl Effect<Output = i32, Error = String, Env = ()> {
///     of(n).map(|x| x * 2)
/// }
///
/// let (runtime, scheduler) = test_runtime();
/// let fiber = runtime.fork(&double(21), ());
/// scheduler.run();
/// assert_eq!(fiber.poll_outcome(), Some(Ok(42)));
/// ```
pub trait Effect: 'static {
    /// The success type produced by this effect.
    type Output: 'static;

    /// The declared error type.
    type Error: 'static;

    /// The environment type required to run this effect.
    type Env: Clone + 'static;

    /// Begin executing this effect.
    ///
    /// Must not invoke `reject` or `resolve` synchronously; leaves defer
    /// their work through the runtime's scheduler.
    fn fork(
        &self,
        env: Self::Env,
        reject: Reject<Self::Error>,
        resolve: Resolve<Self::Output>,
        runtime: &Runtime,
    ) -> Cancel;
}

impl<T> Effect for Rc<T>
where
    T: Effect + ?Sized,
{
    type Output = T::Output;
    type Error = T::Error;
    type Env = T::Env;

    fn fork(
        &self,
        env: Self::Env,
        reject: Reject<Self::Error>,
        resolve: Resolve<Self::Output>,
        runtime: &Runtime,
    ) -> Cancel {
        (**self).fork(env, reject, resolve, runtime)
    }
}
