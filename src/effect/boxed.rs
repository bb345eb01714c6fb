//! Type-erased effects.

use std::rc::Rc;

use crate::cancel::Cancel;
use crate::effect::trait_def::{Effect, Reject, Resolve};
use crate::runtime::Runtime;

/// An effect behind `Rc<dyn Effect>`.
///
/// Needed for recursive effects, collections of effects and branches
/// returning different node types. Cloning shares the same node.
///
/// # Example
///
/// ```rust
/// use undertow::prelude::*;
/// use undertow::testing::test_runtime;
///
/// fn countdown(n: u32) -> BoxedEffect<u32, String, ()> {
///     if n == 0 {
///         of(0).boxed()
///     } else {
///         of(n).chain(move |x| countdown(x - 1).map(move |sum| sum + x)).boxed()
///     }
/// }
///
/// let (runtime, scheduler) = test_runtime();
/// let fiber = runtime.fork(&countdown(4), ());
/// scheduler.run();
/// assert_eq!(fiber.poll_outcome(), Some(Ok(10)));
/// ```
pub struct BoxedEffect<A, E, R> {
    inner: Rc<dyn Effect<Output = A, Error = E, Env = R>>,
}

impl<A, E, R> Clone for BoxedEffect<A, E, R> {
    fn clone(&self) -> Self {
        BoxedEffect {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A, E, R> std::fmt::Debug for BoxedEffect<A, E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedEffect").finish_non_exhaustive()
    }
}

impl<A: 'static, E: 'static, R: Clone + 'static> BoxedEffect<A, E, R> {
    /// Box `effect`.
    pub fn new<Eff>(effect: Eff) -> Self
    where
        Eff: Effect<Output = A, Error = E, Env = R>,
    {
        BoxedEffect {
            inner: Rc::new(effect),
        }
    }
}

impl<A: 'static, E: 'static, R: Clone + 'static> Effect for BoxedEffect<A, E, R> {
    type Output = A;
    type Error = E;
    type Env = R;

    fn fork(&self, env: R, reject: Reject<E>, resolve: Resolve<A>, runtime: &Runtime) -> Cancel {
        self.inner.fork(env, reject, resolve, runtime)
    }
}
