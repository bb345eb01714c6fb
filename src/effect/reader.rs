//! Environment nodes: `Ask`, `Provide` and `Local`.
//!
//! Environments flow downward. Every fork receives one, passes it to its
//! children, and only these nodes read or replace it.

use std::marker::PhantomData;
use std::rc::Rc;

use crate::cancel::Cancel;
use crate::effect::leaf::dispatch;
use crate::effect::trait_def::{Effect, Reject, Resolve};
use crate::runtime::Runtime;

/// Resolves with a clone of the environment.
pub struct Ask<R, E> {
    _phantom: PhantomData<fn(R) -> E>,
}

impl<R, E> Default for Ask<R, E> {
    fn default() -> Self {
        Ask {
            _phantom: PhantomData,
        }
    }
}

impl<R, E> std::fmt::Debug for Ask<R, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ask").finish()
    }
}

impl<R, E> Effect for Ask<R, E>
where
    R: Clone + 'static,
    E: 'static,
{
    type Output = R;
    type Error = E;
    type Env = R;

    fn fork(&self, env: R, reject: Reject<E>, resolve: Resolve<R>, runtime: &Runtime) -> Cancel {
        dispatch(runtime, reject, resolve, move |settle, _| {
            settle.resolve(env);
            Cancel::noop()
        })
    }
}

/// Runs `inner` with a captured environment, whatever the outer one is.
///
/// The outer environment type `R2` is free, so a provided effect fits into
/// any composition.
///
/// # Example
///
/// ```rust
/// use undertow::prelude::*;
/// use undertow::testing::test_runtime;
///
/// #[derive(Clone)]
/// struct Config {
///     retries: u32,
/// }
///
/// let needs_config = access::<_, _, String, _>(|c: Config| c.retries);
/// let standalone = needs_config.provide::<()>(Config { retries: 3 });
///
/// let (runtime, scheduler) = test_runtime();
/// let fiber = runtime.fork(&standalone, ());
/// scheduler.run();
/// assert_eq!(fiber.poll_outcome(), Some(Ok(3)));
/// ```
pub struct Provide<Inner: Effect, R2> {
    pub(crate) inner: Inner,
    pub(crate) env: Inner::Env,
    pub(crate) _phantom: PhantomData<fn(R2)>,
}

impl<Inner: Effect, R2> std::fmt::Debug for Provide<Inner, R2> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provide")
            .field("inner", &"<effect>")
            .field("env", &"<env>")
            .finish()
    }
}

impl<Inner, R2> Effect for Provide<Inner, R2>
where
    Inner: Effect,
    R2: Clone + 'static,
{
    type Output = Inner::Output;
    type Error = Inner::Error;
    type Env = R2;

    fn fork(
        &self,
        _env: R2,
        reject: Reject<Self::Error>,
        resolve: Resolve<Self::Output>,
        runtime: &Runtime,
    ) -> Cancel {
        self.inner.fork(self.env.clone(), reject, resolve, runtime)
    }
}

/// Runs `inner` with an environment derived from the outer one.
pub struct Local<Inner, F, R2> {
    pub(crate) inner: Inner,
    pub(crate) f: Rc<F>,
    pub(crate) _phantom: PhantomData<fn(R2)>,
}

impl<Inner, F, R2> std::fmt::Debug for Local<Inner, F, R2> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Local")
            .field("inner", &"<effect>")
            .field("f", &"<function>")
            .finish()
    }
}

impl<Inner, F, R2> Effect for Local<Inner, F, R2>
where
    Inner: Effect,
    F: Fn(&R2) -> Inner::Env + 'static,
    R2: Clone + 'static,
{
    type Output = Inner::Output;
    type Error = Inner::Error;
    type Env = R2;

    fn fork(
        &self,
        env: R2,
        reject: Reject<Self::Error>,
        resolve: Resolve<Self::Output>,
        runtime: &Runtime,
    ) -> Cancel {
        self.inner.fork((self.f)(&env), reject, resolve, runtime)
    }
}
