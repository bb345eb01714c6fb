//! Value and error transformers: `Map`, `TryMap` and `MapErr`.

use std::rc::Rc;

use crate::cancel::Cancel;
use crate::cause::{guard, Cause};
use crate::effect::settle::Settle;
use crate::effect::trait_def::{Effect, Reject, Resolve};
use crate::runtime::Runtime;

/// Map combinator - transforms the resolved value.
///
/// A panic in the function rejects the fork with [`Cause::Panic`].
/// Rejection and cancellation of the inner effect pass through; the
/// cancellation handle is the inner fork's own.
///
/// # Example
///
/// ```rust
/// use undertow::prelude::*;
/// use undertow::testing::test_runtime;
///
/// let (runtime, scheduler) = test_runtime();
/// let fiber = runtime.fork(&of::<_, String, ()>(21).map(|x| x * 2), ());
/// scheduler.run();
/// assert_eq!(fiber.poll_outcome(), Some(Ok(42)));
/// ```
pub struct Map<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Rc<F>,
}

impl<Inner, F> std::fmt::Debug for Map<Inner, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Map")
            .field("inner", &"<effect>")
            .field("f", &"<function>")
            .finish()
    }
}

impl<Inner, F, B> Effect for Map<Inner, F>
where
    Inner: Effect,
    F: Fn(Inner::Output) -> B + 'static,
    B: 'static,
{
    type Output = B;
    type Error = Inner::Error;
    type Env = Inner::Env;

    fn fork(
        &self,
        env: Self::Env,
        reject: Reject<Self::Error>,
        resolve: Resolve<B>,
        runtime: &Runtime,
    ) -> Cancel {
        let settle = Settle::new(reject, resolve);
        let f = Rc::clone(&self.f);
        let on_resolve = {
            let settle = settle.clone();
            Box::new(move |value| match guard(|| f(value)) {
                Ok(mapped) => {
                    settle.resolve(mapped);
                }
                Err(panic) => {
                    settle.fail(Cause::Panic(panic));
                }
            })
        };
        self.inner
            .fork(env, settle.rejecter(), on_resolve, runtime)
    }
}

/// TryMap combinator - applies a fallible transformation.
///
/// `Err` from the function rejects the fork with that error.
pub struct TryMap<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Rc<F>,
}

impl<Inner, F> std::fmt::Debug for TryMap<Inner, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TryMap")
            .field("inner", &"<effect>")
            .field("f", &"<function>")
            .finish()
    }
}

impl<Inner, F, B> Effect for TryMap<Inner, F>
where
    Inner: Effect,
    F: Fn(Inner::Output) -> Result<B, Inner::Error> + 'static,
    B: 'static,
{
    type Output = B;
    type Error = Inner::Error;
    type Env = Inner::Env;

    fn fork(
        &self,
        env: Self::Env,
        reject: Reject<Self::Error>,
        resolve: Resolve<B>,
        runtime: &Runtime,
    ) -> Cancel {
        let settle = Settle::new(reject, resolve);
        let f = Rc::clone(&self.f);
        let on_resolve = {
            let settle = settle.clone();
            Box::new(move |value| match guard(|| f(value)) {
                Ok(result) => {
                    settle.complete(result);
                }
                Err(panic) => {
                    settle.fail(Cause::Panic(panic));
                }
            })
        };
        self.inner
            .fork(env, settle.rejecter(), on_resolve, runtime)
    }
}

/// MapErr combinator - transforms the typed error.
///
/// Panics pass through unchanged.
pub struct MapErr<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Rc<F>,
}

impl<Inner, F> std::fmt::Debug for MapErr<Inner, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapErr")
            .field("inner", &"<effect>")
            .field("f", &"<function>")
            .finish()
    }
}

impl<Inner, F, E2> Effect for MapErr<Inner, F>
where
    Inner: Effect,
    F: Fn(Inner::Error) -> E2 + 'static,
    E2: 'static,
{
    type Output = Inner::Output;
    type Error = E2;
    type Env = Inner::Env;

    fn fork(
        &self,
        env: Self::Env,
        reject: Reject<E2>,
        resolve: Resolve<Self::Output>,
        runtime: &Runtime,
    ) -> Cancel {
        let settle = Settle::new(reject, resolve);
        let f = Rc::clone(&self.f);
        let on_reject = {
            let settle = settle.clone();
            Box::new(move |cause: Cause<Inner::Error>| {
                let mapped = match cause {
                    Cause::Fail(error) => match guard(|| f(error)) {
                        Ok(error) => Cause::Fail(error),
                        Err(panic) => Cause::Panic(panic),
                    },
                    Cause::Panic(panic) => Cause::Panic(panic),
                };
                settle.fail(mapped);
            })
        };
        self.inner
            .fork(env, on_reject, settle.resolver(), runtime)
    }
}
