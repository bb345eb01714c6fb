//! Chain combinator - sequences an effect into the one its value selects.

use std::rc::Rc;

use crate::cancel::{ActiveChild, Cancel};
use crate::cause::{guard, Cause};
use crate::effect::settle::Settle;
use crate::effect::trait_def::{Effect, Reject, Resolve};
use crate::runtime::Runtime;

/// Forks `inner`, then forks the effect `f` builds from its value.
///
/// Both effects see the same environment. A rejection of `inner` propagates
/// without calling `f`. The returned handle always cancels whichever of the
/// two is running.
///
/// # Example
///
/// ```rust
/// use undertow::prelude::*;
/// use undertow::testing::test_runtime;
///
/// let effect = of::<_, String, ()>(2).chain(|x| of(x + 3));
///
/// let (runtime, scheduler) = test_runtime();
/// let fiber = runtime.fork(&effect, ());
/// scheduler.run();
/// assert_eq!(fiber.poll_outcome(), Some(Ok(5)));
/// ```
pub struct Chain<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Rc<F>,
}

impl<Inner, F> std::fmt::Debug for Chain<Inner, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("inner", &"<effect>")
            .field("f", &"<function>")
            .finish()
    }
}

impl<Inner, F, Next> Effect for Chain<Inner, F>
where
    Inner: Effect,
    F: Fn(Inner::Output) -> Next + 'static,
    Next: Effect<Error = Inner::Error, Env = Inner::Env>,
{
    type Output = Next::Output;
    type Error = Inner::Error;
    type Env = Inner::Env;

    fn fork(
        &self,
        env: Self::Env,
        reject: Reject<Self::Error>,
        resolve: Resolve<Self::Output>,
        runtime: &Runtime,
    ) -> Cancel {
        let settle = Settle::new(reject, resolve);
        let active = ActiveChild::default();

        let on_resolve = {
            let settle = settle.clone();
            let active = active.clone();
            let f = Rc::clone(&self.f);
            let env = env.clone();
            let runtime = runtime.clone();
            Box::new(move |value: Inner::Output| {
                if !settle.is_pending() {
                    return;
                }
                match guard(|| f(value)) {
                    Ok(next) => {
                        let cancel =
                            next.fork(env, settle.rejecter(), settle.resolver(), &runtime);
                        active.replace(cancel);
                    }
                    Err(panic) => {
                        settle.fail(Cause::Panic(panic));
                    }
                }
            })
        };

        let first = self
            .inner
            .fork(env, settle.rejecter(), on_resolve, runtime);
        active.init(first);

        Cancel::new(move || {
            if settle.cancel() {
                active.cancel();
            }
        })
    }
}

/// Forks `first`, then `second`, resolving with the value of `second`.
///
/// The value of `first` is discarded. `second` is not forked when `first`
/// rejects.
///
/// # Example
///
/// ```rust
/// use undertow::prelude::*;
/// use undertow::testing::test_runtime;
///
/// let effect = of::<_, String, ()>("ignored").and(of(7));
///
/// let (runtime, scheduler) = test_runtime();
/// let fiber = runtime.fork(&effect, ());
/// scheduler.run();
/// assert_eq!(fiber.poll_outcome(), Some(Ok(7)));
/// ```
pub struct And<First, Second> {
    pub(crate) first: First,
    pub(crate) second: Rc<Second>,
}

impl<First, Second> std::fmt::Debug for And<First, Second> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("And")
            .field("first", &"<effect>")
            .field("second", &"<effect>")
            .finish()
    }
}

impl<First, Second> Effect for And<First, Second>
where
    First: Effect,
    Second: Effect<Error = First::Error, Env = First::Env>,
{
    type Output = Second::Output;
    type Error = First::Error;
    type Env = First::Env;

    fn fork(
        &self,
        env: Self::Env,
        reject: Reject<Self::Error>,
        resolve: Resolve<Self::Output>,
        runtime: &Runtime,
    ) -> Cancel {
        let settle = Settle::new(reject, resolve);
        let active = ActiveChild::default();

        let on_resolve = {
            let settle = settle.clone();
            let active = active.clone();
            let second = Rc::clone(&self.second);
            let env = env.clone();
            let runtime = runtime.clone();
            Box::new(move |_: First::Output| {
                if !settle.is_pending() {
                    return;
                }
                let cancel = second.fork(env, settle.rejecter(), settle.resolver(), &runtime);
                active.replace(cancel);
            })
        };

        let first = self
            .first
            .fork(env, settle.rejecter(), on_resolve, runtime);
        active.init(first);

        Cancel::new(move || {
            if settle.cancel() {
                active.cancel();
            }
        })
    }
}
