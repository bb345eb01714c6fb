//! Catch combinator - recovers from rejections with a fallback effect.

use std::rc::Rc;

use crate::cancel::{ActiveChild, Cancel};
use crate::cause::{guard, Cause};
use crate::effect::settle::Settle;
use crate::effect::trait_def::{Effect, Reject, Resolve};
use crate::runtime::Runtime;

/// Decides how a rejection is recovered.
///
/// Returning `Err` forwards a cause without recovering.
pub trait Recover<E>: 'static {
    /// The effect that replaces the rejected one.
    type Next: Effect;

    /// Build the recovery effect, or pass the cause on.
    fn recover(&self, cause: Cause<E>) -> Result<Self::Next, Cause<<Self::Next as Effect>::Error>>;
}

/// Recovers typed errors only; panics pass through.
pub struct OnFail<F>(pub(crate) F);

impl<F> std::fmt::Debug for OnFail<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("OnFail").field(&"<function>").finish()
    }
}

impl<E, F, Next> Recover<E> for OnFail<F>
where
    F: Fn(E) -> Next + 'static,
    Next: Effect,
{
    type Next = Next;

    fn recover(&self, cause: Cause<E>) -> Result<Next, Cause<Next::Error>> {
        match cause {
            Cause::Fail(error) => Ok((self.0)(error)),
            Cause::Panic(panic) => Err(Cause::Panic(panic)),
        }
    }
}

/// Recovers every cause, panics included.
pub struct OnCause<F>(pub(crate) F);

impl<F> std::fmt::Debug for OnCause<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("OnCause").field(&"<function>").finish()
    }
}

impl<E, F, Next> Recover<E> for OnCause<F>
where
    F: Fn(Cause<E>) -> Next + 'static,
    Next: Effect,
{
    type Next = Next;

    fn recover(&self, cause: Cause<E>) -> Result<Next, Cause<Next::Error>> {
        Ok((self.0)(cause))
    }
}

/// Forks `inner`; on rejection forks the recovery effect instead.
///
/// A resolved value passes through untouched. The returned handle cancels
/// whichever effect is active.
///
/// # Example
///
/// ```rust
/// use undertow::prelude::*;
/// use undertow::testing::test_runtime;
///
/// let effect = reject::<i32, _, ()>("missing".to_string())
///     .catch(|e: String| of::<_, String, ()>(e.len() as i32));
///
/// let (runtime, scheduler) = test_runtime();
/// let fiber = runtime.fork(&effect, ());
/// scheduler.run();
/// assert_eq!(fiber.poll_outcome(), Some(Ok(7)));
/// ```
pub struct Catch<Inner, H> {
    pub(crate) inner: Inner,
    pub(crate) handler: Rc<H>,
}

impl<Inner, H> std::fmt::Debug for Catch<Inner, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catch")
            .field("inner", &"<effect>")
            .field("handler", &"<function>")
            .finish()
    }
}

impl<Inner, H> Effect for Catch<Inner, H>
where
    Inner: Effect,
    H: Recover<Inner::Error>,
    H::Next: Effect<Output = Inner::Output, Env = Inner::Env>,
{
    type Output = Inner::Output;
    type Error = <H::Next as Effect>::Error;
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

        let on_reject = {
            let settle = settle.clone();
            let active = active.clone();
            let handler = Rc::clone(&self.handler);
            let env = env.clone();
            let runtime = runtime.clone();
            Box::new(move |cause: Cause<Inner::Error>| {
                if !settle.is_pending() {
                    return;
                }
                match guard(|| handler.recover(cause)) {
                    Ok(Ok(next)) => {
                        let cancel =
                            next.fork(env, settle.rejecter(), settle.resolver(), &runtime);
                        active.replace(cancel);
                    }
                    Ok(Err(cause)) => {
                        settle.fail(cause);
                    }
                    Err(panic) => {
                        settle.fail(Cause::Panic(panic));
                    }
                }
            })
        };

        let first = self
            .inner
            .fork(env, on_reject, settle.resolver(), runtime);
        active.init(first);

        Cancel::new(move || {
            if settle.cancel() {
                active.cancel();
            }
        })
    }
}
