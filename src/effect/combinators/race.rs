//! Race combinator - the first effect to settle wins.

use crate::cancel::{ActiveChild, Cancel};
use crate::cause::Cause;
use crate::effect::settle::{Settle, Status};
use crate::effect::trait_def::{Effect, Reject, Resolve};
use crate::runtime::Runtime;

/// Forks both effects; whichever settles first, either way, decides the
/// outcome.
///
/// The loser is cancelled before the winner's outcome is delivered. Both
/// forks happen in the same call, `left` first, so ties on the scheduler go
/// to `left`.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use undertow::prelude::*;
/// use undertow::testing::test_runtime;
///
/// let slow = timeout::<_, String, ()>("slow", Duration::from_millis(50));
/// let fast = timeout::<_, String, ()>("fast", Duration::from_millis(10));
///
/// let (runtime, scheduler) = test_runtime();
/// let fiber = runtime.fork(&slow.race(fast), ());
/// scheduler.run_to_end();
/// assert_eq!(fiber.poll_outcome(), Some(Ok("fast")));
/// ```
pub struct Race<L, R> {
    pub(crate) left: L,
    pub(crate) right: R,
}

impl<L, R> std::fmt::Debug for Race<L, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Race")
            .field("left", &"<effect>")
            .field("right", &"<effect>")
            .finish()
    }
}

fn contender<E: 'static, A: 'static>(
    settle: &Settle<E, A>,
    loser: &ActiveChild,
) -> (Reject<E>, Resolve<A>) {
    let on_reject = {
        let settle = settle.clone();
        let loser = loser.clone();
        Box::new(move |cause: Cause<E>| {
            if let Some((reject, _)) = settle.claim(Status::Rejected) {
                loser.cancel();
                reject(cause);
            }
        })
    };
    let on_resolve = {
        let settle = settle.clone();
        let loser = loser.clone();
        Box::new(move |value: A| {
            if let Some((_, resolve)) = settle.claim(Status::Resolved) {
                loser.cancel();
                resolve(value);
            }
        })
    };
    (on_reject, on_resolve)
}

impl<L, R> Effect for Race<L, R>
where
    L: Effect,
    R: Effect<Output = L::Output, Error = L::Error, Env = L::Env>,
{
    type Output = L::Output;
    type Error = L::Error;
    type Env = L::Env;

    fn fork(
        &self,
        env: Self::Env,
        reject: Reject<Self::Error>,
        resolve: Resolve<Self::Output>,
        runtime: &Runtime,
    ) -> Cancel {
        let settle = Settle::new(reject, resolve);
        let left_slot = ActiveChild::default();
        let right_slot = ActiveChild::default();

        let (on_reject, on_resolve) = contender(&settle, &right_slot);
        left_slot.init(self.left.fork(env.clone(), on_reject, on_resolve, runtime));

        let (on_reject, on_resolve) = contender(&settle, &left_slot);
        right_slot.init(self.right.fork(env, on_reject, on_resolve, runtime));

        Cancel::new(move || {
            if settle.cancel() {
                left_slot.cancel();
                right_slot.cancel();
            }
        })
    }
}
