//! Retry combinator - re-forks an effect on typed rejection.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::cancel::{ActiveChild, Cancel};
use crate::cause::Cause;
use crate::effect::settle::Settle;
use crate::effect::trait_def::{Effect, Reject, Resolve};
use crate::retry::{RetryExhausted, RetryPolicy};
use crate::runtime::Runtime;

/// Forks `inner` again after each typed rejection, waiting the policy's
/// delay on the scheduler in between.
///
/// When the policy refuses another attempt the fork rejects with
/// [`RetryExhausted`]. Panics are delivered immediately and never retried.
/// Cancelling targets the running attempt or the pending backoff timer.
pub struct Retry<Inner> {
    pub(crate) inner: Rc<Inner>,
    pub(crate) policy: RetryPolicy,
}

impl<Inner> std::fmt::Debug for Retry<Inner> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retry")
            .field("inner", &"<effect>")
            .field("policy", &self.policy)
            .finish()
    }
}

struct Attempt<Inner: Effect> {
    inner: Rc<Inner>,
    policy: RetryPolicy,
    settle: Settle<RetryExhausted<Inner::Error>, Inner::Output>,
    active: ActiveChild,
    env: Inner::Env,
    runtime: Runtime,
    tries: Cell<u32>,
    prev_delay: Cell<Option<Duration>>,
    started: Duration,
}

impl<Inner: Effect> Attempt<Inner> {
    fn launch(self: &Rc<Self>) {
        if !self.settle.is_pending() {
            return;
        }
        self.tries.set(self.tries.get() + 1);

        let on_reject = {
            let this = Rc::clone(self);
            Box::new(move |cause| match cause {
                Cause::Fail(error) => this.backoff(error),
                Cause::Panic(panic) => {
                    this.settle.fail(Cause::Panic(panic));
                }
            })
        };
        let on_resolve = self.settle.resolver();
        let cancel = self
            .inner
            .fork(self.env.clone(), on_reject, on_resolve, &self.runtime);
        self.active.replace(cancel);
    }

    fn backoff(self: &Rc<Self>, error: Inner::Error) {
        if !self.settle.is_pending() {
            return;
        }
        let tries = self.tries.get();
        match self.policy.delay_with_jitter(tries - 1, self.prev_delay.get()) {
            Some(delay) => {
                tracing::debug!(attempt = tries, ?delay, "attempt rejected, backing off");
                self.prev_delay.set(Some(delay));
                let this = Rc::clone(self);
                let timer = self
                    .runtime
                    .scheduler()
                    .after(delay, Box::new(move || this.launch()));
                self.active.replace(timer);
            }
            None => {
                let elapsed = self.runtime.scheduler().now().saturating_sub(self.started);
                tracing::debug!(attempts = tries, ?elapsed, "retries exhausted");
                self.settle
                    .reject(RetryExhausted::new(error, tries, elapsed));
            }
        }
    }
}

impl<Inner: Effect> Effect for Retry<Inner> {
    type Output = Inner::Output;
    type Error = RetryExhausted<Inner::Error>;
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
        let attempt = Rc::new(Attempt {
            inner: Rc::clone(&self.inner),
            policy: self.policy.clone(),
            settle: settle.clone(),
            active: active.clone(),
            env,
            runtime: runtime.clone(),
            tries: Cell::new(0),
            prev_delay: Cell::new(None),
            started: runtime.scheduler().now(),
        });
        attempt.launch();

        Cancel::new(move || {
            if settle.cancel() {
                active.cancel();
            }
        })
    }
}
