//! Per-fork settlement state.
//!
//! [`Settle`] owns the reject/resolve pair of one fork together with its
//! [`Status`]. Claiming a terminal status takes the callbacks out, so a
//! second settlement, or any settlement after cancellation, has nothing to
//! call.

use std::cell::RefCell;
use std::rc::Rc;

use crate::cause::Cause;
use crate::effect::trait_def::{Reject, Resolve};

/// Lifecycle of a single fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Status {
    /// Started and not settled yet.
    Forked,
    /// Settled with a value.
    Resolved,
    /// Settled with a rejection.
    Rejected,
    /// Cancelled before settling.
    Cancelled,
}

impl Status {
    /// Returns true for every state except `Forked`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Forked)
    }
}

struct SettleState<E, A> {
    status: Status,
    callbacks: Option<(Reject<E>, Resolve<A>)>,
}

/// The callback pair handed to a fork body.
///
/// Cloning yields another reference to the same fork, so a body can move a
/// clone into whatever eventually completes the work. Only the first
/// `resolve`/`reject`/`fail` has any effect.
///
/// # Example
///
/// ```rust
/// use undertow::prelude::*;
/// use undertow::testing::test_runtime;
///
/// let effect = from_fn(|_: (), settle: Settle<String, i32>, _: &Runtime| {
///     settle.resolve(1);
///     settle.resolve(2);
///     settle.reject("ignored".to_string());
/// });
///
/// let (runtime, scheduler) = test_runtime();
/// let fiber = runtime.fork(&effect, ());
/// scheduler.run();
/// assert_eq!(fiber.poll_outcome(), Some(Ok(1)));
/// ```
pub struct Settle<E, A> {
    state: Rc<RefCell<SettleState<E, A>>>,
}

impl<E, A> Clone for Settle<E, A> {
    fn clone(&self) -> Self {
        Settle {
            state: Rc::clone(&self.state),
        }
    }
}

impl<E, A> std::fmt::Debug for Settle<E, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settle")
            .field("status", &self.state.borrow().status)
            .finish()
    }
}

impl<E: 'static, A: 'static> Settle<E, A> {
    pub(crate) fn new(reject: Reject<E>, resolve: Resolve<A>) -> Self {
        Settle {
            state: Rc::new(RefCell::new(SettleState {
                status: Status::Forked,
                callbacks: Some((reject, resolve)),
            })),
        }
    }

    /// Current status of the fork.
    pub fn status(&self) -> Status {
        self.state.borrow().status
    }

    /// Returns true until the fork settles or is cancelled.
    pub fn is_pending(&self) -> bool {
        self.status() == Status::Forked
    }

    /// Resolve with `value`. Returns false if the fork already settled or
    /// was cancelled.
    pub fn resolve(&self, value: A) -> bool {
        match self.claim(Status::Resolved) {
            Some((_, resolve)) => {
                resolve(value);
                true
            }
            None => false,
        }
    }

    /// Reject with a typed error.
    pub fn reject(&self, error: E) -> bool {
        self.fail(Cause::Fail(error))
    }

    /// Reject with any cause.
    pub fn fail(&self, cause: Cause<E>) -> bool {
        match self.claim(Status::Rejected) {
            Some((reject, _)) => {
                reject(cause);
                true
            }
            None => false,
        }
    }

    /// Settle from a `Result`.
    pub fn complete(&self, result: Result<A, E>) -> bool {
        match result {
            Ok(value) => self.resolve(value),
            Err(error) => self.reject(error),
        }
    }

    /// Move from `Forked` to `outcome`, handing back the callbacks.
    ///
    /// The borrow is released before returning so the caller can invoke the
    /// callbacks re-entrantly.
    pub(crate) fn claim(&self, outcome: Status) -> Option<(Reject<E>, Resolve<A>)> {
        let mut state = self.state.borrow_mut();
        if state.status != Status::Forked {
            return None;
        }
        state.status = outcome;
        state.callbacks.take()
    }

    /// Mark cancelled. Returns true if the fork was still pending.
    pub(crate) fn cancel(&self) -> bool {
        self.claim(Status::Cancelled).is_some()
    }

    pub(crate) fn rejecter(&self) -> Reject<E> {
        let settle = self.clone();
        Box::new(move |cause| {
            settle.fail(cause);
        })
    }

    pub(crate) fn resolver(&self) -> Resolve<A> {
        let settle = self.clone();
        Box::new(move |value| {
            settle.resolve(value);
        })
    }
}
