//! Fibers - handles to a forked effect.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::cancel::Cancel;
use crate::cause::{Cause, RunError};
use crate::effect::Status;

struct FiberState<A, E> {
    status: Status,
    outcome: Option<Result<A, RunError<E>>>,
    waker: Option<Waker>,
}

/// A running fork observed from the outside.
///
/// The fiber records the status and outcome of the fork. The outcome can
/// be taken once, either with [`poll_outcome`](Self::poll_outcome) or by
/// awaiting the fiber. Once taken, the future stays pending.
pub struct Fiber<A, E> {
    state: Rc<RefCell<FiberState<A, E>>>,
    cancel: Cancel,
}

impl<A, E> std::fmt::Debug for Fiber<A, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Fiber")
            .field("status", &state.status)
            .field("has_outcome", &state.outcome.is_some())
            .finish()
    }
}

/// Write side of a fiber, owned by the fork's callbacks.
pub(crate) struct FiberSlot<A, E> {
    state: Rc<RefCell<FiberState<A, E>>>,
}

impl<A, E> FiberSlot<A, E> {
    pub(crate) fn new() -> Self {
        FiberSlot {
            state: Rc::new(RefCell::new(FiberState {
                status: Status::Forked,
                outcome: None,
                waker: None,
            })),
        }
    }

    fn handle(&self) -> Self {
        FiberSlot {
            state: Rc::clone(&self.state),
        }
    }

    pub(crate) fn reject_handle(&self) -> impl FnOnce(Cause<E>) + 'static
    where
        A: 'static,
        E: 'static,
    {
        let slot = self.handle();
        move |cause| slot.settle(Status::Rejected, Err(RunError::from(cause)))
    }

    pub(crate) fn resolve_handle(&self) -> impl FnOnce(A) + 'static
    where
        A: 'static,
        E: 'static,
    {
        let slot = self.handle();
        move |value| slot.settle(Status::Resolved, Ok(value))
    }

    fn settle(&self, status: Status, outcome: Result<A, RunError<E>>) {
        let waker = {
            let mut state = self.state.borrow_mut();
            if state.status != Status::Forked {
                return;
            }
            state.status = status;
            state.outcome = Some(outcome);
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    pub(crate) fn into_fiber(self, cancel: Cancel) -> Fiber<A, E> {
        Fiber {
            state: self.state,
            cancel,
        }
    }
}

impl<A, E> Fiber<A, E> {
    /// Current status of the fork.
    pub fn status(&self) -> Status {
        self.state.borrow().status
    }

    /// Returns true once the fork resolved, rejected or was cancelled.
    pub fn is_done(&self) -> bool {
        self.status().is_terminal()
    }

    /// Cancel the fork. No-op once it has settled.
    pub fn cancel(&self) {
        self.cancel.cancel();
        FiberSlot {
            state: Rc::clone(&self.state),
        }
        .settle(Status::Cancelled, Err(RunError::Cancelled));
    }

    /// The cancellation handle of the underlying fork.
    pub fn canceller(&self) -> Cancel {
        self.cancel.clone()
    }

    /// Take the outcome if the fork is done.
    pub fn poll_outcome(&self) -> Option<Result<A, RunError<E>>> {
        self.state.borrow_mut().outcome.take()
    }
}

impl<A, E> Future for Fiber<A, E> {
    type Output = Result<A, RunError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.state.borrow_mut();
        match state.outcome.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                state.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
