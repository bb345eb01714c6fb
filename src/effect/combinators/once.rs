//! Once combinator - memoizes an effect's outcome.
//!
//! The wrapped effect is forked at most once per memo. Forks made while it
//! is in flight subscribe to its outcome; forks made afterwards replay the
//! cached outcome on the next scheduler tick. Cancelling a subscriber only
//! detaches that subscriber, the shared computation keeps running and its
//! outcome is still cached.

use std::cell::RefCell;
use std::rc::Rc;

use crate::cancel::Cancel;
use crate::cause::Cause;
use crate::effect::settle::Settle;
use crate::effect::trait_def::{Effect, Reject, Resolve};
use crate::runtime::Runtime;

enum Memo<A, E> {
    Idle,
    Running {
        next_id: u64,
        subscribers: Vec<(u64, Settle<E, A>)>,
    },
    Done(Result<A, Cause<E>>),
}

/// Runs the wrapped effect once and shares its outcome.
///
/// Clones of a `Once` share the same memo.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use undertow::prelude::*;
/// use undertow::testing::test_runtime;
///
/// let runs = Rc::new(Cell::new(0));
/// let counter = runs.clone();
/// let effect = lift::<_, _, String, ()>(move || {
///     counter.set(counter.get() + 1);
///     Ok(counter.get())
/// })
/// .once();
///
/// let (runtime, scheduler) = test_runtime();
/// let first = runtime.fork(&effect, ());
/// let second = runtime.fork(&effect, ());
/// scheduler.run();
/// assert_eq!(first.poll_outcome(), Some(Ok(1)));
/// assert_eq!(second.poll_outcome(), Some(Ok(1)));
/// assert_eq!(runs.get(), 1);
/// ```
pub struct Once<Inner: Effect> {
    inner: Rc<Inner>,
    memo: Rc<RefCell<Memo<Inner::Output, Inner::Error>>>,
}

impl<Inner: Effect> Clone for Once<Inner> {
    fn clone(&self) -> Self {
        Once {
            inner: Rc::clone(&self.inner),
            memo: Rc::clone(&self.memo),
        }
    }
}

impl<Inner: Effect> std::fmt::Debug for Once<Inner> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.memo.borrow() {
            Memo::Idle => "idle",
            Memo::Running { .. } => "running",
            Memo::Done(_) => "done",
        };
        f.debug_struct("Once")
            .field("inner", &"<effect>")
            .field("state", &state)
            .finish()
    }
}

impl<Inner: Effect> Once<Inner> {
    pub(crate) fn new(inner: Inner) -> Self {
        Once {
            inner: Rc::new(inner),
            memo: Rc::new(RefCell::new(Memo::Idle)),
        }
    }

    /// Returns true once the wrapped effect has settled.
    pub fn is_settled(&self) -> bool {
        matches!(&*self.memo.borrow(), Memo::Done(_))
    }
}

impl<Inner> Once<Inner>
where
    Inner: Effect,
    Inner::Output: Clone,
    Inner::Error: Clone,
{
    fn finish(
        memo: &RefCell<Memo<Inner::Output, Inner::Error>>,
        outcome: Result<Inner::Output, Cause<Inner::Error>>,
    ) {
        let previous = std::mem::replace(&mut *memo.borrow_mut(), Memo::Done(outcome.clone()));
        let subscribers = match previous {
            Memo::Running { subscribers, .. } => subscribers,
            _ => Vec::new(),
        };
        for (_, settle) in subscribers {
            match outcome.clone() {
                Ok(value) => settle.resolve(value),
                Err(cause) => settle.fail(cause),
            };
        }
    }

    fn detach(memo: &RefCell<Memo<Inner::Output, Inner::Error>>, id: u64) {
        if let Memo::Running { subscribers, .. } = &mut *memo.borrow_mut() {
            subscribers.retain(|(subscriber, _)| *subscriber != id);
        }
    }

    fn subscription(&self, settle: Settle<Inner::Error, Inner::Output>, id: u64) -> Cancel {
        let memo = Rc::clone(&self.memo);
        Cancel::new(move || {
            if settle.cancel() {
                Self::detach(&memo, id);
            }
        })
    }
}

impl<Inner> Effect for Once<Inner>
where
    Inner: Effect,
    Inner::Output: Clone,
    Inner::Error: Clone,
{
    type Output = Inner::Output;
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

        let mut memo = self.memo.borrow_mut();
        match &mut *memo {
            Memo::Done(outcome) => {
                let outcome = outcome.clone();
                drop(memo);
                let replay = {
                    let settle = settle.clone();
                    runtime.scheduler().asap(Box::new(move || {
                        match outcome {
                            Ok(value) => settle.resolve(value),
                            Err(cause) => settle.fail(cause),
                        };
                    }))
                };
                Cancel::new(move || {
                    if settle.cancel() {
                        replay.cancel();
                    }
                })
            }
            Memo::Running {
                next_id,
                subscribers,
            } => {
                let id = *next_id;
                *next_id += 1;
                subscribers.push((id, settle.clone()));
                drop(memo);
                self.subscription(settle, id)
            }
            Memo::Idle => {
                *memo = Memo::Running {
                    next_id: 1,
                    subscribers: vec![(0, settle.clone())],
                };
                drop(memo);

                let on_reject = {
                    let memo = Rc::clone(&self.memo);
                    Box::new(move |cause| Self::finish(&memo, Err(cause)))
                };
                let on_resolve = {
                    let memo = Rc::clone(&self.memo);
                    Box::new(move |value| Self::finish(&memo, Ok(value)))
                };
                // The shared fork is never cancelled, so its handle is dropped.
                let _shared = self.inner.fork(env, on_reject, on_resolve, runtime);
                self.subscription(settle, 0)
            }
        }
    }
}
