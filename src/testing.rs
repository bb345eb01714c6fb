//! Testing utilities for effects.
//!
//! Effects run on a scheduler, so tests usually want one whose clock they
//! control. [`test_runtime`] pairs a [`Runtime`] with the
//! [`TestScheduler`] driving it. [`Probe`] counts forks and cancellations,
//! [`Counter`] counts calls from inside closures, [`Timeline`] records
//! when things ran, and the assertion macros check a fiber's outcome.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use undertow::prelude::*;
//! use undertow::testing::{test_runtime, Probe};
//! use undertow::assert_resolves;
//!
//! let loser = Probe::<i32, String, ()>::never();
//! let effect = timeout(1, Duration::from_millis(10)).race(loser.clone());
//!
//! let (runtime, scheduler) = test_runtime();
//! let fiber = runtime.fork(&effect, ());
//! scheduler.run_to_end();
//!
//! assert_resolves!(fiber, 1);
//! assert_eq!(loser.cancels(), 1);
//! ```

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;
use std::time::Duration;

use crate::cancel::Cancel;
use crate::effect::{lift, Effect};
use crate::effect::{Reject, Resolve};
use crate::runtime::Runtime;
use crate::scheduler::{Scheduler, TestScheduler};

/// A runtime backed by a fresh [`TestScheduler`], and the scheduler itself.
pub fn test_runtime() -> (Runtime, TestScheduler) {
    let scheduler = TestScheduler::new();
    (Runtime::new(scheduler.clone()), scheduler)
}

/// A shared call counter for closures passed to effects.
///
/// ```rust
/// use undertow::prelude::*;
/// use undertow::testing::{test_runtime, Counter};
///
/// let calls = Counter::new();
/// let effect = lift::<_, _, String, ()>(calls.wrap(|| Ok(1)));
///
/// let (runtime, scheduler) = test_runtime();
/// runtime.fork(&effect, ());
/// runtime.fork(&effect, ());
/// scheduler.run();
/// assert_eq!(calls.get(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Counter {
    count: Rc<Cell<usize>>,
}

impl Counter {
    /// A counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one and return the new count.
    pub fn increment(&self) -> usize {
        let next = self.count.get() + 1;
        self.count.set(next);
        next
    }

    /// Current count.
    pub fn get(&self) -> usize {
        self.count.get()
    }

    /// Wrap `f` so every call increments the counter first.
    pub fn wrap<F, T>(&self, f: F) -> impl Fn() -> T + 'static
    where
        F: Fn() -> T + 'static,
        T: 'static,
    {
        let counter = self.clone();
        move || {
            counter.increment();
            f()
        }
    }
}

/// An effect that counts how often it is forked and cancelled.
///
/// A probe built with [`Probe::of`] resolves like [`of`](crate::of); one
/// built with [`Probe::never`] stays pending until cancelled. Clones share
/// their counters.
pub struct Probe<A, E, R> {
    value: Option<A>,
    forks: Rc<Cell<usize>>,
    cancels: Rc<Cell<usize>>,
    _phantom: PhantomData<fn(R) -> E>,
}

impl<A: Clone, E, R> Clone for Probe<A, E, R> {
    fn clone(&self) -> Self {
        Probe {
            value: self.value.clone(),
            forks: Rc::clone(&self.forks),
            cancels: Rc::clone(&self.cancels),
            _phantom: PhantomData,
        }
    }
}

impl<A, E, R> std::fmt::Debug for Probe<A, E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Probe")
            .field("resolves", &self.value.is_some())
            .field("forks", &self.forks.get())
            .field("cancels", &self.cancels.get())
            .finish()
    }
}

impl<A, E, R> Probe<A, E, R> {
    fn with_value(value: Option<A>) -> Self {
        Probe {
            value,
            forks: Rc::new(Cell::new(0)),
            cancels: Rc::new(Cell::new(0)),
            _phantom: PhantomData,
        }
    }

    /// A probe that resolves with `value`.
    pub fn of(value: A) -> Self {
        Self::with_value(Some(value))
    }

    /// A probe that never settles.
    pub fn never() -> Self {
        Self::with_value(None)
    }

    /// Number of forks so far.
    pub fn forks(&self) -> usize {
        self.forks.get()
    }

    /// Number of fork handles that have been cancelled.
    pub fn cancels(&self) -> usize {
        self.cancels.get()
    }
}

impl<A, E, R> Effect for Probe<A, E, R>
where
    A: Clone + 'static,
    E: 'static,
    R: Clone + 'static,
{
    type Output = A;
    type Error = E;
    type Env = R;

    fn fork(&self, env: R, reject: Reject<E>, resolve: Resolve<A>, runtime: &Runtime) -> Cancel {
        self.forks.set(self.forks.get() + 1);
        let inner = match &self.value {
            Some(value) => {
                let value = value.clone();
                lift::<_, _, E, R>(move || Ok(value.clone())).fork(env, reject, resolve, runtime)
            }
            None => Cancel::noop(),
        };
        let cancels = Rc::clone(&self.cancels);
        Cancel::new(move || {
            cancels.set(cancels.get() + 1);
            inner.cancel();
        })
    }
}

/// Records labelled events against a scheduler's clock.
///
/// ```rust
/// use std::time::Duration;
/// use undertow::prelude::*;
/// use undertow::testing::{test_runtime, Timeline};
///
/// let (runtime, scheduler) = test_runtime();
/// let timeline = Timeline::new(scheduler.clone());
/// let effect = timeline
///     .mark::<String, ()>("start")
///     .chain({
///         let timeline = timeline.clone();
///         move |_| timeline.mark("end").delay(Duration::from_millis(50))
///     });
///
/// runtime.fork(&effect, ());
/// scheduler.run_to_end();
/// assert_eq!(
///     timeline.entries(),
///     vec![
///         (Duration::ZERO, "start".to_string()),
///         (Duration::from_millis(50), "end".to_string()),
///     ]
/// );
/// ```
#[derive(Clone)]
pub struct Timeline {
    clock: Rc<dyn Scheduler>,
    entries: Rc<RefCell<Vec<(Duration, String)>>>,
}

impl std::fmt::Debug for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("entries", &self.entries.borrow())
            .finish()
    }
}

impl Timeline {
    /// Create an empty timeline reading time from `clock`.
    pub fn new(clock: impl Scheduler + 'static) -> Self {
        Timeline {
            clock: Rc::new(clock),
            entries: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Record `label` now.
    pub fn record(&self, label: impl Into<String>) {
        self.entries
            .borrow_mut()
            .push((self.clock.now(), label.into()));
    }

    /// An effect that records `label` each time it runs.
    pub fn mark<E, R>(&self, label: &str) -> impl Effect<Output = (), Error = E, Env = R>
    where
        E: 'static,
        R: Clone + 'static,
    {
        let timeline = self.clone();
        let label = label.to_string();
        lift::<_, _, E, R>(move || {
            timeline.record(label.clone());
            Ok(())
        })
    }

    /// Everything recorded so far, in order.
    pub fn entries(&self) -> Vec<(Duration, String)> {
        self.entries.borrow().clone()
    }

    /// The recorded labels without timestamps.
    pub fn labels(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|(_, label)| label.clone())
            .collect()
    }
}

/// Assert that a fiber resolved with the expected value.
///
/// Takes the fiber's outcome.
#[macro_export]
macro_rules! assert_resolves {
    ($fiber:expr, $expected:expr) => {
        match $fiber.poll_outcome() {
            Some(Ok(value)) => assert_eq!(value, $expected),
            other => panic!("expected resolution with {:?}, got {:?}", $expected, other),
        }
    };
}

/// Assert that a fiber rejected with the expected typed error.
#[macro_export]
macro_rules! assert_rejects {
    ($fiber:expr, $expected:expr) => {
        match $fiber.poll_outcome() {
            Some(Err($crate::RunError::Rejected(error))) => assert_eq!(error, $expected),
            other => panic!("expected rejection with {:?}, got {:?}", $expected, other),
        }
    };
}

/// Assert that a fiber has not settled.
#[macro_export]
macro_rules! assert_pending {
    ($fiber:expr) => {
        assert_eq!(
            $fiber.status(),
            $crate::Status::Forked,
            "expected fiber to be pending"
        )
    };
}
