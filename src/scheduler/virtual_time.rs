//! Deterministic scheduler driven by virtual time.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use futures::task::noop_waker_ref;
use futures::{FutureExt, StreamExt};

use super::queue::Dispatch;
use super::{Scheduler, Task};
use crate::cancel::Cancel;

/// A scheduler whose clock only moves when the test says so.
///
/// Nothing runs until one of [`run`](Self::run),
/// [`advance_by`](Self::advance_by), [`advance_to`](Self::advance_to) or
/// [`run_to_end`](Self::run_to_end) is called. Spawned futures are polled
/// with a no-op waker on every step, which suits futures that complete
/// without real I/O.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use undertow::prelude::*;
/// use undertow::testing::test_runtime;
///
/// let (runtime, scheduler) = test_runtime();
/// let fiber = runtime.fork(&of::<_, String, ()>("done").delay(Duration::from_millis(100)), ());
///
/// scheduler.advance_by(Duration::from_millis(99));
/// assert_eq!(fiber.status(), Status::Forked);
///
/// scheduler.advance_by(Duration::from_millis(1));
/// assert_eq!(fiber.poll_outcome(), Some(Ok("done")));
/// ```
#[derive(Clone, Default)]
pub struct TestScheduler {
    dispatch: Rc<Dispatch>,
    now: Rc<Cell<Duration>>,
    futures: Rc<RefCell<FuturesUnordered<LocalBoxFuture<'static, ()>>>>,
}

impl std::fmt::Debug for TestScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestScheduler")
            .field("now", &self.now.get())
            .field("pending", &self.pending())
            .finish()
    }
}

impl TestScheduler {
    /// Create a scheduler at virtual time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every ready task and poll spawned futures at the current time,
    /// repeating until neither makes progress.
    pub fn run(&self) {
        loop {
            let ran = self.dispatch.run_ready();
            let polled = self.poll_futures();
            if ran == 0 && !polled && !self.dispatch.has_incoming() {
                break;
            }
        }
    }

    /// Move the clock forward by `delay`, firing every timer on the way.
    pub fn advance_by(&self, delay: Duration) {
        self.advance_to(self.now.get().saturating_add(delay));
    }

    /// Move the clock to `time`, firing every timer due at or before it.
    ///
    /// Each timer sees the clock at its own deadline, and the ready queue
    /// is drained after each one.
    pub fn advance_to(&self, time: Duration) {
        self.run();
        while let Some((deadline, task)) = self.dispatch.pop_due(time) {
            if deadline > self.now.get() {
                self.now.set(deadline);
            }
            task();
            self.run();
        }
        if time > self.now.get() {
            self.now.set(time);
        }
        self.run();
    }

    /// Fire every pending timer, advancing the clock as far as needed.
    pub fn run_to_end(&self) {
        self.run();
        while let Some(deadline) = self.dispatch.next_deadline() {
            self.advance_to(deadline);
        }
    }

    /// Number of queued tasks and timers.
    pub fn pending(&self) -> usize {
        self.dispatch.pending_tasks() + self.futures.borrow().len()
    }

    fn poll_futures(&self) -> bool {
        let mut futures = std::mem::take(&mut *self.futures.borrow_mut());
        futures.extend(self.dispatch.take_incoming());
        let mut cx = Context::from_waker(noop_waker_ref());
        let mut progressed = false;
        while let Poll::Ready(Some(())) = futures.poll_next_unpin(&mut cx) {
            progressed = true;
        }
        *self.futures.borrow_mut() = futures;
        progressed
    }
}

impl Scheduler for TestScheduler {
    fn asap(&self, task: Task) -> Cancel {
        self.dispatch.asap(task)
    }

    fn after(&self, delay: Duration, task: Task) -> Cancel {
        self.dispatch.at(self.now.get().saturating_add(delay), task)
    }

    fn spawn(&self, future: LocalBoxFuture<'static, ()>) -> Cancel {
        self.dispatch.spawn(future)
    }

    fn now(&self) -> Duration {
        self.now.get()
    }

    fn drive(&self) -> LocalBoxFuture<'static, ()> {
        let scheduler = self.clone();
        async move { scheduler.run_to_end() }.boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_task(log: &Rc<RefCell<Vec<String>>>, scheduler: &TestScheduler, name: &str) -> Task {
        let log = log.clone();
        let scheduler = scheduler.clone();
        let name = name.to_string();
        Box::new(move || {
            log.borrow_mut()
                .push(format!("{}@{}", name, scheduler.now().as_millis()))
        })
    }

    #[test]
    fn test_nothing_runs_until_driven() {
        let scheduler = TestScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        scheduler.asap(log_task(&log, &scheduler, "a"));
        assert!(log.borrow().is_empty());
        scheduler.run();
        assert_eq!(*log.borrow(), vec!["a@0"]);
    }

    #[test]
    fn test_timers_fire_at_their_deadline() {
        let scheduler = TestScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        scheduler.after(Duration::from_millis(30), log_task(&log, &scheduler, "late"));
        scheduler.after(Duration::from_millis(10), log_task(&log, &scheduler, "early"));

        scheduler.advance_by(Duration::from_millis(9));
        assert!(log.borrow().is_empty());

        scheduler.advance_by(Duration::from_millis(100));
        assert_eq!(*log.borrow(), vec!["early@10", "late@30"]);
        assert_eq!(scheduler.now(), Duration::from_millis(109));
    }

    #[test]
    fn test_asap_queue_drains_between_timers() {
        let scheduler = TestScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let inner_log = log.clone();
        let inner = scheduler.clone();
        scheduler.after(
            Duration::from_millis(5),
            Box::new(move || {
                inner_log.borrow_mut().push("t1".to_string());
                let log = inner_log.clone();
                inner.asap(Box::new(move || log.borrow_mut().push("micro".to_string())));
            }),
        );
        let log2 = log.clone();
        scheduler.after(
            Duration::from_millis(5),
            Box::new(move || log2.borrow_mut().push("t2".to_string())),
        );
        scheduler.run_to_end();
        assert_eq!(*log.borrow(), vec!["t1", "micro", "t2"]);
    }

    #[test]
    fn test_far_deadlines_saturate() {
        let scheduler = TestScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        scheduler.advance_by(Duration::from_millis(1));
        scheduler.after(Duration::MAX, log_task(&log, &scheduler, "never"));

        scheduler.advance_by(Duration::from_secs(3600));
        assert!(log.borrow().is_empty());

        scheduler.advance_by(Duration::MAX);
        assert_eq!(scheduler.now(), Duration::MAX);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let scheduler = TestScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let cancel = scheduler.after(Duration::from_millis(10), log_task(&log, &scheduler, "x"));
        cancel.cancel();
        scheduler.run_to_end();
        assert!(log.borrow().is_empty());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_spawned_future_completes_on_run() {
        let scheduler = TestScheduler::new();
        let done = Rc::new(Cell::new(false));
        let flag = done.clone();
        scheduler.spawn(async move { flag.set(true) }.boxed_local());
        assert!(!done.get());
        scheduler.run();
        assert!(done.get());
    }

    #[test]
    fn test_cancelled_future_is_dropped() {
        let scheduler = TestScheduler::new();
        let done = Rc::new(Cell::new(false));
        let flag = done.clone();
        let cancel = scheduler.spawn(async move { flag.set(true) }.boxed_local());
        cancel.cancel();
        scheduler.run();
        assert!(!done.get());
    }
}
