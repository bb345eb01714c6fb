//! Wall-clock scheduler backed by tokio timers.

use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::sync::Notify;
use tokio::time::Instant;

use super::queue::Dispatch;
use super::{Scheduler, Task};
use crate::cancel::Cancel;

/// The production scheduler.
///
/// Work queued on it runs when [`run_until_idle`](Self::run_until_idle)
/// (or [`Scheduler::drive`]) is awaited inside a tokio runtime. The driver
/// sleeps on `tokio::time::sleep_until` between timers and wakes early when
/// new work is queued or a spawned future makes progress. It returns once
/// no task, timer or spawned future is left.
///
/// The driver future is `!Send`; run it with a current-thread runtime or a
/// `LocalSet`.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let runtime = default_runtime();
/// let effect = of::<_, String, ()>(21)
///     .delay(Duration::from_millis(5))
///     .map(|x| x * 2);
///
/// assert_eq!(runtime.run(&effect, ()).await, Ok(42));
/// # });
/// ```
#[derive(Clone)]
pub struct DefaultScheduler {
    dispatch: Rc<Dispatch>,
    origin: Instant,
    wake: Rc<Notify>,
}

impl std::fmt::Debug for DefaultScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultScheduler")
            .field("elapsed", &self.origin.elapsed())
            .field("pending", &self.dispatch.pending_tasks())
            .finish()
    }
}

impl Default for DefaultScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultScheduler {
    /// Create a scheduler whose clock starts now.
    pub fn new() -> Self {
        DefaultScheduler {
            dispatch: Rc::new(Dispatch::default()),
            origin: Instant::now(),
            wake: Rc::new(Notify::new()),
        }
    }

    /// Run queued work until nothing is left.
    pub async fn run_until_idle(&self) {
        let mut futures = FuturesUnordered::<LocalBoxFuture<'static, ()>>::new();
        loop {
            self.dispatch.run_ready();
            let now = self.now();
            while let Some((_, task)) = self.dispatch.pop_due(now) {
                task();
                self.dispatch.run_ready();
            }
            futures.extend(self.dispatch.take_incoming());
            if self.dispatch.has_ready() {
                continue;
            }

            let deadline = self.dispatch.next_deadline();
            if futures.is_empty() && deadline.is_none() {
                tracing::trace!("scheduler idle");
                return;
            }

            // A deadline past the end of `Instant` never fires.
            let wake_at = deadline.and_then(|deadline| self.origin.checked_add(deadline));
            let sleep = async {
                match wake_at {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::select! {
                Some(()) = futures.next(), if !futures.is_empty() => {}
                _ = sleep => {}
                _ = self.wake.notified() => {}
            }
        }
    }
}

impl Scheduler for DefaultScheduler {
    fn asap(&self, task: Task) -> Cancel {
        let cancel = self.dispatch.asap(task);
        self.wake.notify_one();
        cancel
    }

    fn after(&self, delay: Duration, task: Task) -> Cancel {
        let cancel = self.dispatch.at(self.now().saturating_add(delay), task);
        self.wake.notify_one();
        cancel
    }

    fn spawn(&self, future: LocalBoxFuture<'static, ()>) -> Cancel {
        let cancel = self.dispatch.spawn(future);
        self.wake.notify_one();
        cancel
    }

    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn drive(&self) -> LocalBoxFuture<'static, ()> {
        let scheduler = self.clone();
        async move { scheduler.run_until_idle().await }.boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[tokio::test]
    async fn test_runs_asap_before_timers() {
        let scheduler = DefaultScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = log.clone();
        scheduler.after(
            Duration::from_millis(5),
            Box::new(move || l1.borrow_mut().push("timer")),
        );
        let l2 = log.clone();
        scheduler.asap(Box::new(move || l2.borrow_mut().push("asap")));

        scheduler.run_until_idle().await;
        assert_eq!(*log.borrow(), vec!["asap", "timer"]);
    }

    #[tokio::test]
    async fn test_timer_waits_for_deadline() {
        let scheduler = DefaultScheduler::new();
        let fired_at = Rc::new(RefCell::new(None));
        let slot = fired_at.clone();
        let clock = scheduler.clone();
        scheduler.after(
            Duration::from_millis(20),
            Box::new(move || *slot.borrow_mut() = Some(clock.now())),
        );

        scheduler.run_until_idle().await;
        let fired_at = fired_at.borrow().expect("timer should fire");
        assert!(fired_at >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_cancelled_far_timer_does_not_overflow() {
        let scheduler = DefaultScheduler::new();
        let fired = Rc::new(RefCell::new(false));
        let flag = fired.clone();
        let cancel = scheduler.after(Duration::MAX, Box::new(move || *flag.borrow_mut() = true));
        scheduler.spawn(
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                cancel.cancel();
            }
            .boxed_local(),
        );

        scheduler.run_until_idle().await;
        assert!(!*fired.borrow());
        assert_eq!(scheduler.dispatch.pending_tasks(), 0);
    }

    #[tokio::test]
    async fn test_idle_scheduler_returns_immediately() {
        let scheduler = DefaultScheduler::new();
        scheduler.run_until_idle().await;
        assert_eq!(scheduler.dispatch.pending_tasks(), 0);
    }

    #[tokio::test]
    async fn test_polls_spawned_futures() {
        let scheduler = DefaultScheduler::new();
        let done = Rc::new(RefCell::new(false));
        let flag = done.clone();
        scheduler.spawn(
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                *flag.borrow_mut() = true;
            }
            .boxed_local(),
        );
        scheduler.run_until_idle().await;
        assert!(*done.borrow());
    }
}
