//! The runtime - forks effects onto a scheduler.
//!
//! A [`Runtime`] pairs a [`Scheduler`] with a [`RuntimeConfig`]. It is a
//! cheap, clonable handle; every node receives it during `fork` and uses it
//! to reach the scheduler. There is no global runtime: build one with
//! [`default_runtime`], [`Runtime::builder`] or
//! [`testing::test_runtime`](crate::testing::test_runtime).

mod config;
mod fiber;

use std::rc::Rc;

use crate::cancel::Cancel;
use crate::cause::{Cause, RunError};
use crate::effect::Effect;
use crate::scheduler::{DefaultScheduler, Scheduler};

pub use config::{RuntimeBuilder, RuntimeConfig, UnhandledRejection};
pub use fiber::Fiber;

use fiber::FiberSlot;

struct Inner {
    scheduler: Rc<dyn Scheduler>,
    config: RuntimeConfig,
}

/// Handle to a scheduler plus configuration.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<Inner>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .finish()
    }
}

/// A fresh runtime on a [`DefaultScheduler`] with default configuration.
pub fn default_runtime() -> Runtime {
    Runtime::new(DefaultScheduler::new())
}

impl Runtime {
    /// Create a runtime with default configuration on `scheduler`.
    pub fn new(scheduler: impl Scheduler + 'static) -> Self {
        Self::from_parts(Rc::new(scheduler), RuntimeConfig::default())
    }

    /// Start configuring a runtime.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    pub(crate) fn from_parts(scheduler: Rc<dyn Scheduler>, config: RuntimeConfig) -> Self {
        Runtime {
            inner: Rc::new(Inner { scheduler, config }),
        }
    }

    /// The scheduler every fork dispatches through.
    pub fn scheduler(&self) -> &dyn Scheduler {
        &*self.inner.scheduler
    }

    /// Configuration this runtime was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Fork `effect` with the given callbacks.
    ///
    /// Nothing runs until the scheduler is driven.
    pub fn execute<Eff, Rj, Rs>(
        &self,
        effect: &Eff,
        env: Eff::Env,
        on_reject: Rj,
        on_resolve: Rs,
    ) -> Cancel
    where
        Eff: Effect + ?Sized,
        Rj: FnOnce(Cause<Eff::Error>) + 'static,
        Rs: FnOnce(Eff::Output) + 'static,
    {
        tracing::trace!(runtime = %self.inner.config.name, "forking effect");
        effect.fork(env, Box::new(on_reject), Box::new(on_resolve), self)
    }

    /// Fork `effect` and discard its value.
    ///
    /// Rejections are handled according to
    /// [`RuntimeConfig::unhandled`].
    pub fn unsafe_execute<Eff>(&self, effect: &Eff, env: Eff::Env) -> Cancel
    where
        Eff: Effect + ?Sized,
        Eff::Error: std::fmt::Debug,
    {
        let policy = self.inner.config.unhandled;
        let name = self.inner.config.name.clone();
        self.execute(
            effect,
            env,
            move |cause| match (policy, cause) {
                (UnhandledRejection::Ignore, _) => {}
                (UnhandledRejection::Log, Cause::Fail(error)) => {
                    tracing::warn!(runtime = %name, ?error, "unhandled rejection");
                }
                (UnhandledRejection::Log, Cause::Panic(panic)) => {
                    tracing::warn!(runtime = %name, %panic, "unhandled panic");
                }
            },
            |_| {},
        )
    }

    /// Fork `effect` and track it with a [`Fiber`].
    pub fn fork<Eff>(&self, effect: &Eff, env: Eff::Env) -> Fiber<Eff::Output, Eff::Error>
    where
        Eff: Effect + ?Sized,
    {
        let slot = FiberSlot::new();
        let cancel = self.execute(effect, env, slot.reject_handle(), slot.resolve_handle());
        slot.into_fiber(cancel)
    }

    /// Fork `effect`, drive the scheduler until it has no work left, and
    /// return the outcome.
    ///
    /// Yields [`RunError::Stalled`] when the scheduler goes idle with the
    /// effect still pending.
    pub async fn run<Eff>(
        &self,
        effect: &Eff,
        env: Eff::Env,
    ) -> Result<Eff::Output, RunError<Eff::Error>>
    where
        Eff: Effect + ?Sized,
    {
        let fiber = self.fork(effect, env);
        self.scheduler().drive().await;
        fiber.poll_outcome().unwrap_or(Err(RunError::Stalled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use crate::testing::test_runtime;
    use std::cell::RefCell;
    use tracing_test::traced_test;

    #[test]
    fn test_execute_delivers_through_callbacks() {
        let (runtime, scheduler) = test_runtime();
        let seen = Rc::new(RefCell::new(None));
        let slot = seen.clone();
        runtime.execute(
            &of::<_, String, ()>(3),
            (),
            |_| panic!("should not reject"),
            move |v| *slot.borrow_mut() = Some(v),
        );
        assert_eq!(*seen.borrow(), None);
        scheduler.run();
        assert_eq!(*seen.borrow(), Some(3));
    }

    #[traced_test]
    #[test]
    fn test_panicking_callback_is_not_absorbed() {
        let (runtime, scheduler) = test_runtime();
        let reached = Rc::new(std::cell::Cell::new(false));
        let flag = reached.clone();
        runtime.execute(
            &of::<_, String, ()>(1),
            (),
            |_| {},
            move |_| {
                flag.set(true);
                panic!("assertion in resolve callback failed");
            },
        );

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| scheduler.run()));

        assert!(reached.get());
        let payload = outcome.expect_err("panic should reach the driver");
        assert_eq!(
            payload.downcast_ref::<String>().map(String::as_str),
            Some("assertion in resolve callback failed")
        );
        assert!(logs_contain("panic after the fork settled"));
    }

    #[test]
    fn test_fiber_cancel_marks_cancelled() {
        let (runtime, scheduler) = test_runtime();
        let fiber = runtime.fork(&never::<i32, String, ()>(), ());
        scheduler.run();
        assert_eq!(fiber.status(), Status::Forked);
        fiber.cancel();
        fiber.cancel();
        assert_eq!(fiber.status(), Status::Cancelled);
        assert_eq!(fiber.poll_outcome(), Some(Err(RunError::Cancelled)));
    }

    #[test]
    fn test_cancel_after_resolve_keeps_value() {
        let (runtime, scheduler) = test_runtime();
        let fiber = runtime.fork(&of::<_, String, ()>(1), ());
        scheduler.run();
        fiber.cancel();
        assert_eq!(fiber.status(), Status::Resolved);
        assert_eq!(fiber.poll_outcome(), Some(Ok(1)));
    }

    #[test]
    fn test_run_reports_stalled_effect() {
        let (runtime, _scheduler) = test_runtime();
        let outcome = tokio_test::block_on(runtime.run(&never::<i32, String, ()>(), ()));
        assert_eq!(outcome, Err(RunError::Stalled));
    }

    #[traced_test]
    #[test]
    fn test_unhandled_rejection_is_logged() {
        let (runtime, scheduler) = test_runtime();
        runtime.unsafe_execute(&reject::<(), _, ()>("disk full"), ());
        scheduler.run();
        assert!(logs_contain("unhandled rejection"));
        assert!(logs_contain("disk full"));
    }

    #[traced_test]
    #[test]
    fn test_ignored_rejection_is_silent() {
        let scheduler = crate::TestScheduler::new();
        let runtime = Runtime::builder()
            .unhandled(UnhandledRejection::Ignore)
            .scheduler(scheduler.clone())
            .build();
        runtime.unsafe_execute(&reject::<(), _, ()>("disk full"), ());
        scheduler.run();
        assert!(!logs_contain("unhandled rejection"));
    }
}
