//! Scheduling primitives.
//!
//! A [`Scheduler`] turns the logical requests made by effect nodes ("run this
//! soon", "run this after a delay", "poll this future") into real dispatch.
//! Every request returns a [`Cancel`] that prevents the work from running if
//! invoked first.
//!
//! Two implementations share one queue:
//!
//! - [`DefaultScheduler`] runs against tokio's clock and timers.
//! - [`TestScheduler`] keeps virtual time that only moves when a test
//!   advances it.
//!
//! Ordering guarantees are the same for both: `asap` tasks run in
//! submission order, timers never fire before their deadline, timers with
//! the same deadline fire in submission order, and the `asap` queue is
//! drained after every timer task.

mod local;
mod queue;
mod virtual_time;

use std::time::Duration;

use futures::future::LocalBoxFuture;

use crate::cancel::Cancel;

pub use local::DefaultScheduler;
pub use virtual_time::TestScheduler;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// The dispatch abstraction every runtime owns.
pub trait Scheduler {
    /// Schedule `task` for the next execution opportunity.
    fn asap(&self, task: Task) -> Cancel;

    /// Schedule `task` to run no earlier than `delay` from now.
    fn after(&self, delay: Duration, task: Task) -> Cancel;

    /// Poll `future` to completion alongside queued tasks.
    ///
    /// Cancelling the handle drops the future.
    fn spawn(&self, future: LocalBoxFuture<'static, ()>) -> Cancel;

    /// Time elapsed since the scheduler was created.
    fn now(&self) -> Duration;

    /// A future that runs queued work until nothing is left.
    fn drive(&self) -> LocalBoxFuture<'static, ()>;
}
