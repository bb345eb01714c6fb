//! Free-standing constructors.
//!
//! These functions build the leaves of an effect tree. Type parameters
//! follow the order output, error, environment wherever they appear, so a
//! turbofish like `of::<_, String, ()>(1)` pins the error and environment.

use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use crate::cancel::IntoCancel;
use crate::effect::combinators::{
    AccessFuture, Chain, Encased, EncasedFuture, FromFn, Lift, Map, Never, Of, Rejected, Timer,
};
use crate::effect::reader::Ask;
use crate::effect::settle::Settle;
use crate::effect::trait_def::Effect;
use crate::runtime::Runtime;

/// Resolve with `value`.
pub fn of<A, E, R>(value: A) -> Of<A, E, R>
where
    A: Clone + 'static,
{
    Of::new(value)
}

/// Reject with `error`.
pub fn reject<A, E, R>(error: E) -> Rejected<A, E, R>
where
    E: Clone + 'static,
{
    Rejected::new(error)
}

/// Never settle. Cancelling is the only way out.
pub fn never<A, E, R>() -> Never<A, E, R> {
    Never::default()
}

/// Build a leaf from a raw fork function.
///
/// The function runs on the scheduler's next tick. It settles the fork
/// through the [`Settle`] it receives and may return a [`Cancel`] (or `()`)
/// for whatever it started.
///
/// [`Cancel`]: crate::Cancel
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use undertow::prelude::*;
/// use undertow::testing::test_runtime;
///
/// // A timer built by hand.
/// let effect = from_fn(|_: (), settle: Settle<String, &str>, runtime: &Runtime| {
///     runtime
///         .scheduler()
///         .after(Duration::from_millis(10), Box::new(move || {
///             settle.resolve("tick");
///         }))
/// });
///
/// let (runtime, scheduler) = test_runtime();
/// let fiber = runtime.fork(&effect, ());
/// scheduler.advance_by(Duration::from_millis(10));
/// assert_eq!(fiber.poll_outcome(), Some(Ok("tick")));
/// ```
pub fn from_fn<F, C, R, E, A>(f: F) -> FromFn<F, R, E, A>
where
    F: Fn(R, Settle<E, A>, &Runtime) -> C + 'static,
    C: IntoCancel,
{
    FromFn::new(f)
}

/// Resolve with the environment.
pub fn environment<R, E>() -> Ask<R, E>
where
    R: Clone + 'static,
{
    Ask::default()
}

/// Resolve with a value computed from the environment.
pub fn access<R, A, E, F>(f: F) -> Map<Ask<R, E>, F>
where
    R: Clone + 'static,
    E: 'static,
    F: Fn(R) -> A + 'static,
{
    Map {
        inner: Ask::default(),
        f: Rc::new(f),
    }
}

/// Run the effect selected by the environment.
pub fn access_m<R, F, Next>(f: F) -> Chain<Ask<R, Next::Error>, F>
where
    R: Clone + 'static,
    F: Fn(R) -> Next + 'static,
    Next: Effect<Env = R>,
{
    Chain {
        inner: Ask::default(),
        f: Rc::new(f),
    }
}

/// Await the future built from the environment.
///
/// `Ok` resolves, `Err` rejects. The future is dropped if the fork is
/// cancelled.
pub fn access_p<R, F, Fut, A, E>(f: F) -> AccessFuture<F, R>
where
    R: Clone + 'static,
    F: Fn(R) -> Fut + 'static,
    Fut: Future<Output = Result<A, E>> + 'static,
{
    AccessFuture::new(f)
}

/// Lift a fallible function into one returning effects.
///
/// # Example
///
/// ```rust
/// use undertow::prelude::*;
/// use undertow::testing::test_runtime;
///
/// let parse = encase::<_, _, _, _, ()>(|s: &'static str| s.parse::<i32>());
///
/// let (runtime, scheduler) = test_runtime();
/// let ok = runtime.fork(&parse("42"), ());
/// let bad = runtime.fork(&parse("forty-two"), ());
/// scheduler.run();
/// assert_eq!(ok.poll_outcome(), Some(Ok(42)));
/// assert!(matches!(bad.poll_outcome(), Some(Err(RunError::Rejected(_)))));
/// ```
pub fn encase<F, T, A, E, R>(f: F) -> impl Fn(T) -> Encased<F, T, R>
where
    F: Fn(T) -> Result<A, E> + 'static,
    T: Clone + 'static,
{
    let f = Rc::new(f);
    move |arg| Encased::new(Rc::clone(&f), arg)
}

/// Lift an async fallible function into one returning effects.
pub fn encase_p<F, Fut, T, A, E, R>(f: F) -> impl Fn(T) -> EncasedFuture<F, T, R>
where
    F: Fn(T) -> Fut + 'static,
    Fut: Future<Output = Result<A, E>> + 'static,
    T: Clone + 'static,
{
    let f = Rc::new(f);
    move |arg| EncasedFuture::new(Rc::clone(&f), arg)
}

/// Run a fallible thunk on every fork.
pub fn lift<G, A, E, R>(thunk: G) -> Lift<G, R>
where
    G: Fn() -> Result<A, E> + 'static,
{
    Lift::new(thunk)
}

/// Resolve with `value` after `duration`.
pub fn timeout<A, E, R>(value: A, duration: Duration) -> Timer<A, E, R>
where
    A: Clone + 'static,
{
    Timer::new(value, duration)
}
