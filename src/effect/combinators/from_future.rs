//! Leaves adapting futures: `EncasedFuture` and `AccessFuture`.
//!
//! The future is created when the leaf's body runs and is handed to the
//! scheduler's `spawn`. Its `Result` settles the fork; cancelling the fork
//! drops the future.

use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;

use futures::FutureExt;

use crate::cancel::Cancel;
use crate::cause::{Cause, Panic};
use crate::effect::leaf::dispatch;
use crate::effect::settle::Settle;
use crate::effect::trait_def::{Effect, Reject, Resolve};
use crate::runtime::Runtime;

fn spawn_settling<Fut, A, E>(runtime: &Runtime, settle: Settle<E, A>, future: Fut) -> Cancel
where
    Fut: Future<Output = Result<A, E>> + 'static,
    A: 'static,
    E: 'static,
{
    runtime.scheduler().spawn(
        async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(result) => {
                    settle.complete(result);
                }
                Err(payload) => {
                    settle.fail(Cause::Panic(Panic::from_payload(payload)));
                }
            }
        }
        .boxed_local(),
    )
}

/// An async function applied to a captured argument.
///
/// Produced by the function [`encase_p`](crate::encase_p) returns.
pub struct EncasedFuture<F, T, R> {
    f: Rc<F>,
    arg: T,
    _phantom: PhantomData<fn(R)>,
}

impl<F, T: std::fmt::Debug, R> std::fmt::Debug for EncasedFuture<F, T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncasedFuture")
            .field("f", &"<async function>")
            .field("arg", &self.arg)
            .finish()
    }
}

impl<F, T, R> EncasedFuture<F, T, R> {
    pub(crate) fn new(f: Rc<F>, arg: T) -> Self {
        EncasedFuture {
            f,
            arg,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut, T, A, E, R> Effect for EncasedFuture<F, T, R>
where
    F: Fn(T) -> Fut + 'static,
    Fut: Future<Output = Result<A, E>> + 'static,
    T: Clone + 'static,
    A: 'static,
    E: 'static,
    R: Clone + 'static,
{
    type Output = A;
    type Error = E;
    type Env = R;

    fn fork(&self, _env: R, reject: Reject<E>, resolve: Resolve<A>, runtime: &Runtime) -> Cancel {
        let f = Rc::clone(&self.f);
        let arg = self.arg.clone();
        dispatch(runtime, reject, resolve, move |settle, runtime| {
            spawn_settling(runtime, settle, f(arg))
        })
    }
}

/// Reads the environment and awaits the future built from it.
pub struct AccessFuture<F, R> {
    f: Rc<F>,
    _phantom: PhantomData<fn(R)>,
}

impl<F, R> std::fmt::Debug for AccessFuture<F, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessFuture")
            .field("f", &"<async function>")
            .finish()
    }
}

impl<F, R> AccessFuture<F, R> {
    /// Create a new AccessFuture effect.
    pub fn new(f: F) -> Self {
        AccessFuture {
            f: Rc::new(f),
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut, A, E, R> Effect for AccessFuture<F, R>
where
    F: Fn(R) -> Fut + 'static,
    Fut: Future<Output = Result<A, E>> + 'static,
    A: 'static,
    E: 'static,
    R: Clone + 'static,
{
    type Output = A;
    type Error = E;
    type Env = R;

    fn fork(&self, env: R, reject: Reject<E>, resolve: Resolve<A>, runtime: &Runtime) -> Cancel {
        let f = Rc::clone(&self.f);
        dispatch(runtime, reject, resolve, move |settle, runtime| {
            spawn_settling(runtime, settle, f(env))
        })
    }
}
