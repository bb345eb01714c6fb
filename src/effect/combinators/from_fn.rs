//! Leaves wrapping user functions: `FromFn`, `Lift` and `Encased`.

use std::marker::PhantomData;
use std::rc::Rc;

use crate::cancel::{Cancel, IntoCancel};
use crate::effect::leaf::dispatch;
use crate::effect::settle::Settle;
use crate::effect::trait_def::{Effect, Reject, Resolve};
use crate::runtime::Runtime;

/// A leaf built from a raw fork function.
///
/// The function receives the environment, the fork's [`Settle`] and the
/// runtime, and may return a [`Cancel`] (or `()`) that aborts whatever it
/// started.
pub struct FromFn<F, R, E, A> {
    f: Rc<F>,
    _phantom: PhantomData<fn(R) -> (E, A)>,
}

impl<F, R, E, A> std::fmt::Debug for FromFn<F, R, E, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FromFn")
            .field("f", &"<function>")
            .finish()
    }
}

impl<F, R, E, A> Clone for FromFn<F, R, E, A> {
    fn clone(&self) -> Self {
        FromFn {
            f: Rc::clone(&self.f),
            _phantom: PhantomData,
        }
    }
}

impl<F, R, E, A> FromFn<F, R, E, A> {
    /// Create a new FromFn effect.
    pub fn new(f: F) -> Self {
        FromFn {
            f: Rc::new(f),
            _phantom: PhantomData,
        }
    }
}

impl<F, C, R, E, A> Effect for FromFn<F, R, E, A>
where
    F: Fn(R, Settle<E, A>, &Runtime) -> C + 'static,
    C: IntoCancel,
    R: Clone + 'static,
    E: 'static,
    A: 'static,
{
    type Output = A;
    type Error = E;
    type Env = R;

    fn fork(&self, env: R, reject: Reject<E>, resolve: Resolve<A>, runtime: &Runtime) -> Cancel {
        let f = Rc::clone(&self.f);
        dispatch(runtime, reject, resolve, move |settle, runtime| {
            f(env, settle, runtime).into_cancel()
        })
    }
}

/// A leaf running a fallible thunk on every fork.
pub struct Lift<G, R> {
    thunk: Rc<G>,
    _phantom: PhantomData<fn(R)>,
}

impl<G, R> std::fmt::Debug for Lift<G, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lift")
            .field("thunk", &"<function>")
            .finish()
    }
}

impl<G, R> Lift<G, R> {
    /// Create a new Lift effect.
    pub fn new(thunk: G) -> Self {
        Lift {
            thunk: Rc::new(thunk),
            _phantom: PhantomData,
        }
    }
}

impl<G, A, E, R> Effect for Lift<G, R>
where
    G: Fn() -> Result<A, E> + 'static,
    A: 'static,
    E: 'static,
    R: Clone + 'static,
{
    type Output = A;
    type Error = E;
    type Env = R;

    fn fork(&self, _env: R, reject: Reject<E>, resolve: Resolve<A>, runtime: &Runtime) -> Cancel {
        let thunk = Rc::clone(&self.thunk);
        dispatch(runtime, reject, resolve, move |settle, _| {
            settle.complete(thunk());
            Cancel::noop()
        })
    }
}

/// A fallible function applied to a captured argument.
///
/// Produced by the function [`encase`](crate::encase) returns.
pub struct Encased<F, T, R> {
    f: Rc<F>,
    arg: T,
    _phantom: PhantomData<fn(R)>,
}

impl<F, T: std::fmt::Debug, R> std::fmt::Debug for Encased<F, T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encased")
            .field("f", &"<function>")
            .field("arg", &self.arg)
            .finish()
    }
}

impl<F, T, R> Encased<F, T, R> {
    pub(crate) fn new(f: Rc<F>, arg: T) -> Self {
        Encased {
            f,
            arg,
            _phantom: PhantomData,
        }
    }
}

impl<F, T, A, E, R> Effect for Encased<F, T, R>
where
    F: Fn(T) -> Result<A, E> + 'static,
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
        dispatch(runtime, reject, resolve, move |settle, _| {
            settle.complete(f(arg));
            Cancel::noop()
        })
    }
}
