//! Constant leaves: `Of`, `Rejected` and `Never`.

use std::marker::PhantomData;

use crate::cancel::Cancel;
use crate::effect::leaf::dispatch;
use crate::effect::trait_def::{Effect, Reject, Resolve};
use crate::runtime::Runtime;

/// Resolves with a fixed value on every fork.
///
/// The value is cloned once per fork.
pub struct Of<A, E, R> {
    value: A,
    _phantom: PhantomData<fn(R) -> E>,
}

impl<A: std::fmt::Debug, E, R> std::fmt::Debug for Of<A, E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Of").field("value", &self.value).finish()
    }
}

impl<A: Clone, E, R> Clone for Of<A, E, R> {
    fn clone(&self) -> Self {
        Of::new(self.value.clone())
    }
}

impl<A, E, R> Of<A, E, R> {
    /// Create a new Of effect.
    pub fn new(value: A) -> Self {
        Of {
            value,
            _phantom: PhantomData,
        }
    }
}

impl<A, E, R> Effect for Of<A, E, R>
where
    A: Clone + 'static,
    E: 'static,
    R: Clone + 'static,
{
    type Output = A;
    type Error = E;
    type Env = R;

    fn fork(&self, _env: R, reject: Reject<E>, resolve: Resolve<A>, runtime: &Runtime) -> Cancel {
        let value = self.value.clone();
        dispatch(runtime, reject, resolve, move |settle, _| {
            settle.resolve(value);
            Cancel::noop()
        })
    }
}

/// Rejects with a fixed error on every fork.
pub struct Rejected<A, E, R> {
    error: E,
    _phantom: PhantomData<fn(R) -> A>,
}

impl<A, E: std::fmt::Debug, R> std::fmt::Debug for Rejected<A, E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .finish()
    }
}

impl<A, E, R> Rejected<A, E, R> {
    /// Create a new Rejected effect.
    pub fn new(error: E) -> Self {
        Rejected {
            error,
            _phantom: PhantomData,
        }
    }
}

impl<A, E, R> Effect for Rejected<A, E, R>
where
    A: 'static,
    E: Clone + 'static,
    R: Clone + 'static,
{
    type Output = A;
    type Error = E;
    type Env = R;

    fn fork(&self, _env: R, reject: Reject<E>, resolve: Resolve<A>, runtime: &Runtime) -> Cancel {
        let error = self.error.clone();
        dispatch(runtime, reject, resolve, move |settle, _| {
            settle.reject(error);
            Cancel::noop()
        })
    }
}

/// Never settles.
pub struct Never<A, E, R> {
    _phantom: PhantomData<fn(R) -> (A, E)>,
}

impl<A, E, R> std::fmt::Debug for Never<A, E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Never").finish()
    }
}

impl<A, E, R> Default for Never<A, E, R> {
    fn default() -> Self {
        Never {
            _phantom: PhantomData,
        }
    }
}

impl<A, E, R> Effect for Never<A, E, R>
where
    A: 'static,
    E: 'static,
    R: Clone + 'static,
{
    type Output = A;
    type Error = E;
    type Env = R;

    fn fork(&self, _env: R, reject: Reject<E>, resolve: Resolve<A>, runtime: &Runtime) -> Cancel {
        dispatch(runtime, reject, resolve, |_, _| Cancel::noop())
    }
}
