//! Extension trait providing combinator methods for all effects.
//!
//! `EffectExt` is implemented for every [`Effect`]. Each method wraps the
//! receiver in a new node; nothing runs until the result is forked.

use std::marker::PhantomData;
use std::rc::Rc;
use std::time::Duration;

use crate::cause::Cause;
use crate::effect::boxed::BoxedEffect;
use crate::effect::combinators::{
    pair, And, Catch, Chain, Map, MapErr, OnCause, OnFail, Once, Race, Retry, Timer, TryMap, Zip,
    ZipWith,
};
use crate::effect::reader::{Local, Provide};
use crate::effect::tracing::Instrument;
use crate::effect::trait_def::Effect;
use crate::retry::{RetryPolicy, TimeoutError};
use crate::runtime::{Fiber, Runtime};

/// Combinator methods available on every effect.
///
/// # Example
///
/// ```rust
/// use undertow::prelude::*;
/// use undertow::testing::test_runtime;
///
/// let effect = of::<_, String, ()>(21)
///     .map(|x| x * 2)
///     .chain(|x| of(x + 1))
///     .map_err(|e| format!("failed: {}", e));
///
/// let (runtime, scheduler) = test_runtime();
/// let fiber = runtime.fork(&effect, ());
/// scheduler.run();
/// assert_eq!(fiber.poll_outcome(), Some(Ok(43)));
/// ```
pub trait EffectExt: Effect + Sized {
    /// Transform the resolved value.
    fn map<F, B>(self, f: F) -> Map<Self, F>
    where
        F: Fn(Self::Output) -> B + 'static,
        B: 'static,
    {
        Map {
            inner: self,
            f: Rc::new(f),
        }
    }

    /// Transform the resolved value with a function that may fail.
    fn try_map<F, B>(self, f: F) -> TryMap<Self, F>
    where
        F: Fn(Self::Output) -> Result<B, Self::Error> + 'static,
        B: 'static,
    {
        TryMap {
            inner: self,
            f: Rc::new(f),
        }
    }

    /// Transform the typed error.
    fn map_err<F, E2>(self, f: F) -> MapErr<Self, F>
    where
        F: Fn(Self::Error) -> E2 + 'static,
        E2: 'static,
    {
        MapErr {
            inner: self,
            f: Rc::new(f),
        }
    }

    /// Continue with the effect built from the resolved value.
    fn chain<F, Next>(self, f: F) -> Chain<Self, F>
    where
        F: Fn(Self::Output) -> Next + 'static,
        Next: Effect<Error = Self::Error, Env = Self::Env>,
    {
        Chain {
            inner: self,
            f: Rc::new(f),
        }
    }

    /// Run `other` after this effect resolves, keeping only its value.
    fn and<O>(self, other: O) -> And<Self, O>
    where
        O: Effect<Error = Self::Error, Env = Self::Env>,
    {
        And {
            first: self,
            second: Rc::new(other),
        }
    }

    /// Recover from a typed rejection. Panics pass through.
    fn catch<F, Next>(self, f: F) -> Catch<Self, OnFail<F>>
    where
        F: Fn(Self::Error) -> Next + 'static,
        Next: Effect<Output = Self::Output, Env = Self::Env>,
    {
        Catch {
            inner: self,
            handler: Rc::new(OnFail(f)),
        }
    }

    /// Recover from any rejection, panics included.
    fn catch_cause<F, Next>(self, f: F) -> Catch<Self, OnCause<F>>
    where
        F: Fn(Cause<Self::Error>) -> Next + 'static,
        Next: Effect<Output = Self::Output, Env = Self::Env>,
    {
        Catch {
            inner: self,
            handler: Rc::new(OnCause(f)),
        }
    }

    /// Settle with whichever of `self` and `other` settles first.
    fn race<O>(self, other: O) -> Race<Self, O>
    where
        O: Effect<Output = Self::Output, Error = Self::Error, Env = Self::Env>,
    {
        Race {
            left: self,
            right: other,
        }
    }

    /// Run both concurrently and resolve with both values.
    fn zip<O>(self, other: O) -> Zip<Self, O>
    where
        O: Effect<Error = Self::Error, Env = Self::Env>,
    {
        ZipWith {
            left: self,
            right: other,
            f: Rc::new(pair as fn(Self::Output, O::Output) -> (Self::Output, O::Output)),
        }
    }

    /// Run both concurrently and combine their values with `f`.
    fn zip_with<O, F, C>(self, other: O, f: F) -> ZipWith<Self, O, F>
    where
        O: Effect<Error = Self::Error, Env = Self::Env>,
        F: Fn(Self::Output, O::Output) -> C + 'static,
        C: 'static,
    {
        ZipWith {
            left: self,
            right: other,
            f: Rc::new(f),
        }
    }

    /// Run at most once and share the outcome with every fork.
    fn once(self) -> Once<Self>
    where
        Self::Output: Clone,
        Self::Error: Clone,
    {
        Once::new(self)
    }

    /// Supply the environment, leaving the outer one free.
    fn provide<R2>(self, env: Self::Env) -> Provide<Self, R2>
    where
        R2: Clone + 'static,
    {
        Provide {
            inner: self,
            env,
            _phantom: PhantomData,
        }
    }

    /// Derive the environment from an outer one.
    fn local<R2, F>(self, f: F) -> Local<Self, F, R2>
    where
        F: Fn(&R2) -> Self::Env + 'static,
        R2: Clone + 'static,
    {
        Local {
            inner: self,
            f: Rc::new(f),
            _phantom: PhantomData,
        }
    }

    /// Start after `duration` has elapsed.
    fn delay(
        self,
        duration: Duration,
    ) -> Chain<Timer<Rc<Self>, Self::Error, Self::Env>, fn(Rc<Self>) -> Rc<Self>> {
        Chain {
            inner: Timer::new(Rc::new(self), duration),
            f: Rc::new(std::convert::identity as fn(Rc<Self>) -> Rc<Self>),
        }
    }

    /// Reject with [`TimeoutError::Timeout`] unless settled within
    /// `duration`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use undertow::prelude::*;
    /// use undertow::testing::test_runtime;
    ///
    /// let slow = timeout::<_, String, ()>(1, Duration::from_secs(5))
    ///     .with_timeout(Duration::from_millis(100));
    ///
    /// let (runtime, scheduler) = test_runtime();
    /// let fiber = runtime.fork(&slow, ());
    /// scheduler.run_to_end();
    /// assert_eq!(
    ///     fiber.poll_outcome(),
    ///     Some(Err(RunError::Rejected(TimeoutError::Timeout(Duration::from_millis(100)))))
    /// );
    /// assert_eq!(scheduler.now(), Duration::from_millis(100));
    /// ```
    fn with_timeout(
        self,
        duration: Duration,
    ) -> impl Effect<Output = Self::Output, Error = TimeoutError<Self::Error>, Env = Self::Env>
    {
        let deadline = Timer::<(), TimeoutError<Self::Error>, Self::Env>::new((), duration)
            .try_map(move |()| Err::<Self::Output, _>(TimeoutError::Timeout(duration)));
        self.map_err(TimeoutError::Inner).race(deadline)
    }

    /// Re-fork after typed rejections as `policy` allows.
    fn retry(self, policy: RetryPolicy) -> Retry<Self> {
        Retry {
            inner: Rc::new(self),
            policy,
        }
    }

    /// Run inside `span`.
    fn instrument(self, span: tracing::Span) -> Instrument<Self> {
        Instrument { inner: self, span }
    }

    /// Erase the node type.
    fn boxed(self) -> BoxedEffect<Self::Output, Self::Error, Self::Env> {
        BoxedEffect::new(self)
    }

    /// Fork on `runtime` and return the fiber, which is also a future.
    fn to_future(&self, env: Self::Env, runtime: &Runtime) -> Fiber<Self::Output, Self::Error> {
        runtime.fork(self, env)
    }
}

impl<T: Effect> EffectExt for T {}
