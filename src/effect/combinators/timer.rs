//! Timer - the timing source behind `timeout` and `delay`.

use std::marker::PhantomData;
use std::time::Duration;

use crate::cancel::Cancel;
use crate::effect::settle::Settle;
use crate::effect::trait_def::{Effect, Reject, Resolve};
use crate::runtime::Runtime;

/// Resolves with a fixed value once `duration` has elapsed.
///
/// Scheduled directly on the scheduler's `after` primitive. Cancelling
/// before the deadline removes the timer.
pub struct Timer<A, E, R> {
    value: A,
    duration: Duration,
    _phantom: PhantomData<fn(R) -> E>,
}

impl<A: std::fmt::Debug, E, R> std::fmt::Debug for Timer<A, E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("value", &self.value)
            .field("duration", &self.duration)
            .finish()
    }
}

impl<A, E, R> Timer<A, E, R> {
    /// Create a new Timer effect.
    pub fn new(value: A, duration: Duration) -> Self {
        Timer {
            value,
            duration,
            _phantom: PhantomData,
        }
    }

    /// How long the timer waits.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl<A, E, R> Effect for Timer<A, E, R>
where
    A: Clone + 'static,
    E: 'static,
    R: Clone + 'static,
{
    type Output = A;
    type Error = E;
    type Env = R;

    fn fork(&self, _env: R, reject: Reject<E>, resolve: Resolve<A>, runtime: &Runtime) -> Cancel {
        let settle = Settle::new(reject, resolve);
        let value = self.value.clone();
        let timer = {
            let settle = settle.clone();
            runtime.scheduler().after(
                self.duration,
                Box::new(move || {
                    settle.resolve(value);
                }),
            )
        };
        Cancel::new(move || {
            if settle.cancel() {
                timer.cancel();
            }
        })
    }
}
