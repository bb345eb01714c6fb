//! Bracket - acquire, use and always release a resource.
//!
//! Release runs exactly once on every exit path of the body: resolution,
//! rejection and cancellation. The body's outcome is delivered only after
//! release has finished. A failing release replaces a successful outcome;
//! when both fail, the body's rejection wins and the release failure is
//! logged. The release fork itself is never cancelled.

use std::cell::RefCell;
use std::rc::Rc;

use crate::cancel::{ActiveChild, Cancel};
use crate::cause::{guard, Cause};
use crate::effect::settle::Settle;
use crate::effect::trait_def::{Effect, Reject, Resolve};
use crate::runtime::Runtime;

/// Acquire a resource, use it, release it.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use undertow::prelude::*;
/// use undertow::testing::test_runtime;
///
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let (open_log, close_log) = (log.clone(), log.clone());
///
/// let effect = bracket(
///     lift::<_, _, String, ()>(move || {
///         open_log.borrow_mut().push("open");
///         Ok("handle")
///     }),
///     move |_handle| {
///         let log = close_log.clone();
///         lift(move || {
///             log.borrow_mut().push("close");
///             Ok(())
///         })
///     },
///     |handle| of(handle.len()),
/// );
///
/// let (runtime, scheduler) = test_runtime();
/// let fiber = runtime.fork(&effect, ());
/// scheduler.run();
/// assert_eq!(fiber.poll_outcome(), Some(Ok(6)));
/// assert_eq!(*log.borrow(), vec!["open", "close"]);
/// ```
pub fn bracket<Acq, Rel, RelEff, Use, UseEff>(
    acquire: Acq,
    release: Rel,
    body: Use,
) -> Bracket<Acq, Rel, Use>
where
    Acq: Effect,
    Acq::Output: Clone,
    Rel: Fn(Acq::Output) -> RelEff + 'static,
    RelEff: Effect<Output = (), Error = Acq::Error, Env = Acq::Env>,
    Use: Fn(Acq::Output) -> UseEff + 'static,
    UseEff: Effect<Error = Acq::Error, Env = Acq::Env>,
{
    Bracket {
        acquire,
        release: Rc::new(release),
        body: Rc::new(body),
    }
}

/// The node built by [`bracket`].
pub struct Bracket<Acq, Rel, Use> {
    acquire: Acq,
    release: Rc<Rel>,
    body: Rc<Use>,
}

impl<Acq, Rel, Use> std::fmt::Debug for Bracket<Acq, Rel, Use> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bracket")
            .field("acquire", &"<effect>")
            .field("release", &"<function>")
            .field("body", &"<function>")
            .finish()
    }
}

fn deliver<E: 'static, A: 'static>(settle: &Settle<E, A>, outcome: Result<A, Cause<E>>) {
    match outcome {
        Ok(value) => settle.resolve(value),
        Err(cause) => settle.fail(cause),
    };
}

/// Fork the release effect for the held resource, if any is still held,
/// and hand its outcome to `on_done`.
fn run_release<Res, Rel, RelEff, D>(
    release: &Rel,
    resource: &RefCell<Option<Res>>,
    env: &RelEff::Env,
    runtime: &Runtime,
    on_done: D,
) where
    Rel: Fn(Res) -> RelEff,
    RelEff: Effect<Output = ()>,
    D: FnOnce(Result<(), Cause<RelEff::Error>>) + 'static,
{
    let held = resource.borrow_mut().take();
    let Some(res) = held else {
        on_done(Ok(()));
        return;
    };

    match guard(|| release(res)) {
        Ok(effect) => {
            let done = Rc::new(RefCell::new(Some(on_done)));
            let on_reject = {
                let done = Rc::clone(&done);
                Box::new(move |cause| {
                    let f = done.borrow_mut().take();
                    if let Some(f) = f {
                        f(Err(cause));
                    }
                })
            };
            let on_resolve = Box::new(move |()| {
                let f = done.borrow_mut().take();
                if let Some(f) = f {
                    f(Ok(()));
                }
            });
            let _detached = effect.fork(env.clone(), on_reject, on_resolve, runtime);
        }
        Err(panic) => on_done(Err(Cause::Panic(panic))),
    }
}

impl<Acq, Rel, RelEff, Use, UseEff> Effect for Bracket<Acq, Rel, Use>
where
    Acq: Effect,
    Acq::Output: Clone,
    Rel: Fn(Acq::Output) -> RelEff + 'static,
    RelEff: Effect<Output = (), Error = Acq::Error, Env = Acq::Env>,
    Use: Fn(Acq::Output) -> UseEff + 'static,
    UseEff: Effect<Error = Acq::Error, Env = Acq::Env>,
{
    type Output = UseEff::Output;
    type Error = Acq::Error;
    type Env = Acq::Env;

    fn fork(
        &self,
        env: Self::Env,
        reject: Reject<Self::Error>,
        resolve: Resolve<Self::Output>,
        runtime: &Runtime,
    ) -> Cancel {
        let settle = Settle::new(reject, resolve);
        let active = ActiveChild::default();
        let resource: Rc<RefCell<Option<Acq::Output>>> = Rc::new(RefCell::new(None));

        let on_acquired = {
            let settle = settle.clone();
            let active = active.clone();
            let resource = Rc::clone(&resource);
            let release = Rc::clone(&self.release);
            let body = Rc::clone(&self.body);
            let env = env.clone();
            let runtime = runtime.clone();
            Box::new(move |res: Acq::Output| {
                *resource.borrow_mut() = Some(res.clone());

                let finish: Rc<dyn Fn(Result<UseEff::Output, Cause<Acq::Error>>)> = {
                    let settle = settle.clone();
                    let resource = Rc::clone(&resource);
                    let env = env.clone();
                    let runtime = runtime.clone();
                    Rc::new(move |outcome: Result<UseEff::Output, Cause<Acq::Error>>| {
                        let settle = settle.clone();
                        run_release(&*release, &resource, &env, &runtime, move |released| {
                            match (outcome, released) {
                                (outcome, Ok(())) => deliver(&settle, outcome),
                                (Ok(_), Err(cause)) => {
                                    settle.fail(cause);
                                }
                                (Err(cause), Err(_)) => {
                                    tracing::warn!(
                                        "release failed after the body rejected; keeping the body's rejection"
                                    );
                                    settle.fail(cause);
                                }
                            }
                        });
                    })
                };

                match guard(|| body(res)) {
                    Ok(effect) => {
                        let on_reject = {
                            let finish = Rc::clone(&finish);
                            Box::new(move |cause| finish(Err(cause)))
                        };
                        let on_resolve = Box::new(move |value| finish(Ok(value)));
                        let cancel = effect.fork(env.clone(), on_reject, on_resolve, &runtime);
                        active.replace(cancel);
                    }
                    Err(panic) => finish(Err(Cause::Panic(panic))),
                }
            })
        };

        let first = self
            .acquire
            .fork(env.clone(), settle.rejecter(), on_acquired, runtime);
        active.init(first);

        let release = Rc::clone(&self.release);
        let runtime = runtime.clone();
        Cancel::new(move || {
            if settle.cancel() {
                active.cancel();
                run_release(&*release, &resource, &env, &runtime, |released| {
                    if released.is_err() {
                        tracing::warn!("release failed after cancellation");
                    }
                });
            }
        })
    }
}
