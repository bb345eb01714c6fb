//! ZipWith combinator - runs two effects concurrently and combines both
//! values.

use std::cell::RefCell;
use std::rc::Rc;

use crate::cancel::{ActiveChild, Cancel};
use crate::cause::{guard, Cause};
use crate::effect::settle::{Settle, Status};
use crate::effect::trait_def::{Effect, Reject, Resolve};
use crate::runtime::Runtime;

/// Resolves with `f(a, b)` once both effects resolved.
///
/// If either rejects, the pending sibling is cancelled and the rejection is
/// delivered.
pub struct ZipWith<L, R, F> {
    pub(crate) left: L,
    pub(crate) right: R,
    pub(crate) f: Rc<F>,
}

/// `ZipWith` that pairs both values into a tuple.
pub type Zip<L, R> = ZipWith<
    L,
    R,
    fn(<L as Effect>::Output, <R as Effect>::Output) -> (<L as Effect>::Output, <R as Effect>::Output),
>;

pub(crate) fn pair<A, B>(a: A, b: B) -> (A, B) {
    (a, b)
}

impl<L, R, F> std::fmt::Debug for ZipWith<L, R, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipWith")
            .field("left", &"<effect>")
            .field("right", &"<effect>")
            .field("f", &"<function>")
            .finish()
    }
}

type Slots<A, B> = Rc<RefCell<(Option<A>, Option<B>)>>;

fn try_combine<A, B, C, E, F>(slots: &Slots<A, B>, f: &F, settle: &Settle<E, C>)
where
    F: Fn(A, B) -> C,
    E: 'static,
    C: 'static,
{
    let both = {
        let mut slots = slots.borrow_mut();
        if slots.0.is_some() && slots.1.is_some() {
            slots.0.take().zip(slots.1.take())
        } else {
            None
        }
    };
    if let Some((a, b)) = both {
        match guard(|| f(a, b)) {
            Ok(value) => {
                settle.resolve(value);
            }
            Err(panic) => {
                settle.fail(Cause::Panic(panic));
            }
        }
    }
}

fn cancel_on_reject<E: 'static, C: 'static>(
    settle: &Settle<E, C>,
    sibling: &ActiveChild,
) -> Reject<E> {
    let settle = settle.clone();
    let sibling = sibling.clone();
    Box::new(move |cause| {
        if let Some((reject, _)) = settle.claim(Status::Rejected) {
            sibling.cancel();
            reject(cause);
        }
    })
}

impl<L, R, F, C> Effect for ZipWith<L, R, F>
where
    L: Effect,
    R: Effect<Error = L::Error, Env = L::Env>,
    F: Fn(L::Output, R::Output) -> C + 'static,
    C: 'static,
{
    type Output = C;
    type Error = L::Error;
    type Env = L::Env;

    fn fork(
        &self,
        env: Self::Env,
        reject: Reject<Self::Error>,
        resolve: Resolve<C>,
        runtime: &Runtime,
    ) -> Cancel {
        let settle = Settle::new(reject, resolve);
        let slots: Slots<L::Output, R::Output> = Rc::new(RefCell::new((None, None)));
        let left_slot = ActiveChild::default();
        let right_slot = ActiveChild::default();

        let on_left = {
            let settle = settle.clone();
            let slots = Rc::clone(&slots);
            let f = Rc::clone(&self.f);
            Box::new(move |a| {
                slots.borrow_mut().0 = Some(a);
                try_combine(&slots, &*f, &settle);
            })
        };
        left_slot.init(self.left.fork(
            env.clone(),
            cancel_on_reject(&settle, &right_slot),
            on_left,
            runtime,
        ));

        let on_right = {
            let settle = settle.clone();
            let slots = Rc::clone(&slots);
            let f = Rc::clone(&self.f);
            Box::new(move |b| {
                slots.borrow_mut().1 = Some(b);
                try_combine(&slots, &*f, &settle);
            })
        };
        right_slot.init(self.right.fork(
            env,
            cancel_on_reject(&settle, &left_slot),
            on_right,
            runtime,
        ));

        Cancel::new(move || {
            if settle.cancel() {
                left_slot.cancel();
                right_slot.cancel();
            }
        })
    }
}
