//! Ref - a mutable cell whose reads and writes are effects.

use std::cell::RefCell;
use std::rc::Rc;

use crate::effect::{lift, Effect};

/// A shared mutable value.
///
/// Clones point at the same cell. Every operation is an effect, so reads
/// and writes happen in the order the scheduler runs them.
///
/// # Example
///
/// ```rust
/// use undertow::prelude::*;
/// use undertow::testing::test_runtime;
/// use undertow::Ref;
///
/// let program = Ref::make::<String, ()>(1).chain(|counter| {
///     let reader = counter.clone();
///     counter
///         .update(|n| n + 10)
///         .chain(move |_| reader.read())
/// });
///
/// let (runtime, scheduler) = test_runtime();
/// let fiber = runtime.fork(&program, ());
/// scheduler.run();
/// assert_eq!(fiber.poll_outcome(), Some(Ok(11)));
/// ```
pub struct Ref<A> {
    cell: Rc<RefCell<A>>,
}

impl<A> Clone for Ref<A> {
    fn clone(&self) -> Self {
        Ref {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<A: std::fmt::Debug> std::fmt::Debug for Ref<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Ref").field(&*self.cell.borrow()).finish()
    }
}

impl<A: Clone + 'static> Ref<A> {
    /// Create a cell directly.
    pub fn new(initial: A) -> Self {
        Ref {
            cell: Rc::new(RefCell::new(initial)),
        }
    }

    /// An effect allocating a fresh cell on every fork.
    pub fn make<E, R>(initial: A) -> impl Effect<Output = Ref<A>, Error = E, Env = R>
    where
        E: 'static,
        R: Clone + 'static,
    {
        lift::<_, _, E, R>(move || Ok(Ref::new(initial.clone())))
    }

    /// Resolve with the current value.
    pub fn read<E, R>(&self) -> impl Effect<Output = A, Error = E, Env = R>
    where
        E: 'static,
        R: Clone + 'static,
    {
        let cell = Rc::clone(&self.cell);
        lift::<_, _, E, R>(move || Ok(cell.borrow().clone()))
    }

    /// Replace the value and resolve with it.
    pub fn set<E, R>(&self, value: A) -> impl Effect<Output = A, Error = E, Env = R>
    where
        E: 'static,
        R: Clone + 'static,
    {
        let cell = Rc::clone(&self.cell);
        lift::<_, _, E, R>(move || {
            *cell.borrow_mut() = value.clone();
            Ok(value.clone())
        })
    }

    /// Apply `f` to the value and resolve with the result.
    pub fn update<E, R, F>(&self, f: F) -> impl Effect<Output = A, Error = E, Env = R>
    where
        E: 'static,
        R: Clone + 'static,
        F: Fn(A) -> A + 'static,
    {
        let cell = Rc::clone(&self.cell);
        lift::<_, _, E, R>(move || {
            let next = f(cell.borrow().clone());
            *cell.borrow_mut() = next.clone();
            Ok(next)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use crate::testing::test_runtime;

    #[test]
    fn test_make_allocates_per_fork() {
        let make = Ref::make::<String, ()>(0);
        let (runtime, scheduler) = test_runtime();
        let a = runtime.fork(&make, ());
        let b = runtime.fork(&make, ());
        scheduler.run();

        let (a, b) = match (a.poll_outcome(), b.poll_outcome()) {
            (Some(Ok(a)), Some(Ok(b))) => (a, b),
            other => panic!("unexpected outcome: {:?}", other),
        };
        runtime.fork(&a.set::<String, ()>(5), ());
        scheduler.run();
        let read_b = runtime.fork(&b.read::<String, ()>(), ());
        scheduler.run();
        assert_eq!(read_b.poll_outcome(), Some(Ok(0)));
    }

    #[test]
    fn test_nothing_happens_until_forked() {
        let cell = Ref::new(1);
        let _pending = cell.set::<String, ()>(2);
        let (runtime, scheduler) = test_runtime();
        let fiber = runtime.fork(&cell.read::<String, ()>(), ());
        scheduler.run();
        assert_eq!(fiber.poll_outcome(), Some(Ok(1)));
    }

    #[test]
    fn test_updates_apply_in_fork_order() {
        let cell = Ref::new(String::new());
        let (runtime, scheduler) = test_runtime();
        for word in ["a", "b", "c"] {
            runtime.fork(&cell.update::<(), (), _>(move |s| s + word), ());
        }
        let fiber = runtime.fork(&cell.read::<(), ()>(), ());
        scheduler.run();
        assert_eq!(fiber.poll_outcome(), Some(Ok("abc".to_string())));
    }
}
