//! Cancellation handles.
//!
//! Every fork returns a [`Cancel`]: a zero-argument, idempotent operation
//! that aborts the fork if it has not settled yet. Composite nodes keep the
//! handles of the children they started and invoke them in registration
//! order when their own handle fires.

use std::cell::RefCell;
use std::rc::Rc;

type CancelFn = Box<dyn FnOnce()>;

/// An idempotent cancellation handle.
///
/// Cloning a handle yields another reference to the same operation; the
/// wrapped closure runs at most once no matter how many clones invoke it.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use undertow::Cancel;
///
/// let calls = Rc::new(Cell::new(0));
/// let counter = calls.clone();
/// let cancel = Cancel::new(move || counter.set(counter.get() + 1));
///
/// cancel.cancel();
/// cancel.clone().cancel();
/// assert_eq!(calls.get(), 1);
/// ```
#[derive(Clone, Default)]
pub struct Cancel {
    inner: Option<Rc<RefCell<Option<CancelFn>>>>,
}

impl std::fmt::Debug for Cancel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cancel")
            .field("armed", &self.is_armed())
            .finish()
    }
}

impl Cancel {
    /// Create a handle that runs `f` the first time it is invoked.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Cancel {
            inner: Some(Rc::new(RefCell::new(Some(Box::new(f))))),
        }
    }

    /// A handle that does nothing.
    pub fn noop() -> Self {
        Cancel { inner: None }
    }

    /// Invoke the handle. Subsequent invocations are no-ops.
    pub fn cancel(&self) {
        let f = match &self.inner {
            Some(cell) => cell.borrow_mut().take(),
            None => None,
        };
        if let Some(f) = f {
            f();
        }
    }

    /// Returns true while the wrapped operation has not run yet.
    pub fn is_armed(&self) -> bool {
        self.inner
            .as_ref()
            .map(|cell| cell.borrow().is_some())
            .unwrap_or(false)
    }
}

/// Conversion from the return value of a user fork function into a handle.
///
/// Lets [`from_fn`](crate::from_fn) bodies return either `()` (nothing to
/// cancel), a [`Cancel`], or an `Option<Cancel>`.
pub trait IntoCancel {
    /// Convert into a cancellation handle.
    fn into_cancel(self) -> Cancel;
}

impl IntoCancel for () {
    fn into_cancel(self) -> Cancel {
        Cancel::noop()
    }
}

impl IntoCancel for Cancel {
    fn into_cancel(self) -> Cancel {
        self
    }
}

impl IntoCancel for Option<Cancel> {
    fn into_cancel(self) -> Cancel {
        self.unwrap_or_default()
    }
}

/// Handles of every child a node started, cancelled together.
///
/// Once the set has been cancelled, handles pushed later are invoked
/// immediately.
#[derive(Clone, Default)]
pub(crate) struct CancelSet {
    state: Rc<RefCell<SetState>>,
}

#[derive(Default)]
struct SetState {
    handles: Vec<Cancel>,
    closed: bool,
}

impl CancelSet {
    pub(crate) fn push(&self, cancel: Cancel) {
        let mut state = self.state.borrow_mut();
        if state.closed {
            drop(state);
            cancel.cancel();
        } else {
            state.handles.push(cancel);
        }
    }

    pub(crate) fn cancel_all(&self) {
        let handles = {
            let mut state = self.state.borrow_mut();
            state.closed = true;
            std::mem::take(&mut state.handles)
        };
        for handle in handles {
            handle.cancel();
        }
    }
}

/// The handle of whichever child is currently running.
///
/// Sequencing nodes (chain, catch, retry, bracket) replace the recorded
/// handle every time they move on to a new child, so cancelling always
/// reaches the active one.
#[derive(Clone, Default)]
pub(crate) struct ActiveChild {
    state: Rc<RefCell<ActiveState>>,
}

#[derive(Default)]
struct ActiveState {
    current: Option<Cancel>,
    closed: bool,
}

impl ActiveChild {
    /// Record the first child's handle unless a later child already
    /// replaced it.
    pub(crate) fn init(&self, cancel: Cancel) {
        let mut state = self.state.borrow_mut();
        if state.closed {
            drop(state);
            cancel.cancel();
        } else if state.current.is_none() {
            state.current = Some(cancel);
        }
    }

    pub(crate) fn replace(&self, cancel: Cancel) {
        let mut state = self.state.borrow_mut();
        if state.closed {
            drop(state);
            cancel.cancel();
        } else {
            state.current = Some(cancel);
        }
    }

    pub(crate) fn cancel(&self) {
        let current = {
            let mut state = self.state.borrow_mut();
            state.closed = true;
            state.current.take()
        };
        if let Some(cancel) = current {
            cancel.cancel();
        }
    }
}
