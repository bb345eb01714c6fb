//! Task queue shared by both schedulers.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use futures::future::{abortable, LocalBoxFuture};
use futures::FutureExt;

use super::Task;
use crate::cancel::Cancel;

#[derive(Default)]
struct QueueState {
    next_id: u64,
    ready: VecDeque<u64>,
    tasks: HashMap<u64, Task>,
    timers: BTreeMap<(Duration, u64), Task>,
}

impl QueueState {
    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Ready queue, timer map and spawned futures.
///
/// Tasks are always removed from the queue before they run, so a running
/// task may schedule or cancel freely.
#[derive(Default)]
pub(crate) struct Dispatch {
    state: RefCell<QueueState>,
    incoming: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
}

impl Dispatch {
    pub(crate) fn asap(self: &Rc<Self>, task: Task) -> Cancel {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id();
            state.ready.push_back(id);
            state.tasks.insert(id, task);
            id
        };
        let dispatch = Rc::downgrade(self);
        Cancel::new(move || {
            if let Some(dispatch) = dispatch.upgrade() {
                dispatch.state.borrow_mut().tasks.remove(&id);
            }
        })
    }

    /// Schedule at an absolute deadline on the owning scheduler's clock.
    pub(crate) fn at(self: &Rc<Self>, deadline: Duration, task: Task) -> Cancel {
        let key = {
            let mut state = self.state.borrow_mut();
            let key = (deadline, state.next_id());
            state.timers.insert(key, task);
            key
        };
        let dispatch = Rc::downgrade(self);
        Cancel::new(move || {
            if let Some(dispatch) = dispatch.upgrade() {
                dispatch.state.borrow_mut().timers.remove(&key);
            }
        })
    }

    pub(crate) fn spawn(&self, future: LocalBoxFuture<'static, ()>) -> Cancel {
        let (future, handle) = abortable(future);
        self.incoming
            .borrow_mut()
            .push(future.map(|_| ()).boxed_local());
        Cancel::new(move || handle.abort())
    }

    fn pop_ready(&self) -> Option<Task> {
        let mut state = self.state.borrow_mut();
        while let Some(id) = state.ready.pop_front() {
            if let Some(task) = state.tasks.remove(&id) {
                return Some(task);
            }
        }
        None
    }

    /// Run ready tasks, including ones queued while draining, until the
    /// queue is empty. Returns how many ran.
    pub(crate) fn run_ready(&self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.pop_ready() {
            task();
            ran += 1;
        }
        ran
    }

    pub(crate) fn has_ready(&self) -> bool {
        !self.state.borrow().tasks.is_empty()
    }

    pub(crate) fn next_deadline(&self) -> Option<Duration> {
        self.state
            .borrow()
            .timers
            .keys()
            .next()
            .map(|(deadline, _)| *deadline)
    }

    /// Remove the earliest timer due at or before `limit`.
    pub(crate) fn pop_due(&self, limit: Duration) -> Option<(Duration, Task)> {
        let mut state = self.state.borrow_mut();
        let key = *state.timers.keys().next()?;
        if key.0 > limit {
            return None;
        }
        state.timers.remove(&key).map(|task| (key.0, task))
    }

    pub(crate) fn take_incoming(&self) -> Vec<LocalBoxFuture<'static, ()>> {
        std::mem::take(&mut *self.incoming.borrow_mut())
    }

    pub(crate) fn has_incoming(&self) -> bool {
        !self.incoming.borrow().is_empty()
    }

    pub(crate) fn pending_tasks(&self) -> usize {
        let state = self.state.borrow();
        state.tasks.len() + state.timers.len()
    }
}
