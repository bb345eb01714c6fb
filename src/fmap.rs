//! FMap - a keyed store whose operations are effects.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use thiserror::Error;

use crate::effect::{lift, of, BoxedEffect, Effect, EffectExt};

/// Rejections produced by [`FMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MapError {
    /// The key has no entry.
    #[error("no such element")]
    NoSuchElement,
}

/// A shared mutable map.
///
/// Clones refer to the same storage.
pub struct FMap<K, V> {
    entries: Rc<RefCell<HashMap<K, V>>>,
}

impl<K, V> Clone for FMap<K, V> {
    fn clone(&self) -> Self {
        FMap {
            entries: Rc::clone(&self.entries),
        }
    }
}

impl<K, V> std::fmt::Debug for FMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FMap")
            .field("len", &self.entries.borrow().len())
            .finish()
    }
}

impl<K, V> Default for FMap<K, V> {
    fn default() -> Self {
        FMap {
            entries: Rc::new(RefCell::new(HashMap::new())),
        }
    }
}

impl<K, V> FMap<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
{
    /// An effect creating an empty map on every fork.
    pub fn make<E, R>() -> impl Effect<Output = FMap<K, V>, Error = E, Env = R>
    where
        E: 'static,
        R: Clone + 'static,
    {
        lift::<_, _, E, R>(|| Ok(FMap::default()))
    }

    /// Resolve with the value stored under `key`, or reject with
    /// [`MapError::NoSuchElement`].
    pub fn get<E, R>(&self, key: K) -> impl Effect<Output = V, Error = E, Env = R>
    where
        E: From<MapError> + 'static,
        R: Clone + 'static,
    {
        let entries = Rc::clone(&self.entries);
        lift::<_, _, E, R>(move || {
            entries
                .borrow()
                .get(&key)
                .cloned()
                .ok_or_else(|| MapError::NoSuchElement.into())
        })
    }

    /// Resolve with whether `key` has an entry.
    pub fn has<E, R>(&self, key: K) -> impl Effect<Output = bool, Error = E, Env = R>
    where
        E: 'static,
        R: Clone + 'static,
    {
        let entries = Rc::clone(&self.entries);
        lift::<_, _, E, R>(move || Ok(entries.borrow().contains_key(&key)))
    }

    /// Store `value` under `key` and resolve with it.
    pub fn set<E, R>(&self, key: K, value: V) -> impl Effect<Output = V, Error = E, Env = R>
    where
        E: 'static,
        R: Clone + 'static,
    {
        let entries = Rc::clone(&self.entries);
        lift::<_, _, E, R>(move || {
            entries.borrow_mut().insert(key.clone(), value.clone());
            Ok(value.clone())
        })
    }

    /// Cache the results of `f` by key.
    ///
    /// The returned function looks the key up when its effect runs. On a
    /// miss it runs `f(key)` and stores the value unless another
    /// computation stored one first, in which case the stored value wins.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::cell::Cell;
    /// use std::rc::Rc;
    /// use undertow::prelude::*;
    /// use undertow::testing::test_runtime;
    /// use undertow::FMap;
    ///
    /// let calls = Rc::new(Cell::new(0));
    /// let counter = calls.clone();
    /// let cache: FMap<u64, u64> = FMap::default();
    /// let square = cache.memoize(move |n: u64| {
    ///     counter.set(counter.get() + 1);
    ///     of::<_, String, ()>(n * n)
    /// });
    ///
    /// let (runtime, scheduler) = test_runtime();
    /// let first = runtime.fork(&square(7), ());
    /// scheduler.run();
    /// let second = runtime.fork(&square(7), ());
    /// scheduler.run();
    ///
    /// assert_eq!(first.poll_outcome(), Some(Ok(49)));
    /// assert_eq!(second.poll_outcome(), Some(Ok(49)));
    /// assert_eq!(calls.get(), 1);
    /// ```
    pub fn memoize<F, Eff>(&self, f: F) -> impl Fn(K) -> BoxedEffect<V, Eff::Error, Eff::Env>
    where
        F: Fn(K) -> Eff + 'static,
        Eff: Effect<Output = V>,
    {
        let map = self.clone();
        let f = Rc::new(f);
        move |key: K| {
            let lookup = {
                let entries = Rc::clone(&map.entries);
                let key = key.clone();
                lift::<_, _, Eff::Error, Eff::Env>(move || Ok(entries.borrow().get(&key).cloned()))
            };
            let map = map.clone();
            let f = Rc::clone(&f);
            lookup
                .chain(move |cached: Option<V>| match cached {
                    Some(value) => of(value).boxed(),
                    None => {
                        let map = map.clone();
                        let key = key.clone();
                        f(key.clone())
                            .map(move |value| map.insert_first(key.clone(), value))
                            .boxed()
                    }
                })
                .boxed()
        }
    }

    fn insert_first(&self, key: K, value: V) -> V {
        self.entries
            .borrow_mut()
            .entry(key)
            .or_insert(value)
            .clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
