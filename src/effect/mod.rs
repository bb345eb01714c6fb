//! Lazy effects and the nodes they are built from.
//!
//! An effect is a description of work: a tree of nodes that does nothing
//! until a [`Runtime`](crate::Runtime) forks it with an environment and a
//! pair of callbacks. Leaves ([`of`], [`from_fn`], [`lift`], [`timeout`],
//! ...) defer their bodies through the scheduler; combinators
//! ([`EffectExt::map`], [`EffectExt::chain`], [`EffectExt::race`], ...)
//! fork their children with wrapped callbacks.
//!
//! # Laziness and re-use
//!
//! The same value can be forked any number of times. Each fork runs the
//! whole tree again, except below [`EffectExt::once`].
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use undertow::prelude::*;
//! use undertow::testing::test_runtime;
//!
//! let calls = Rc::new(Cell::new(0));
//! let counter = calls.clone();
//! let effect = lift::<_, _, String, ()>(move || {
//!     counter.set(counter.get() + 1);
//!     Ok(counter.get())
//! });
//! assert_eq!(calls.get(), 0);
//!
//! let (runtime, scheduler) = test_runtime();
//! let first = runtime.fork(&effect, ());
//! let second = runtime.fork(&effect, ());
//! scheduler.run();
//! assert_eq!(first.poll_outcome(), Some(Ok(1)));
//! assert_eq!(second.poll_outcome(), Some(Ok(2)));
//! ```
//!
//! # Boxing
//!
//! Combinators return concrete node types. Use [`EffectExt::boxed`] to get
//! a [`BoxedEffect`] when a single type is needed: recursion, collections,
//! or match arms returning different trees.

mod boxed;
mod bracket;
pub mod combinators;
mod constructors;
mod ext;
mod leaf;
pub mod prelude;
mod reader;
mod settle;
mod tracing;
mod trait_def;

pub use boxed::BoxedEffect;
pub use bracket::{bracket, Bracket};
pub use constructors::{
    access, access_m, access_p, encase, encase_p, environment, from_fn, lift, never, of, reject,
    timeout,
};
pub use ext::EffectExt;
pub use reader::{Ask, Local, Provide};
pub use settle::{Settle, Status};
pub use self::tracing::Instrument;
pub use trait_def::{Effect, Reject, Resolve};
