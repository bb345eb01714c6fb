//! Concrete node types returned by constructors and combinators.
//!
//! Each node implements [`Effect`](crate::Effect) by forking its children
//! with wrapped callbacks. Most users never name these types; they come back
//! from the methods on [`EffectExt`](crate::EffectExt) and are usually held
//! as `impl Effect<...>`.

mod catch;
mod chain;
mod from_fn;
mod from_future;
mod map;
mod of;
mod once;
mod race;
mod retry;
mod timer;
mod zip;

pub use catch::{Catch, OnCause, OnFail, Recover};
pub use chain::{And, Chain};
pub use from_fn::{Encased, FromFn, Lift};
pub use from_future::{AccessFuture, EncasedFuture};
pub use map::{Map, MapErr, TryMap};
pub use of::{Never, Of, Rejected};
pub use once::Once;
pub use race::Race;
pub use retry::Retry;
pub use timer::Timer;
pub use zip::{Zip, ZipWith};

pub(crate) use zip::pair;
