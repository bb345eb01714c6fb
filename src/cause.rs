//! Failure causes and runtime-level errors.
//!
//! A rejected fork carries a [`Cause`]: either the declared, typed error of
//! the effect or a [`Panic`] caught while running a user closure. At the
//! runtime boundary the outcome of a fiber is a [`RunError`], which adds
//! the two ways a fiber can end without settling.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use thiserror::Error;

/// A panic caught inside a leaf body or combinator closure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("panicked: {message}")]
pub struct Panic {
    message: String,
}

impl Panic {
    /// Create a panic record from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Panic {
            message: message.into(),
        }
    }

    /// Build from the payload returned by `catch_unwind`.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => (*message).to_string(),
                Err(_) => "Box<dyn Any>".to_string(),
            },
        };
        Panic { message }
    }

    /// The panic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Run `f`, converting a panic into a [`Panic`].
pub(crate) fn guard<T>(f: impl FnOnce() -> T) -> Result<T, Panic> {
    catch_unwind(AssertUnwindSafe(f)).map_err(Panic::from_payload)
}

/// Why a fork rejected.
///
/// # Example
///
/// ```rust
/// use undertow::Cause;
///
/// let cause: Cause<&str> = Cause::Fail("boom");
/// assert_eq!(cause.clone().failure(), Some("boom"));
/// assert!(!cause.is_panic());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause<E> {
    /// The declared error channel.
    Fail(E),
    /// A panic absorbed into the rejection channel.
    Panic(Panic),
}

impl<E> Cause<E> {
    /// The typed error, if this is a `Fail`.
    pub fn failure(self) -> Option<E> {
        match self {
            Cause::Fail(e) => Some(e),
            Cause::Panic(_) => None,
        }
    }

    /// Returns true if this cause is a caught panic.
    pub fn is_panic(&self) -> bool {
        matches!(self, Cause::Panic(_))
    }

    /// Transform the typed error, leaving panics untouched.
    pub fn map<E2>(self, f: impl FnOnce(E) -> E2) -> Cause<E2> {
        match self {
            Cause::Fail(e) => Cause::Fail(f(e)),
            Cause::Panic(p) => Cause::Panic(p),
        }
    }
}

impl<E> From<Panic> for Cause<E> {
    fn from(panic: Panic) -> Self {
        Cause::Panic(panic)
    }
}

/// How a fiber ended without resolving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError<E> {
    /// The effect rejected with its typed error.
    #[error("effect rejected: {0:?}")]
    Rejected(E),
    /// A user closure panicked while the effect ran.
    #[error("effect {0}")]
    Panicked(Panic),
    /// The fiber was cancelled before it settled.
    #[error("effect was cancelled before it settled")]
    Cancelled,
    /// The scheduler went idle while the effect was still pending.
    #[error("scheduler went idle before the effect settled")]
    Stalled,
}

impl<E> RunError<E> {
    /// The typed error, if the effect rejected.
    pub fn rejection(self) -> Option<E> {
        match self {
            RunError::Rejected(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> From<Cause<E>> for RunError<E> {
    fn from(cause: Cause<E>) -> Self {
        match cause {
            Cause::Fail(e) => RunError::Rejected(e),
            Cause::Panic(p) => RunError::Panicked(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_captures_str_panic() {
        let result = guard(|| -> i32 { panic!("boom") });
        assert_eq!(result, Err(Panic::new("boom")));
    }

    #[test]
    fn test_guard_captures_formatted_panic() {
        let n = 7;
        let result = guard(|| -> i32 { panic!("bad value {}", n) });
        assert_eq!(result.unwrap_err().message(), "bad value 7");
    }

    #[test]
    fn test_guard_passes_value_through() {
        assert_eq!(guard(|| 42), Ok(42));
    }

    #[test]
    fn test_cause_map_preserves_panic() {
        let cause: Cause<i32> = Cause::Panic(Panic::new("x"));
        assert_eq!(cause.map(|e| e + 1), Cause::Panic(Panic::new("x")));
        assert_eq!(Cause::Fail(1).map(|e| e + 1), Cause::Fail(2));
    }

    #[test]
    fn test_run_error_from_cause() {
        assert_eq!(RunError::from(Cause::Fail("e")), RunError::Rejected("e"));
        assert_eq!(
            RunError::<&str>::from(Cause::Panic(Panic::new("p"))),
            RunError::Panicked(Panic::new("p"))
        );
    }

    #[test]
    fn test_run_error_display() {
        let err: RunError<String> = RunError::Stalled;
        assert!(err.to_string().contains("idle"));
        let err = RunError::Rejected("nope");
        assert_eq!(err.to_string(), "effect rejected: \"nope\"");
    }
}
