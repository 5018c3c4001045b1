// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! What a caller of [`Group::work`](crate::Group::work) gets back.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Why a coalesced call failed.
///
/// Every caller attached to the same call receives a clone of the same error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error<E> {
    /// The producer returned this error. It is handed out unchanged and never retried.
    #[error("{0}")]
    Producer(E),

    /// The producer panicked instead of returning.
    #[error(transparent)]
    Panicked(#[from] Panicked),
}

impl<E> Error<E> {
    /// Returns the producer's own error, if that is what this is.
    #[must_use]
    pub fn producer(&self) -> Option<&E> {
        match self {
            Self::Producer(e) => Some(e),
            Self::Panicked(_) => None,
        }
    }

    /// Converts into the producer's own error, if that is what this is.
    #[must_use]
    pub fn into_producer(self) -> Option<E> {
        match self {
            Self::Producer(e) => Some(e),
            Self::Panicked(_) => None,
        }
    }

    /// Returns `true` if the producer panicked.
    #[must_use]
    pub fn is_panicked(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }
}

/// A producer unwound instead of returning a result.
///
/// Carries the panic message when the payload was a string, which is what `panic!` produces
/// for formatted messages.
#[derive(Clone, PartialEq, Eq, thiserror::Error)]
#[error("producer panicked: {message}")]
pub struct Panicked {
    message: Arc<str>,
}

impl Panicked {
    pub(crate) fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message: Arc<str> = if let Some(s) = payload.downcast_ref::<&'static str>() {
            Arc::from(*s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Arc::from(s.as_str())
        } else {
            Arc::from("non-string panic payload")
        };
        Self { message }
    }

    /// The panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for Panicked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Panicked").field(&self.message()).finish()
    }
}

/// The result of one [`Group::work`](crate::Group::work) call.
///
/// Pairs the shared result with whether this caller ran the producer itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T, E> {
    result: Result<T, Error<E>>,
    shared: bool,
}

impl<T, E> Outcome<T, E> {
    pub(crate) fn new(result: Result<T, Error<E>>, shared: bool) -> Self {
        Self { result, shared }
    }

    /// The value or error fixed by the single producer execution.
    #[must_use]
    pub fn result(&self) -> &Result<T, Error<E>> {
        &self.result
    }

    /// `true` if another caller ran the producer and this caller only attached to it.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Discards the shared flag.
    ///
    /// # Errors
    ///
    /// Returns the error the producer returned, or [`Error::Panicked`] if it panicked.
    pub fn into_result(self) -> Result<T, Error<E>> {
        self.result
    }

    /// Splits into the result and the shared flag.
    #[must_use]
    pub fn into_parts(self) -> (Result<T, Error<E>>, bool) {
        (self.result, self.shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panicked_from_static_str() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        let panicked = Panicked::from_payload(payload.as_ref());
        assert_eq!(panicked.message(), "boom");
        assert_eq!(panicked.to_string(), "producer panicked: boom");
    }

    #[test]
    fn panicked_from_string() {
        let payload: Box<dyn Any + Send> = Box::new(format!("boom {}", 42));
        assert_eq!(Panicked::from_payload(payload.as_ref()).message(), "boom 42");
    }

    #[test]
    fn panicked_from_other_payload() {
        let payload: Box<dyn Any + Send> = Box::new(7_u32);
        assert_eq!(Panicked::from_payload(payload.as_ref()).message(), "non-string panic payload");
    }

    #[test]
    fn producer_error_passes_through() {
        let err: Error<&str> = Error::Producer("not found");
        assert_eq!(err.to_string(), "not found");
        assert_eq!(err.producer(), Some(&"not found"));
        assert!(!err.is_panicked());
        assert_eq!(err.into_producer(), Some("not found"));
    }

    #[test]
    fn panicked_error_has_no_producer_error() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        let err: Error<&str> = Panicked::from_payload(payload.as_ref()).into();
        assert!(err.is_panicked());
        assert_eq!(err.producer(), None);
        assert_eq!(err.to_string(), "producer panicked: boom");
    }

    #[test]
    fn outcome_parts() {
        let outcome: Outcome<u32, &str> = Outcome::new(Ok(1), true);
        assert!(outcome.is_shared());
        assert_eq!(outcome.result(), &Ok(1));
        assert_eq!(outcome.into_parts(), (Ok(1), true));
    }
}
