// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The per-key call record and its single-execution protocol.

use std::fmt::{self, Debug};
use std::panic::{self, AssertUnwindSafe};

use parking_lot::{Mutex, MutexGuard};

use crate::outcome::{Error, Panicked};

type Slot<T, E> = Option<Result<T, Error<E>>>;

/// One producer invocation attached to a key.
///
/// The slot lock is both the single-execution guard and the publication point of the result:
/// the executing caller fills the slot while holding the lock, and every other caller reads it
/// after acquiring the lock in turn. An empty slot means the producer has not run yet.
pub(crate) struct Call<T, E> {
    slot: Mutex<Slot<T, E>>,
}

/// How the executing caller's producer finished.
pub(crate) enum Execution<T, E> {
    Returned(Result<T, Error<E>>),
    /// The producer panicked. Waiters get `result`, `payload` can be resumed by the executor.
    Unwound {
        result: Result<T, Error<E>>,
        payload: Box<dyn std::any::Any + Send>,
    },
}

impl<T, E> Call<T, E> {
    pub(crate) fn new() -> Self {
        Self { slot: Mutex::new(None) }
    }

    /// Blocks until this caller holds the slot lock.
    pub(crate) fn enter(&self) -> Entered<'_, T, E> {
        Entered { slot: self.slot.lock() }
    }
}

impl<T, E> Debug for Call<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call").finish_non_exhaustive()
    }
}

/// A caller holding the slot lock of a [`Call`].
pub(crate) struct Entered<'a, T, E> {
    slot: MutexGuard<'a, Slot<T, E>>,
}

impl<T: Clone, E: Clone> Entered<'_, T, E> {
    /// The result fixed by an earlier caller, if the producer already ran.
    pub(crate) fn completed(&self) -> Option<Result<T, Error<E>>> {
        self.slot.clone()
    }

    /// Runs the producer and fixes its outcome in the slot.
    ///
    /// A panicking producer is caught here, so the slot is always filled and the lock is always
    /// released normally.
    pub(crate) fn execute<F>(&mut self, producer: F) -> Execution<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        debug_assert!(self.slot.is_none(), "a call's producer runs at most once");

        match panic::catch_unwind(AssertUnwindSafe(producer)) {
            Ok(returned) => {
                let result = returned.map_err(Error::Producer);
                *self.slot = Some(result.clone());
                Execution::Returned(result)
            }
            Err(payload) => {
                let panicked = Panicked::from_payload(payload.as_ref());
                tracing::warn!(coalesce.panic = panicked.message(), "coalesce.producer panicked");
                let result = Err(Error::Panicked(panicked));
                *self.slot = Some(result.clone());
                Execution::Unwound { result, payload }
            }
        }
    }
}
