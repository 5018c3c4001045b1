// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The key-to-call registry and the `work` entry point.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::panic;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::builder::GroupBuilder;
use crate::call::{Call, Execution};
use crate::outcome::Outcome;
use crate::retirement::Retirement;

type Calls<K, T, E> = HashMap<K, Arc<Call<T, E>>, ahash::RandomState>;
type SharedCalls<K, T, E> = Arc<Mutex<Calls<K, T, E>>>;

/// Represents a class of work and creates a space in which units of work can be executed with
/// duplicate suppression.
///
/// Concurrent [`work`](Self::work) calls presenting the same key share one execution of the
/// producer and all receive its result. Calls with different keys run independently.
///
/// # Examples
///
/// ```
/// use coalesce::Group;
///
/// let group: Group<&str, String, String> = Group::new();
///
/// let outcome = group.work("user:123", || Ok("Alice".to_string()));
/// assert!(!outcome.is_shared());
/// assert_eq!(outcome.into_result().unwrap(), "Alice");
/// ```
pub struct Group<K, T, E> {
    calls: SharedCalls<K, T, E>,
    retirement: Retirement,
    propagate_panics: bool,
}

impl<K, T, E> Group<K, T, E> {
    /// Creates an empty group that retires calls synchronously and converts producer panics
    /// into [`Error::Panicked`](crate::Error::Panicked).
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts configuring a group.
    #[must_use]
    pub fn builder() -> GroupBuilder<K, T, E> {
        GroupBuilder::new()
    }

    pub(crate) fn from_builder(retirement: Retirement, propagate_panics: bool) -> Self {
        Self {
            calls: Arc::default(),
            retirement,
            propagate_panics,
        }
    }

    /// Number of calls that have been created and not yet retired.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }
}

impl<K, T, E> Default for Group<K, T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T, E> Debug for Group<K, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("in_flight", &self.in_flight())
            .field("retirement", &self.retirement)
            .field("propagate_panics", &self.propagate_panics)
            .finish()
    }
}

impl<K, T, E> Group<K, T, E>
where
    K: Hash + Eq + Clone + Send + 'static,
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Runs `producer` for `key`, unless a call for `key` is already in flight, in which case
    /// this waits for that call and returns a clone of its result.
    ///
    /// Exactly one caller per call runs the producer; [`Outcome::is_shared`] is `false` for that
    /// caller and `true` for everyone who attached to it. The producer runs on the calling
    /// thread and other callers for the same key block until it returns. There is no timeout:
    /// a producer that never returns blocks every caller attached to it.
    ///
    /// The producer should be idempotent. Once the call is retired (see [`Retirement`]) the
    /// next call for the same key runs its own producer.
    ///
    /// # Panics
    ///
    /// A panicking producer never leaves other callers blocked: they receive
    /// [`Error::Panicked`](crate::Error::Panicked). The executing caller receives the same
    /// error, or, if the group was built with
    /// [`propagate_panics(true)`](GroupBuilder::propagate_panics), resumes the original panic.
    pub fn work<F>(&self, key: K, producer: F) -> Outcome<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let call = self.attach(&key);

        let mut entered = call.enter();
        if let Some(result) = entered.completed() {
            return Outcome::new(result, true);
        }

        tracing::debug!("coalesce.producer executing");
        let execution = entered.execute(producer);

        match &self.retirement {
            Retirement::Synchronous => {
                // Still holding the call lock: no caller has seen the result yet.
                retire(&self.calls, &key, &call);
                drop(entered);
            }
            Retirement::Deferred(deferrer) => {
                drop(entered);
                let calls = Arc::clone(&self.calls);
                deferrer.defer(Box::new(move || retire(&calls, &key, &call)));
            }
        }

        match execution {
            Execution::Returned(result) => Outcome::new(result, false),
            Execution::Unwound { payload, .. } if self.propagate_panics => panic::resume_unwind(payload),
            Execution::Unwound { result, .. } => Outcome::new(result, false),
        }
    }

    /// Returns the live call for `key`, creating it if there is none.
    fn attach(&self, key: &K) -> Arc<Call<T, E>> {
        let mut calls = self.calls.lock();
        if let Some(call) = calls.get(key) {
            return Arc::clone(call);
        }

        let call = Arc::new(Call::new());
        calls.insert(key.clone(), Arc::clone(&call));
        call
    }
}

/// Removes `call` from the registry, leaving any newer call for the same key in place.
fn retire<K, T, E>(calls: &Mutex<Calls<K, T, E>>, key: &K, call: &Arc<Call<T, E>>)
where
    K: Hash + Eq,
{
    let mut calls = calls.lock();
    if calls.get(key).is_some_and(|live| Arc::ptr_eq(live, call)) {
        calls.remove(key);
        tracing::debug!(coalesce.in_flight = calls.len(), "coalesce.retirement call retired");
    }
}
