// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache fills coalesced through a [`Group`].

use std::fmt::{self, Debug};
use std::hash::Hash;
use std::marker::PhantomData;

use coalesce::{Error, Group};

use crate::locked::Store;

/// Fills a [`Store`] on miss, running at most one fill per key at a time.
///
/// When many threads miss the same key together, one of them runs the producer and the rest
/// wait for its result instead of hitting the backing source themselves. A successful value is
/// written to the store before the waiting threads are released, so later readers find it there.
/// Errors are handed to every waiting thread and are not stored.
///
/// # Examples
///
/// ```
/// use coalesce_cache::{Loader, ReadHeavyCache};
///
/// let loader: Loader<_, u32, String, String> = Loader::new(ReadHeavyCache::new());
///
/// let value = loader.get_or_fill(7, || Ok("seven".to_string())).unwrap();
/// assert_eq!(value, "seven");
///
/// // Served from the store; the producer is not called.
/// let value = loader.get_or_fill(7, || unreachable!()).unwrap();
/// assert_eq!(value, "seven");
/// ```
pub struct Loader<S, K, V, E> {
    store: S,
    group: Group<K, V, E>,
    _phantom: PhantomData<fn() -> (K, V)>,
}

impl<S, K, V, E> Loader<S, K, V, E> {
    /// Wraps `store` with a default [`Group`].
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_group(store, Group::new())
    }

    /// Wraps `store`, coalescing fills through `group`.
    ///
    /// Use this to pick a [`Retirement`](coalesce::Retirement) policy or panic behavior.
    #[must_use]
    pub fn with_group(store: S, group: Group<K, V, E>) -> Self {
        Self {
            store,
            group,
            _phantom: PhantomData,
        }
    }

    /// The wrapped store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S, K, V, E> Loader<S, K, V, E>
where
    S: Store<K, V>,
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Returns the stored value for `key`, or fills it by running `producer`.
    ///
    /// Concurrent misses for the same key share one run of `producer`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Producer`] if the shared run of `producer` failed, or
    /// [`Error::Panicked`] if it panicked. Neither outcome is written to the store.
    ///
    /// With the default [`Retirement::Synchronous`](coalesce::Retirement::Synchronous) group,
    /// the next miss after a failed fill runs `producer` again. With
    /// [`Retirement::Deferred`](coalesce::Retirement::Deferred), misses that arrive before the
    /// failed call is retired receive the same error without running `producer`.
    pub fn get_or_fill<F>(&self, key: K, producer: F) -> Result<V, Error<E>>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.store.get(&key) {
            tracing::trace!("coalesce_cache.loader hit");
            return Ok(value);
        }

        let outcome = self.group.work(key.clone(), || {
            // A fill that retired between our miss and this call already stored the value.
            if let Some(value) = self.store.get(&key) {
                return Ok(value);
            }

            let value = producer()?;
            self.store.set(key.clone(), value.clone());
            Ok(value)
        });

        tracing::debug!(coalesce_cache.shared = outcome.is_shared(), "coalesce_cache.loader filled");
        outcome.into_result()
    }
}

impl<S: Default, K, V, E> Default for Loader<S, K, V, E> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: Debug, K, V, E> Debug for Loader<S, K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("store", &self.store)
            .field("group", &self.group)
            .finish()
    }
}
