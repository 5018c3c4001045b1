// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Maps guarded by a single lock.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::{Mutex, RwLock};

pub(crate) type Map<K, V> = HashMap<K, V, ahash::RandomState>;

/// A key-value store that a [`Loader`](crate::Loader) can fill.
pub trait Store<K, V>: Send + Sync {
    /// Returns a copy of the value stored for `key`.
    fn get(&self, key: &K) -> Option<V>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: K, value: V);
}

/// A map behind a [`Mutex`]: reads and writes all take the same exclusive lock.
///
/// Suited to workloads where writes are about as frequent as reads, since the lock has no
/// reader/writer bookkeeping.
///
/// # Examples
///
/// ```
/// use coalesce_cache::WriteHeavyCache;
///
/// let cache = WriteHeavyCache::new();
/// cache.set(1, "apple");
/// assert_eq!(cache.get(&1), Some("apple"));
/// ```
#[derive(Debug)]
pub struct WriteHeavyCache<K, V> {
    items: Mutex<Map<K, V>>,
}

/// A map behind a [`RwLock`]: reads share the lock, writes take it exclusively.
///
/// Suited to workloads dominated by reads.
///
/// # Examples
///
/// ```
/// use coalesce_cache::ReadHeavyCache;
///
/// let cache = ReadHeavyCache::new();
/// cache.set(1, "orange");
/// assert_eq!(cache.get(&1), Some("orange"));
/// ```
#[derive(Debug)]
pub struct ReadHeavyCache<K, V> {
    items: RwLock<Map<K, V>>,
}

impl<K, V> WriteHeavyCache<K, V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self { items: Mutex::default() }
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.items.lock().clear();
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<K: Hash + Eq, V: Clone> WriteHeavyCache<K, V> {
    /// Returns a copy of the value stored for `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.items.lock().get(key).cloned()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&self, key: K, value: V) {
        self.items.lock().insert(key, value);
    }

    /// Removes the entry for `key`, returning its value.
    pub fn delete(&self, key: &K) -> Option<V> {
        self.items.lock().remove(key)
    }
}

impl<K, V> ReadHeavyCache<K, V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self { items: RwLock::default() }
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.items.write().clear();
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl<K: Hash + Eq, V: Clone> ReadHeavyCache<K, V> {
    /// Returns a copy of the value stored for `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.items.read().get(key).cloned()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&self, key: K, value: V) {
        self.items.write().insert(key, value);
    }

    /// Removes the entry for `key`, returning its value.
    pub fn delete(&self, key: &K) -> Option<V> {
        self.items.write().remove(key)
    }
}

impl<K, V> Default for WriteHeavyCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Default for ReadHeavyCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Store<K, V> for WriteHeavyCache<K, V>
where
    K: Hash + Eq + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        Self::get(self, key)
    }

    fn set(&self, key: K, value: V) {
        Self::set(self, key, value);
    }
}

impl<K, V> Store<K, V> for ReadHeavyCache<K, V>
where
    K: Hash + Eq + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        Self::get(self, key)
    }

    fn set(&self, key: K, value: V) {
        Self::set(self, key, value);
    }
}
