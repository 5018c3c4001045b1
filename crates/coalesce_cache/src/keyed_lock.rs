// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-key locks.

use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

use crate::locked::Map;

type KeyMutex = Arc<Mutex<()>>;

/// Hands out one lock per key, allocated on first use.
///
/// Lets callers serialize work on a single resource (a user, a file, a row) without a global
/// lock. Locks for distinct keys never contend. A key's lock stays allocated for the life of
/// the manager.
///
/// # Examples
///
/// ```
/// use coalesce_cache::LockManager;
///
/// let locks = LockManager::new();
///
/// let guard = locks.lock(1);
/// // Resource 1 is exclusively ours until `guard` is dropped.
/// assert!(locks.try_lock(1).is_none());
/// assert!(locks.try_lock(2).is_some());
/// drop(guard);
///
/// assert!(locks.try_lock(1).is_some());
/// ```
pub struct LockManager<K> {
    locks: Mutex<Map<K, KeyMutex>>,
}

/// Holds the lock for one key of a [`LockManager`]; the lock is released on drop.
#[must_use = "the key is unlocked as soon as the guard is dropped"]
pub struct KeyGuard {
    _guard: ArcMutexGuard<RawMutex, ()>,
}

impl<K> LockManager<K> {
    /// Creates a manager with no locks allocated.
    #[must_use]
    pub fn new() -> Self {
        Self { locks: Mutex::default() }
    }

    /// Number of keys that have a lock allocated.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// Returns `true` if no key has been locked yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

impl<K: Hash + Eq> LockManager<K> {
    /// Blocks until the lock for `key` is held.
    pub fn lock(&self, key: K) -> KeyGuard {
        let mutex = self.mutex_for(key);
        KeyGuard { _guard: mutex.lock_arc() }
    }

    /// Takes the lock for `key` if nobody holds it.
    pub fn try_lock(&self, key: K) -> Option<KeyGuard> {
        let mutex = self.mutex_for(key);
        mutex.try_lock_arc().map(|guard| KeyGuard { _guard: guard })
    }

    fn mutex_for(&self, key: K) -> KeyMutex {
        // The manager lock is released before waiting on the key lock.
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(key).or_default())
    }
}

impl<K> Default for LockManager<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Debug for LockManager<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockManager").field("keys", &self.len()).finish()
    }
}

impl Debug for KeyGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGuard").finish_non_exhaustive()
    }
}
