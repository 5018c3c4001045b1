// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Maps whose entries expire after a per-entry time-to-live.

use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tick::Clock;

use crate::locked::Map;

#[derive(Debug)]
struct Entry<V> {
    value: V,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn new(value: V, ttl: Duration, now: Instant) -> Self {
        Self {
            value,
            expires_at: now.checked_add(ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// An expiring map behind a [`Mutex`].
///
/// Time is read from the [`Clock`] given at construction. Expired entries are invisible to
/// [`get`](Self::get) immediately and are dropped from memory on the next write to the same key,
/// on [`get`](Self::get), or by [`purge_expired`](Self::purge_expired).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use coalesce_cache::WriteHeavyExpiringCache;
/// use tick::ClockControl;
///
/// let control = ClockControl::new();
/// let cache = WriteHeavyExpiringCache::new(control.to_clock());
///
/// cache.set(1, "apple", Duration::from_secs(60));
/// assert_eq!(cache.get(&1), Some("apple"));
///
/// control.advance(Duration::from_secs(60));
/// assert_eq!(cache.get(&1), None);
/// ```
#[derive(Debug)]
pub struct WriteHeavyExpiringCache<K, V> {
    items: Mutex<Map<K, Entry<V>>>,
    clock: Clock,
}

/// An expiring map behind a [`RwLock`]; reads share the lock.
///
/// Time is read from the [`Clock`] given at construction. Expired entries are invisible to
/// [`get`](Self::get) immediately and are dropped from memory on the next write to the same key
/// or by [`purge_expired`](Self::purge_expired).
#[derive(Debug)]
pub struct ReadHeavyExpiringCache<K, V> {
    items: RwLock<Map<K, Entry<V>>>,
    clock: Clock,
}

impl<K, V> WriteHeavyExpiringCache<K, V> {
    /// Creates an empty cache that reads time from `clock`.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            items: Mutex::default(),
            clock,
        }
    }

    /// The clock entries expire by.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.items.lock().clear();
    }

    /// Number of stored entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns `true` if no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Drops every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.instant();
        let mut items = self.items.lock();
        let before = items.len();
        items.retain(|_, entry| entry.is_live(now));
        before - items.len()
    }
}

impl<K: Hash + Eq, V: Clone> WriteHeavyExpiringCache<K, V> {
    /// Returns a copy of the value for `key` if it has not expired.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.instant();
        let mut items = self.items.lock();
        match items.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                items.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let entry = Entry::new(value, ttl, self.clock.instant());
        self.items.lock().insert(key, entry);
    }

    /// Removes the entry for `key`, returning its value if it had not expired.
    pub fn delete(&self, key: &K) -> Option<V> {
        let now = self.clock.instant();
        self.items.lock().remove(key).filter(|e| e.is_live(now)).map(|e| e.value)
    }
}

impl<K, V> ReadHeavyExpiringCache<K, V> {
    /// Creates an empty cache that reads time from `clock`.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            items: RwLock::default(),
            clock,
        }
    }

    /// The clock entries expire by.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.items.write().clear();
    }

    /// Number of stored entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns `true` if no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Drops every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.instant();
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|_, entry| entry.is_live(now));
        before - items.len()
    }
}

impl<K: Hash + Eq, V: Clone> ReadHeavyExpiringCache<K, V> {
    /// Returns a copy of the value for `key` if it has not expired.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.instant();
        self.items
            .read()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let entry = Entry::new(value, ttl, self.clock.instant());
        self.items.write().insert(key, entry);
    }

    /// Removes the entry for `key`, returning its value if it had not expired.
    pub fn delete(&self, key: &K) -> Option<V> {
        let now = self.clock.instant();
        self.items.write().remove(key).filter(|e| e.is_live(now)).map(|e| e.value)
    }
}
