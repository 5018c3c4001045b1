// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integer maps with an atomic increment.

use std::hash::Hash;

use num_traits::{PrimInt, WrappingAdd};
use parking_lot::{Mutex, RwLock};

use crate::locked::{Map, Store};

/// Integer counters behind a [`Mutex`].
///
/// # Examples
///
/// ```
/// use coalesce_cache::WriteHeavyCounter;
///
/// let counters = WriteHeavyCounter::new();
/// counters.incr("hits", 10_u64);
/// counters.incr("hits", 5);
/// assert_eq!(counters.get(&"hits"), Some(15));
/// ```
#[derive(Debug)]
pub struct WriteHeavyCounter<K, V> {
    items: Mutex<Map<K, V>>,
}

/// Integer counters behind a [`RwLock`]; reads share the lock.
#[derive(Debug)]
pub struct ReadHeavyCounter<K, V> {
    items: RwLock<Map<K, V>>,
}

fn add<V: PrimInt + WrappingAdd>(current: Option<&V>, delta: V) -> V {
    current.map_or(delta, |v| v.wrapping_add(&delta))
}

impl<K, V> WriteHeavyCounter<K, V> {
    /// Creates an empty set of counters.
    #[must_use]
    pub fn new() -> Self {
        Self { items: Mutex::default() }
    }

    /// Removes every counter.
    pub fn clear(&self) {
        self.items.lock().clear();
    }

    /// Number of counters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns `true` if there are no counters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<K: Hash + Eq, V: PrimInt + WrappingAdd> WriteHeavyCounter<K, V> {
    /// Returns the counter for `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.items.lock().get(key).copied()
    }

    /// Sets the counter for `key`.
    pub fn set(&self, key: K, value: V) {
        self.items.lock().insert(key, value);
    }

    /// Removes the counter for `key`, returning its value.
    pub fn delete(&self, key: &K) -> Option<V> {
        self.items.lock().remove(key)
    }

    /// Adds `delta` to the counter for `key`, starting from `delta` if there is none.
    ///
    /// Overflow wraps around. Returns the new value.
    pub fn incr(&self, key: K, delta: V) -> V {
        let mut items = self.items.lock();
        let next = add(items.get(&key), delta);
        items.insert(key, next);
        next
    }
}

impl<K, V> ReadHeavyCounter<K, V> {
    /// Creates an empty set of counters.
    #[must_use]
    pub fn new() -> Self {
        Self { items: RwLock::default() }
    }

    /// Removes every counter.
    pub fn clear(&self) {
        self.items.write().clear();
    }

    /// Number of counters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns `true` if there are no counters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl<K: Hash + Eq, V: PrimInt + WrappingAdd> ReadHeavyCounter<K, V> {
    /// Returns the counter for `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.items.read().get(key).copied()
    }

    /// Sets the counter for `key`.
    pub fn set(&self, key: K, value: V) {
        self.items.write().insert(key, value);
    }

    /// Removes the counter for `key`, returning its value.
    pub fn delete(&self, key: &K) -> Option<V> {
        self.items.write().remove(key)
    }

    /// Adds `delta` to the counter for `key`, starting from `delta` if there is none.
    ///
    /// Overflow wraps around. Returns the new value.
    pub fn incr(&self, key: K, delta: V) -> V {
        let mut items = self.items.write();
        let next = add(items.get(&key), delta);
        items.insert(key, next);
        next
    }
}

impl<K, V> Default for WriteHeavyCounter<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Default for ReadHeavyCounter<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Store<K, V> for WriteHeavyCounter<K, V>
where
    K: Hash + Eq + Send,
    V: PrimInt + WrappingAdd + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        Self::get(self, key)
    }

    fn set(&self, key: K, value: V) {
        Self::set(self, key, value);
    }
}

impl<K, V> Store<K, V> for ReadHeavyCounter<K, V>
where
    K: Hash + Eq + Send + Sync,
    V: PrimInt + WrappingAdd + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        Self::get(self, key)
    }

    fn set(&self, key: K, value: V) {
        Self::set(self, key, value);
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Debug;
    use std::thread;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(WriteHeavyCounter<String, u64>: Send, Sync, Debug, Default, Store<String, u64>);
    assert_impl_all!(ReadHeavyCounter<String, i32>: Send, Sync, Debug, Default, Store<String, i32>);

    #[test]
    fn incr_starts_from_delta() {
        let counters = WriteHeavyCounter::new();
        assert_eq!(counters.incr(1, 10), 10);
        assert_eq!(counters.incr(1, 5), 15);
        assert_eq!(counters.get(&1), Some(15));

        let counters = ReadHeavyCounter::new();
        assert_eq!(counters.incr(1, 20), 20);
        assert_eq!(counters.incr(1, 10), 30);
        assert_eq!(counters.get(&1), Some(30));
    }

    #[test]
    fn incr_wraps() {
        let counters = WriteHeavyCounter::new();
        counters.set("k", u8::MAX);
        assert_eq!(counters.incr("k", 2_u8), 1);
    }

    #[test]
    fn negative_delta() {
        let counters = ReadHeavyCounter::new();
        counters.set("k", 3_i32);
        assert_eq!(counters.incr("k", -5), -2);
    }

    #[test]
    fn set_get_clear() {
        let counters = ReadHeavyCounter::new();
        counters.set("key1", 100);
        counters.set("key2", 200);
        assert_eq!(counters.get(&"key1"), Some(100));
        assert_eq!(counters.len(), 2);

        counters.clear();
        assert_eq!(counters.get(&"key1"), None);
        assert_eq!(counters.get(&"key2"), None);
        assert!(counters.is_empty());
    }

    #[test]
    fn parallel_incr_loses_nothing() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 1_000;

        let write_heavy = WriteHeavyCounter::new();
        let read_heavy = ReadHeavyCounter::new();

        thread::scope(|s| {
            for _ in 0..THREADS {
                let (write_heavy, read_heavy) = (&write_heavy, &read_heavy);
                s.spawn(move || {
                    for _ in 0..PER_THREAD {
                        write_heavy.incr("hits", 1_u64);
                        read_heavy.incr("hits", 1_u64);
                    }
                });
            }
        });

        assert_eq!(write_heavy.get(&"hits"), Some(THREADS * PER_THREAD));
        assert_eq!(read_heavy.get(&"hits"), Some(THREADS * PER_THREAD));
    }
}
