// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A batch buffer drained in one step.

use std::mem;

use parking_lot::Mutex;

/// An append-only buffer that is drained in one step.
///
/// Producers [`append`](Self::append) items from any thread; a consumer periodically calls
/// [`rotate`](Self::rotate) to take everything collected so far, in insertion order, leaving the
/// buffer empty. Typical use is batching writes before flushing them elsewhere.
///
/// # Examples
///
/// ```
/// use coalesce_cache::RotatingBuffer;
///
/// let buffer = RotatingBuffer::new();
/// buffer.append("a");
/// buffer.append("b");
/// assert_eq!(buffer.rotate(), vec!["a", "b"]);
/// assert!(buffer.is_empty());
/// ```
#[derive(Debug)]
pub struct RotatingBuffer<T> {
    items: Mutex<Vec<T>>,
}

impl<T> RotatingBuffer<T> {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self { items: Mutex::new(Vec::new()) }
    }

    /// Creates an empty buffer that can hold `capacity` items before reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Adds `item` at the end.
    pub fn append(&self, item: T) {
        self.items.lock().push(item);
    }

    /// Adds every item of `items` at the end, without interleaving with other writers.
    pub fn append_all(&self, items: impl IntoIterator<Item = T>) {
        self.items.lock().extend(items);
    }

    /// Takes every item appended so far, oldest first, and leaves the buffer empty.
    #[must_use]
    pub fn rotate(&self) -> Vec<T> {
        let mut items = self.items.lock();
        let capacity = items.capacity();
        mem::replace(&mut *items, Vec::with_capacity(capacity))
    }

    /// Number of buffered items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns `true` if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<T> Default for RotatingBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}
