// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Lock-guarded in-memory caches with coalesced cache fills.
//!
//! # Stores
//!
//! Every store comes in two flavors that differ only in the lock guarding the map:
//!
//! - `WriteHeavy*` types use a [`Mutex`](parking_lot::Mutex), which is cheapest when writes are
//!   about as common as reads.
//! - `ReadHeavy*` types use a [`RwLock`](parking_lot::RwLock) so concurrent readers do not block
//!   each other.
//!
//! | Plain | Counters | Expiring |
//! |-------|----------|----------|
//! | [`WriteHeavyCache`] | [`WriteHeavyCounter`] | [`WriteHeavyExpiringCache`] |
//! | [`ReadHeavyCache`] | [`ReadHeavyCounter`] | [`ReadHeavyExpiringCache`] |
//!
//! # Stampede Protection
//!
//! [`Loader`] wraps any [`Store`] and fills misses through a [`coalesce::Group`], so a burst of
//! readers missing the same key triggers a single fill.
//!
//! ```
//! use std::thread;
//!
//! use coalesce_cache::{Loader, ReadHeavyCache};
//!
//! let loader: Loader<_, &str, u64, String> = Loader::new(ReadHeavyCache::new());
//!
//! thread::scope(|s| {
//!     for _ in 0..8 {
//!         s.spawn(|| {
//!             let value = loader.get_or_fill("answer", || Ok(42)).unwrap();
//!             assert_eq!(value, 42);
//!         });
//!     }
//! });
//! ```
//!
//! # Other Utilities
//!
//! - [`RotatingBuffer`] collects items from many threads and hands them out in one batch.
//! - [`LockManager`] provides one lock per key for serializing work on a single resource.

mod buffer;
mod counter;
mod expiring;
mod keyed_lock;
mod loader;
mod locked;

pub use buffer::RotatingBuffer;
pub use coalesce::Error;
pub use counter::{ReadHeavyCounter, WriteHeavyCounter};
pub use expiring::{ReadHeavyExpiringCache, WriteHeavyExpiringCache};
pub use keyed_lock::{KeyGuard, LockManager};
pub use loader::Loader;
pub use locked::{ReadHeavyCache, Store, WriteHeavyCache};
