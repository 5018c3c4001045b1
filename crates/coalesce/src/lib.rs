// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Coalesces concurrent calls for the same key into a single execution.
//!
//! This crate provides [`Group`], a mechanism for deduplicating concurrent blocking operations.
//! When multiple threads request the same work (identified by a key), only the first one runs
//! the producer while the others block and receive a clone of its result.
//!
//! # When to Use
//!
//! Use `Group` when you have expensive or rate-limited operations that may be requested
//! concurrently with the same parameters:
//!
//! - **Cache population**: Prevent thundering herd when a cache entry is missing
//! - **Remote calls**: Deduplicate concurrent requests to the same endpoint
//! - **File I/O**: Avoid reading the same file multiple times concurrently
//!
//! # Example
//!
//! ```
//! use std::thread;
//!
//! use coalesce::Group;
//!
//! let group: Group<&str, String, String> = Group::new();
//!
//! thread::scope(|s| {
//!     for _ in 0..4 {
//!         s.spawn(|| {
//!             // Threads that overlap share one execution of this closure.
//!             let outcome = group.work("config", || Ok("loaded".to_string()));
//!             assert_eq!(outcome.into_result().unwrap(), "loaded");
//!         });
//!     }
//! });
//! ```
//!
//! # Retirement
//!
//! A completed call stays attached to its key until it is retired. By default this happens
//! before any caller sees the result, so a call that starts after another returned always runs
//! its own producer. [`Retirement::Deferred`] moves the removal off the caller's path, at the
//! cost of a short window in which new callers still receive the completed result.
//!
//! # Errors and Panics
//!
//! A producer error is stored like a value and every attached caller receives it as
//! [`Error::Producer`]. Nothing is retried. A panicking producer is caught, so callers waiting
//! on it are released with [`Error::Panicked`] instead of blocking forever.
//!
//! # Features
//!
//! - `tokio`: Enables [`Deferrer::new_tokio`]
//!
//! Any other executor can run deferred retirement through [`Deferrer::from_spawner`].

mod builder;
mod call;
mod group;
mod outcome;
mod retirement;

pub use builder::GroupBuilder;
pub use group::Group;
pub use outcome::{Error, Outcome, Panicked};
pub use retirement::{Deferrer, Retirement};
