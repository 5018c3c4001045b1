// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! When a completed call is removed from its group.

use std::fmt::{self, Debug};
use std::sync::Arc;
use std::thread;

use anyspawn::Spawner;

/// A unit of background work handed to a [`Deferrer`].
pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// Controls when a completed call is retired, i.e. removed from the group so that the next
/// call for the same key runs the producer again.
#[derive(Debug, Clone, Default)]
pub enum Retirement {
    /// Retire the call before any caller sees its result.
    ///
    /// Once any caller has observed a result, the next call for that key is guaranteed to run
    /// the producer again. Costs one extra registry lock acquisition on the executing caller's
    /// path.
    #[default]
    Synchronous,

    /// Return the result to the executing caller immediately and retire the call in the
    /// background.
    ///
    /// Until the deferred task runs, new calls for the same key still attach to the completed
    /// call and receive its result instead of running the producer. The window is bounded by
    /// how long the [`Deferrer`] takes to start the task, which for
    /// [`Deferrer::new_thread`] is one thread spawn.
    Deferred(Deferrer),
}

/// Runs retirement tasks off the caller's path.
///
/// Works with any executor: spawn a thread per task, or hand tasks to an async runtime through
/// an [`anyspawn::Spawner`].
///
/// # Examples
///
/// ```
/// use coalesce::{Deferrer, Group, Retirement};
///
/// let group: Group<&str, u32, ()> = Group::builder()
///     .retirement(Retirement::Deferred(Deferrer::new_thread()))
///     .build();
///
/// let outcome = group.work("key", || Ok(7));
/// assert_eq!(outcome.into_result(), Ok(7));
/// ```
#[derive(Clone)]
pub struct Deferrer(DeferrerKind);

#[derive(Clone)]
enum DeferrerKind {
    Thread,
    Spawner(Spawner),
}

impl Deferrer {
    /// Runs each task on a fresh OS thread.
    ///
    /// If the thread cannot be spawned the task runs inline on the calling thread, so the call
    /// is still retired, only synchronously.
    #[must_use]
    pub fn new_thread() -> Self {
        Self(DeferrerKind::Thread)
    }

    /// Runs each task as a future on `spawner`.
    ///
    /// The spawner must eventually poll the future; a dropped task leaves its call in the group
    /// and every later call for that key keeps receiving the old result.
    ///
    /// # Examples
    ///
    /// ```
    /// use anyspawn::Spawner;
    /// use coalesce::Deferrer;
    ///
    /// // Drives each task to completion inline, which is equivalent to synchronous retirement.
    /// let deferrer = Deferrer::from_spawner(Spawner::new_custom(|fut| futures::executor::block_on(fut)));
    /// ```
    #[must_use]
    pub fn from_spawner(spawner: Spawner) -> Self {
        Self(DeferrerKind::Spawner(spawner))
    }

    /// Runs each task on the Tokio runtime that is current at construction.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[cfg(feature = "tokio")]
    #[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
    #[must_use]
    pub fn new_tokio() -> Self {
        // Captured here so that retiring from a plain thread does not need a runtime context.
        let handle = ::tokio::runtime::Handle::current();
        Self::from_spawner(Spawner::new_custom(move |fut| {
            drop(handle.spawn(fut));
        }))
    }

    pub(crate) fn defer(&self, task: Task) {
        match &self.0 {
            DeferrerKind::Thread => spawn_thread(task),
            DeferrerKind::Spawner(spawner) => {
                // Detached: nothing waits for the retirement to finish.
                drop(spawner.spawn(async move { task() }));
            }
        }
    }
}

impl From<Spawner> for Deferrer {
    fn from(spawner: Spawner) -> Self {
        Self::from_spawner(spawner)
    }
}

impl Debug for Deferrer {
    #[cfg_attr(test, mutants::skip)] // Opaque output, nothing to mutate.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.0 {
            DeferrerKind::Thread => "thread",
            DeferrerKind::Spawner(_) => "spawner",
        };
        f.debug_tuple("Deferrer").field(&kind).finish()
    }
}

fn spawn_thread(task: Task) {
    // `spawn` drops the closure when it fails, so the task sits in a slot either side can take.
    let slot = Arc::new(parking_lot::Mutex::new(Some(task)));
    let spawned_slot = Arc::clone(&slot);
    let spawned = thread::Builder::new()
        .name("coalesce-retire".to_string())
        .spawn(move || {
            if let Some(task) = spawned_slot.lock().take() {
                task();
            }
        });

    if let Err(e) = spawned {
        tracing::warn!(error = %e, "coalesce.retirement falling back to inline removal");
        if let Some(task) = slot.lock().take() {
            task();
        }
    }
}
