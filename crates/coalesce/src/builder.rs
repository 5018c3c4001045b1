// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Configuration for a [`Group`](crate::Group).

use std::fmt::{self, Debug};
use std::marker::PhantomData;

use crate::group::Group;
use crate::retirement::Retirement;

/// Configures a [`Group`].
///
/// Created by [`Group::builder`].
///
/// # Examples
///
/// ```
/// use coalesce::{Deferrer, Group, Retirement};
///
/// let group: Group<String, Vec<u8>, String> = Group::builder()
///     .retirement(Retirement::Deferred(Deferrer::new_thread()))
///     .propagate_panics(true)
///     .build();
/// ```
pub struct GroupBuilder<K, T, E> {
    retirement: Retirement,
    propagate_panics: bool,
    _phantom: PhantomData<fn() -> (K, T, E)>,
}

impl<K, T, E> GroupBuilder<K, T, E> {
    pub(crate) fn new() -> Self {
        Self {
            retirement: Retirement::default(),
            propagate_panics: false,
            _phantom: PhantomData,
        }
    }

    /// Sets when completed calls are removed from the group. Defaults to
    /// [`Retirement::Synchronous`].
    #[must_use]
    pub fn retirement(mut self, retirement: Retirement) -> Self {
        self.retirement = retirement;
        self
    }

    /// If `true`, the caller whose producer panicked resumes that panic once the call is
    /// completed, instead of receiving [`Error::Panicked`](crate::Error::Panicked). Callers
    /// that attached to the call receive the error either way. Defaults to `false`.
    #[must_use]
    pub fn propagate_panics(mut self, propagate: bool) -> Self {
        self.propagate_panics = propagate;
        self
    }

    /// Creates the group.
    #[must_use]
    pub fn build(self) -> Group<K, T, E> {
        Group::from_builder(self.retirement, self.propagate_panics)
    }
}

impl<K, T, E> Clone for GroupBuilder<K, T, E> {
    fn clone(&self) -> Self {
        Self {
            retirement: self.retirement.clone(),
            propagate_panics: self.propagate_panics,
            _phantom: PhantomData,
        }
    }
}

impl<K, T, E> Debug for GroupBuilder<K, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupBuilder")
            .field("retirement", &self.retirement)
            .field("propagate_panics", &self.propagate_panics)
            .finish()
    }
}
