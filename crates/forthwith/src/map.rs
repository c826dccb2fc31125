// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`EventualMap`] for coalescing identical lookups.

use std::{borrow::Borrow, fmt::Debug, hash::Hash};

use ahash::RandomState;
use dashmap::{DashMap, mapref::entry::Entry};

use crate::{Eventual, Launcher};

/// A keyed set of [`Eventual`]s that coalesces concurrent requests for the same key.
///
/// The first caller for a key starts the computation; every later caller receives a
/// handle to that same computation, whether it is still running or already completed,
/// and its closure is dropped without running. Successful results stay in the map,
/// acting as a memo, until they are removed or evicted.
///
/// Entries whose computation panicked or was abandoned are replaced by the next call
/// to [`EventualMap::get_or_spawn`], so failures are not memoized.
///
/// # Examples
///
/// ```rust
/// use forthwith::EventualMap;
///
/// let lookups: EventualMap<&str, String> = EventualMap::new();
///
/// let first = lookups.get_or_spawn("user:123", || "Alice".to_string());
/// let second = lookups.get_or_spawn("user:123", || unreachable!("already requested"));
///
/// assert_eq!(first.wait().unwrap(), "Alice");
/// assert_eq!(second.wait().unwrap(), "Alice");
/// ```
pub struct EventualMap<K, T> {
    entries: DashMap<K, Eventual<T>, RandomState>,
    launcher: Launcher,
}

impl<K, T> Default for EventualMap<K, T>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::with_launcher(Launcher::default())
    }
}

impl<K, T> EventualMap<K, T>
where
    K: Hash + Eq,
{
    /// Creates an empty map whose computations run on dedicated threads.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map whose computations are started by `launcher`.
    #[must_use]
    pub fn with_launcher(launcher: Launcher) -> Self {
        Self {
            entries: DashMap::with_hasher(RandomState::new()),
            launcher,
        }
    }

    /// Returns the computation for `key`, starting `func` if there is none yet.
    ///
    /// `func` is started while the key's shard is locked, so it must not be run inline
    /// by a custom launcher if it accesses this map.
    pub fn get_or_spawn<F>(&self, key: K, func: F) -> Eventual<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        match self.entries.entry(key) {
            Entry::Occupied(mut entry) => {
                if matches!(entry.get().try_get(), Some(Err(_))) {
                    let eventual = self.launcher.spawn(func);
                    entry.insert(eventual.clone());
                    eventual
                } else {
                    entry.get().clone()
                }
            }
            Entry::Vacant(entry) => {
                let eventual = self.launcher.spawn(func);
                entry.insert(eventual.clone());
                eventual
            }
        }
    }

    /// Returns the computation for `key`, if any.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<Eventual<T>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Removes the computation for `key` from the map.
    ///
    /// Holders of the returned or previously obtained handles are unaffected; the
    /// computation keeps running.
    pub fn remove<Q>(&self, key: &Q) -> Option<Eventual<T>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key).map(|(_, eventual)| eventual)
    }

    /// Removes every completed computation and returns how many were removed.
    pub fn evict_completed(&self) -> usize {
        let mut evicted = 0;
        self.entries.retain(|_, eventual| {
            let keep = !eventual.is_completed();
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }

    /// Returns the number of keys in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, T> Debug for EventualMap<K, T>
where
    K: Hash + Eq,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventualMap")
            .field("len", &self.entries.len())
            .field("launcher", &self.launcher)
            .finish()
    }
}
