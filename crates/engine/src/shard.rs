//! A single partition: one key→value map behind its own reader/writer lock
//!
//! Reads take the shared lock, writes the exclusive one, and
//! `get_or_create` an upgradable read so the common hit path stays
//! concurrent. Each key maps to one [`Handle`]; updates lock the handle and
//! change the value in place, so `ReadMode::Shared` readers keep seeing the
//! stored value. The shard lock is always taken before a handle's lock.

use crate::handle::Handle;
use crate::repository::Topology;
use crate::schema::Schema;
use parking_lot::lock_api::ArcRwLockWriteGuard;
use parking_lot::{RawRwLock, RwLock, RwLockUpgradableReadGuard};
use shardcache_core::{Cacheable, Error, ReadMode, Result, ShardIndex, ShardRoute};
use std::borrow::Cow;
use std::collections::hash_map::{Entry, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

/// Map owned by a shard
pub(crate) type Entries<S> = HashMap<<S as Schema>::Key, Handle<<S as Schema>::Value>>;

/// Exclusive guard over a shard's map that owns its reference to the lock
pub(crate) type EntriesWriteGuard<S> = ArcRwLockWriteGuard<RawRwLock, Entries<S>>;

/// Result of a `try_update`/`try_replace` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Whether the key was present
    pub found: bool,
    /// 1 when the value's revision changed, otherwise 0
    pub affected: usize,
    /// Destination shard when the update moved the entry
    pub relocated_to: Option<ShardIndex>,
}

impl UpdateOutcome {
    const fn missing() -> Self {
        Self {
            found: false,
            affected: 0,
            relocated_to: None,
        }
    }

    #[must_use]
    pub const fn is_affected(&self) -> bool {
        self.affected > 0
    }
}

/// One partition of a repository
pub struct Shard<S: Schema> {
    index: ShardIndex,
    tag: Cow<'static, str>,
    entries: Arc<RwLock<Entries<S>>>,
    topology: Weak<Topology<S>>,
}

impl<S: Schema> Shard<S> {
    pub(crate) fn new(route: &ShardRoute, capacity: usize, topology: Weak<Topology<S>>) -> Self {
        Self {
            index: route.index,
            tag: route.tag.clone(),
            entries: Arc::new(RwLock::new(HashMap::with_capacity(capacity))),
            topology,
        }
    }

    #[must_use]
    pub fn index(&self) -> ShardIndex {
        self.index
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Keys currently held, in no particular order
    #[must_use]
    pub fn keys(&self) -> Vec<S::Key> {
        self.entries.read().keys().cloned().collect()
    }

    /// Every entry, read under one shared lock
    #[must_use]
    pub fn snapshot(&self, mode: ReadMode) -> Vec<(S::Key, Handle<S::Value>)> {
        self.entries
            .read()
            .iter()
            .map(|(key, value)| (key.clone(), value.hand_out(mode)))
            .collect()
    }

    /// Insert a new entry and seed its revision; reports one affected row
    pub fn add(&self, key: S::Key, value: S::Value) -> Result<usize> {
        self.insert(key, Handle::new(value), true)
    }

    pub fn get(&self, key: &S::Key, mode: ReadMode) -> Result<Handle<S::Value>> {
        self.entries
            .read()
            .get(key)
            .map(|value| value.hand_out(mode))
            .ok_or_else(|| Error::key_not_found(key, self.index))
    }

    pub fn try_get(&self, key: &S::Key, mode: ReadMode) -> Option<Handle<S::Value>> {
        self.entries.read().get(key).map(|value| value.hand_out(mode))
    }

    /// Return the entry for `key`, creating it with `factory` when absent
    ///
    /// Only one thread at a time may hold the upgradable section, so the
    /// factory runs at most once per absent key while plain readers proceed.
    /// A created value whose shard key routes elsewhere is rejected with
    /// [`Error::ShardMismatch`] and the key stays absent.
    pub fn get_or_create<F>(&self, key: S::Key, factory: F, mode: ReadMode) -> Result<Handle<S::Value>>
    where
        F: FnOnce() -> Option<S::Value>,
    {
        let entries = self.entries.upgradable_read();
        if let Some(value) = entries.get(&key) {
            return Ok(value.hand_out(mode));
        }

        let mut entries = RwLockUpgradableReadGuard::upgrade(entries);
        let value = factory().ok_or_else(|| Error::null_factory_result(&key))?;

        let topology = self.topology()?;
        let route = topology.route_value(&value);
        if route.index != self.index {
            return Err(Error::shard_mismatch(self.index, route.index));
        }

        topology.record_revision(key.clone(), value.revision());
        debug!(shard = self.index, key = ?key, "entry created by factory");
        let value = Handle::new(value);
        entries.insert(key, value.clone());
        Ok(value.hand_out(mode))
    }

    /// Mutate the stored value in place
    pub fn try_update<F>(&self, key: &S::Key, mutate: F) -> Result<UpdateOutcome>
    where
        F: FnOnce(&mut S::Value),
    {
        self.apply(key, mutate)
    }

    /// Replace the stored value with one derived from it
    ///
    /// The new value is written into the existing handle, so shared readers
    /// see the replacement too.
    pub fn try_replace<F>(&self, key: &S::Key, transform: F) -> Result<UpdateOutcome>
    where
        F: FnOnce(&S::Value) -> S::Value,
    {
        self.apply(key, |value| {
            let next = transform(&*value);
            *value = next;
        })
    }

    pub fn remove(&self, key: &S::Key) -> usize {
        let removed = self.entries.write().remove(key).is_some();
        if removed {
            trace!(shard = self.index, key = ?key, "entry removed");
        }
        usize::from(removed)
    }

    pub fn contains_key(&self, key: &S::Key) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Apply `edit`, settle the affected flag, and move the entry if its
    /// shard key now routes to another shard
    fn apply<F>(&self, key: &S::Key, edit: F) -> Result<UpdateOutcome>
    where
        F: FnOnce(&mut S::Value),
    {
        let topology = self.topology()?;
        let mut entries = self.entries.write();
        let Some(handle) = entries.get(key) else {
            return Ok(UpdateOutcome::missing());
        };

        let (revision, route) = {
            let mut value = handle.write();
            edit(&mut *value);
            (value.revision(), topology.route_value(&*value))
        };
        let affected = usize::from(topology.observe_revision(key, revision));

        if route.index == self.index {
            trace!(shard = self.index, key = ?key, affected, "entry updated in place");
            return Ok(UpdateOutcome {
                found: true,
                affected,
                relocated_to: None,
            });
        }

        let Some(handle) = entries.remove(key) else {
            return Ok(UpdateOutcome::missing());
        };
        // The source lock is released before the destination lock is taken.
        drop(entries);
        self.relocate(&topology, key.clone(), handle, &route)?;

        Ok(UpdateOutcome {
            found: true,
            affected,
            relocated_to: Some(route.index),
        })
    }

    /// Insert an entry already removed from this shard into the shard
    /// `route` points at, creating that shard if needed
    ///
    /// On failure the entry is put back here. If this shard holds the key
    /// again by then, the moving value is dropped and
    /// [`Error::RelocationDiscarded`] is returned.
    pub(crate) fn relocate(
        &self,
        topology: &Arc<Topology<S>>,
        key: S::Key,
        value: Handle<S::Value>,
        route: &ShardRoute,
    ) -> Result<()> {
        let destination = topology.shard_or_create(route);
        let err = match destination.insert(key.clone(), value.clone(), false) {
            Ok(_) => {
                debug!(from = self.index, to = route.index, key = ?key, "entry relocated");
                return Ok(());
            }
            Err(err) => err,
        };

        match self.entries.write().entry(key) {
            Entry::Vacant(slot) => {
                warn!(
                    from = self.index,
                    to = route.index,
                    key = ?slot.key(),
                    error = %err,
                    "relocation failed, restoring entry to its source shard"
                );
                slot.insert(value);
                Err(err)
            }
            Entry::Occupied(slot) => {
                warn!(
                    from = self.index,
                    to = route.index,
                    key = ?slot.key(),
                    error = %err,
                    "relocation failed and the source shard holds the key again, discarding the moving value"
                );
                Err(Error::relocation_discarded(slot.key(), self.index, route.index, err))
            }
        }
    }

    fn insert(&self, key: S::Key, value: Handle<S::Value>, seed_revision: bool) -> Result<usize> {
        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            return Err(Error::duplicate_key(&key, self.index));
        }
        if seed_revision {
            if let Some(topology) = self.topology.upgrade() {
                topology.record_revision(key.clone(), value.read().revision());
            }
        }
        trace!(shard = self.index, key = ?key, "entry added");
        entries.insert(key, value);
        Ok(1)
    }

    /// Exclusive guard that outlives the borrow of `self`
    pub(crate) fn write_owned(&self) -> EntriesWriteGuard<S> {
        self.entries.write_arc()
    }

    fn topology(&self) -> Result<Arc<Topology<S>>> {
        self.topology
            .upgrade()
            .ok_or_else(|| Error::invalid_shard(self.index))
    }
}

impl<S: Schema> fmt::Debug for Shard<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shard")
            .field("index", &self.index)
            .field("tag", &self.tag)
            .field("entry_count", &self.len())
            .finish()
    }
}
