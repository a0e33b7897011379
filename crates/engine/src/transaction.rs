//! Unit of work: several point operations on one shard under one write lock
//!
//! ```text
//!   Idle --begin--> Active --go / failing step / drop--> Idle
//! ```
//!
//! While active the unit owns the target shard's write guard, so every other
//! reader and writer of that shard (other units of work included) waits
//! until it returns to idle. The guard is `!Send`, which keeps a unit of work
//! on the thread that began it. The repository additionally tracks active
//! units per thread so a second `begin` on the same thread is refused instead
//! of deadlocking on the shard lock.
//!
//! A failing step releases the lock and returns the unit to idle before the
//! error reaches the caller. Steps already applied are kept.
//!
//! Calling plain repository operations on the locked shard from inside an
//! active unit of work blocks forever; go through the unit instead.

use crate::handle::Handle;
use crate::repository::{Repository, Topology};
use crate::schema::Schema;
use crate::shard::{EntriesWriteGuard, Shard};
use shardcache_core::{Cacheable, Error, Result, ShardIndex, ShardRoute};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, trace, warn};

/// Handle for a multi-step transaction confined to one shard
pub struct UnitOfWork<'r, S: Schema> {
    repository: &'r Repository<S>,
    state: State<S>,
}

enum State<S: Schema> {
    Idle,
    Active(Box<ActiveWork<S>>),
}

struct ActiveWork<S: Schema> {
    shard: Arc<Shard<S>>,
    entries: EntriesWriteGuard<S>,
    carried: Option<(S::Key, Handle<S::Value>)>,
    pending: Vec<Relocation<S>>,
    thread: ThreadId,
}

/// Entry taken out of the active shard, waiting for the lock to be released
struct Relocation<S: Schema> {
    key: S::Key,
    value: Handle<S::Value>,
    route: ShardRoute,
}

impl<'r, S: Schema> UnitOfWork<'r, S> {
    pub(crate) fn new(repository: &'r Repository<S>) -> Self {
        Self {
            repository,
            state: State::Idle,
        }
    }

    /// Lock the shard `shard_key` routes to
    ///
    /// Fails with [`Error::InvalidTransactionState`] if this unit, or any
    /// other unit on the current thread, is already active. The running unit
    /// is left untouched in that case.
    pub fn begin(&mut self, shard_key: &S::ShardKey) -> Result<&mut Self> {
        if self.is_active() {
            return Err(Error::already_active());
        }

        let shard = self.repository.resolve(shard_key)?;
        let thread = thread::current().id();
        {
            let transactions = self.repository.transactions();
            if transactions.contains_key(&thread) {
                return Err(Error::already_active());
            }
            transactions.insert(thread, shard.index());
        }

        let entries = shard.write_owned();
        debug!(shard = shard.index(), tag = shard.tag(), "unit of work started");
        self.state = State::Active(Box::new(ActiveWork {
            shard,
            entries,
            carried: None,
            pending: Vec::new(),
            thread,
        }));
        Ok(self)
    }

    /// Insert a new entry into the locked shard
    pub fn add_item(&mut self, key: S::Key, value: S::Value) -> Result<&mut Self> {
        self.step(|work, topology| {
            let index = work.shard.index();
            let route = topology.route_value(&value);
            if route.index != index {
                return Err(Error::shard_mismatch(index, route.index));
            }
            if work.entries.contains_key(&key) {
                return Err(Error::duplicate_key(&key, index));
            }
            topology.record_revision(key.clone(), value.revision());
            trace!(shard = index, key = ?key, "unit of work added entry");
            work.entries.insert(key, Handle::new(value));
            Ok(())
        })
    }

    /// Carry the entry for `key` into the following steps
    pub fn get_item(&mut self, key: S::Key) -> Result<&mut Self> {
        self.step(|work, _| {
            let value = work
                .entries
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::key_not_found(&key, work.shard.index()))?;
            work.carried = Some((key, value));
            Ok(())
        })
    }

    /// Mutate the carried entry in place
    pub fn do_with_result<F>(&mut self, mutate: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut S::Value),
    {
        self.step(|work, topology| {
            let key = work.carried_key()?;
            work.edit(&key, mutate)?;
            work.settle(topology, key);
            Ok(())
        })
    }

    /// Replace the carried entry with a value derived from it
    pub fn map_result<F>(&mut self, transform: F) -> Result<&mut Self>
    where
        F: FnOnce(&S::Value) -> S::Value,
    {
        self.step(|work, topology| {
            let key = work.carried_key()?;
            work.edit(&key, |value| {
                let next = transform(&*value);
                *value = next;
            })?;
            work.settle(topology, key);
            Ok(())
        })
    }

    /// Mutate the entry for `key`, read fresh from the locked shard
    pub fn update_item<F>(&mut self, key: S::Key, mutate: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut S::Value),
    {
        self.step(|work, topology| {
            work.edit(&key, mutate)?;
            work.settle(topology, key);
            Ok(())
        })
    }

    /// Replace the entry for `key` with a value derived from it
    pub fn replace_item<F>(&mut self, key: S::Key, transform: F) -> Result<&mut Self>
    where
        F: FnOnce(&S::Value) -> S::Value,
    {
        self.step(|work, topology| {
            work.edit(&key, |value| {
                let next = transform(&*value);
                *value = next;
            })?;
            work.settle(topology, key);
            Ok(())
        })
    }

    /// Drop `key` from the locked shard; a missing key is not an error
    pub fn remove_item(&mut self, key: S::Key) -> Result<&mut Self> {
        self.step(|work, _| {
            if work.entries.remove(&key).is_some() {
                trace!(shard = work.shard.index(), key = ?key, "unit of work removed entry");
            }
            Ok(())
        })
    }

    /// Release the lock and return to idle
    ///
    /// Entries whose shard key moved during the unit are inserted into their
    /// new shards here. If one of those inserts fails the entry goes back to
    /// the shard it came from and the first such error is returned.
    pub fn go(&mut self) -> Result<()> {
        if !self.is_active() {
            return Err(Error::not_active());
        }
        self.finish()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active(_))
    }

    /// Index of the locked shard
    #[must_use]
    pub fn shard_index(&self) -> Option<ShardIndex> {
        self.active().map(|work| work.shard.index())
    }

    /// Tag of the locked shard
    #[must_use]
    pub fn shard_tag(&self) -> Option<&str> {
        self.active().map(|work| work.shard.tag())
    }

    /// Handle loaded by the last `get_item`
    ///
    /// Do not lock it for writing while the unit is active; steps lock it
    /// themselves.
    #[must_use]
    pub fn carried(&self) -> Option<&Handle<S::Value>> {
        self.active()
            .and_then(|work| work.carried.as_ref())
            .map(|(_, value)| value)
    }

    fn active(&self) -> Option<&ActiveWork<S>> {
        match &self.state {
            State::Active(work) => Some(work),
            State::Idle => None,
        }
    }

    fn step<F>(&mut self, op: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut ActiveWork<S>, &Topology<S>) -> Result<()>,
    {
        let repository = self.repository;
        let topology: &Topology<S> = repository.topology();
        let State::Active(work) = &mut self.state else {
            return Err(Error::not_active());
        };

        match op(&mut **work, topology) {
            Ok(()) => Ok(self),
            Err(err) => {
                warn!(
                    shard = ?self.shard_index(),
                    error = %err,
                    "unit of work step failed, releasing shard lock"
                );
                if let Err(flush) = self.finish() {
                    warn!(error = %flush, "pending relocation failed while aborting unit of work");
                }
                Err(err)
            }
        }
    }

    fn finish(&mut self) -> Result<()> {
        let State::Active(work) = std::mem::replace(&mut self.state, State::Idle) else {
            return Ok(());
        };
        let ActiveWork {
            shard,
            entries,
            pending,
            thread,
            ..
        } = *work;

        drop(entries);
        self.repository.transactions().remove(&thread);
        debug!(
            shard = shard.index(),
            relocations = pending.len(),
            "unit of work finished"
        );

        let topology = self.repository.topology();
        let mut first_error = None;
        for Relocation { key, value, route } in pending {
            if let Err(err) = shard.relocate(topology, key, value, &route) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<S: Schema> ActiveWork<S> {
    fn carried_key(&self) -> Result<S::Key> {
        self.carried
            .as_ref()
            .map(|(key, _)| key.clone())
            .ok_or(Error::NoCarriedValue)
    }

    /// Apply `edit` to the stored value for `key`
    fn edit<F>(&self, key: &S::Key, edit: F) -> Result<()>
    where
        F: FnOnce(&mut S::Value),
    {
        let handle = self
            .entries
            .get(key)
            .ok_or_else(|| Error::key_not_found(key, self.shard.index()))?;
        edit(&mut *handle.write());
        Ok(())
    }

    /// Queue the entry for relocation if its shard key now routes elsewhere
    fn settle(&mut self, topology: &Topology<S>, key: S::Key) {
        let Some(value) = self.entries.get(&key) else {
            return;
        };
        let route = topology.route_value(&*value.read());
        if route.index == self.shard.index() {
            return;
        }

        if let Some(value) = self.entries.remove(&key) {
            debug!(
                from = self.shard.index(),
                to = route.index,
                key = ?key,
                "entry leaves the locked shard, relocating on release"
            );
            self.pending.push(Relocation { key, value, route });
        }
    }
}

impl<S: Schema> Drop for UnitOfWork<'_, S> {
    fn drop(&mut self) {
        if self.is_active() {
            warn!(
                shard = ?self.shard_index(),
                "unit of work dropped while active, releasing shard lock"
            );
            if let Err(err) = self.finish() {
                warn!(error = %err, "pending relocation failed while releasing unit of work");
            }
        }
    }
}

impl<S: Schema> fmt::Debug for UnitOfWork<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("active", &self.is_active())
            .field("shard", &self.shard_index())
            .field(
                "carried",
                &self
                    .active()
                    .and_then(|work| work.carried.as_ref())
                    .map(|(key, _)| key),
            )
            .finish()
    }
}
