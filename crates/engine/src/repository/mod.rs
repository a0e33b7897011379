//! The sharded repository
//!
//! A [`Repository`] owns the index→shard table, the sharding rule, and the
//! global version index. Point operations resolve their target shard through
//! the rule and delegate to [`Shard`]. Writes (`init`, `add`, relocation)
//! create shards on first use; every other operation fails with
//! [`Error::InvalidShard`] when the resolved index has no shard yet.

mod builder;

pub use builder::RepositoryBuilder;

use crate::config::RepositoryConfig;
use crate::handle::Handle;
use crate::schema::{DataLoader, Schema};
use crate::shard::Shard;
use crate::sharding::ShardingRule;
use crate::transaction::UnitOfWork;
use crate::write_back::WriteBack;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use shardcache_core::{Error, ReadMode, Result, ShardIndex, ShardRoute};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::thread::ThreadId;
use tracing::{debug, info, info_span};

/// State shared between a repository and its shards
pub(crate) struct Topology<S: Schema> {
    schema: S,
    rule: Box<dyn ShardingRule<S::ShardKey>>,
    shards: RwLock<BTreeMap<ShardIndex, Arc<Shard<S>>>>,
    versions: DashMap<S::Key, u64>,
    config: RepositoryConfig,
}

impl<S: Schema> Topology<S> {
    pub(crate) fn schema(&self) -> &S {
        &self.schema
    }

    pub(crate) fn route(&self, shard_key: &S::ShardKey) -> ShardRoute {
        self.rule.route(shard_key)
    }

    pub(crate) fn route_value(&self, value: &S::Value) -> ShardRoute {
        self.route(&self.schema.shard_key_of(value))
    }

    pub(crate) fn shard(&self, index: ShardIndex) -> Option<Arc<Shard<S>>> {
        self.shards.read().get(&index).cloned()
    }

    /// Shard at `route.index`, created with `route.tag` if it does not exist
    pub(crate) fn shard_or_create(self: &Arc<Self>, route: &ShardRoute) -> Arc<Shard<S>> {
        if let Some(shard) = self.shard(route.index) {
            return shard;
        }

        let mut shards = self.shards.write();
        let shard = shards.entry(route.index).or_insert_with(|| {
            debug!(shard = route.index, tag = %route.tag, "creating shard");
            Arc::new(Shard::new(
                route,
                self.config.shard_capacity,
                Arc::downgrade(self),
            ))
        });
        Arc::clone(shard)
    }

    /// Seed the version index at insertion
    pub(crate) fn record_revision(&self, key: S::Key, revision: u64) {
        self.versions.insert(key, revision);
    }

    /// Compare `revision` against the recorded one, storing it when it
    /// differs. Returns whether the value changed.
    pub(crate) fn observe_revision(&self, key: &S::Key, revision: u64) -> bool {
        match self.versions.entry(key.clone()) {
            Entry::Occupied(mut recorded) => {
                if *recorded.get() == revision {
                    false
                } else {
                    recorded.insert(revision);
                    true
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(revision);
                true
            }
        }
    }
}

/// Sharded in-process cache over the entries described by `S`
pub struct Repository<S: Schema> {
    topology: Arc<Topology<S>>,
    loader: Box<dyn DataLoader<S::Value>>,
    write_back: Arc<dyn WriteBack>,
    transactions: DashMap<ThreadId, ShardIndex>,
}

impl<S: Schema> Repository<S> {
    /// Start building a repository over `schema`, partitioned by `rule`
    pub fn builder<R>(schema: S, rule: R) -> RepositoryBuilder<S>
    where
        R: ShardingRule<S::ShardKey> + 'static,
    {
        RepositoryBuilder::new(schema, Box::new(rule))
    }

    pub(crate) fn from_parts(
        schema: S,
        rule: Box<dyn ShardingRule<S::ShardKey>>,
        loader: Box<dyn DataLoader<S::Value>>,
        write_back: Arc<dyn WriteBack>,
        config: RepositoryConfig,
    ) -> Self {
        Self {
            topology: Arc::new(Topology {
                schema,
                rule,
                shards: RwLock::new(BTreeMap::new()),
                versions: DashMap::new(),
                config,
            }),
            loader,
            write_back,
            transactions: DashMap::new(),
        }
    }

    /// Populate the repository from the data loader
    ///
    /// Meant to run once. A second call re-inserts the same keys and fails
    /// with [`Error::DuplicateKey`] on the first one.
    pub fn init(&self) -> Result<usize> {
        let span = info_span!("init", repository = %self.topology.config.name);
        let _entered = span.enter();

        let records = self.loader.load()?;
        let mut loaded = 0;
        for record in records {
            let key = self.topology.schema.key_of(&record);
            let route = self.topology.route_value(&record);
            loaded += self.topology.shard_or_create(&route).add(key, record)?;
        }

        info!(
            records = loaded,
            shards = self.shard_count(),
            "repository initialised"
        );
        Ok(loaded)
    }

    /// Insert `value` into the shard its shard key routes to, creating that
    /// shard if needed
    pub fn add(&self, key: S::Key, value: S::Value) -> Result<usize> {
        let route = self.topology.route_value(&value);
        self.topology.shard_or_create(&route).add(key, value)
    }

    pub fn get(&self, key: &S::Key, shard_key: &S::ShardKey, mode: ReadMode) -> Result<Handle<S::Value>> {
        self.resolve(shard_key)?.get(key, mode)
    }

    /// Like [`Repository::get`] but reports a missing key as `None`
    pub fn try_get(
        &self,
        key: &S::Key,
        shard_key: &S::ShardKey,
        mode: ReadMode,
    ) -> Result<Option<Handle<S::Value>>> {
        Ok(self.resolve(shard_key)?.try_get(key, mode))
    }

    /// [`Repository::get`] with the configured default read mode
    pub fn get_default(&self, key: &S::Key, shard_key: &S::ShardKey) -> Result<Handle<S::Value>> {
        self.get(key, shard_key, self.topology.config.default_read_mode)
    }

    /// [`Repository::try_get`] with the configured default read mode
    pub fn try_get_default(
        &self,
        key: &S::Key,
        shard_key: &S::ShardKey,
    ) -> Result<Option<Handle<S::Value>>> {
        self.try_get(key, shard_key, self.topology.config.default_read_mode)
    }

    pub fn get_or_create<F>(
        &self,
        key: S::Key,
        factory: F,
        shard_key: &S::ShardKey,
        mode: ReadMode,
    ) -> Result<Handle<S::Value>>
    where
        F: FnOnce() -> Option<S::Value>,
    {
        self.resolve(shard_key)?.get_or_create(key, factory, mode)
    }

    /// Return the entry for `key`, inserting `value` when absent; the target
    /// shard comes from `value` itself
    pub fn get_or_insert(&self, key: S::Key, value: S::Value, mode: ReadMode) -> Result<Handle<S::Value>> {
        let shard_key = self.topology.schema.shard_key_of(&value);
        self.get_or_create(key, move || Some(value), &shard_key, mode)
    }

    /// Mutate an entry in place; returns the affected flag
    ///
    /// A missing key is `Ok(false)`. When the mutation changes the shard key
    /// the entry moves to its new shard before this returns.
    pub fn try_update<F>(&self, key: &S::Key, shard_key: &S::ShardKey, mutate: F) -> Result<bool>
    where
        F: FnOnce(&mut S::Value),
    {
        Ok(self.resolve(shard_key)?.try_update(key, mutate)?.is_affected())
    }

    /// Replace an entry with a value derived from it; returns the affected flag
    pub fn try_replace<F>(&self, key: &S::Key, shard_key: &S::ShardKey, transform: F) -> Result<bool>
    where
        F: FnOnce(&S::Value) -> S::Value,
    {
        Ok(self.resolve(shard_key)?.try_replace(key, transform)?.is_affected())
    }

    pub fn remove(&self, key: &S::Key, shard_key: &S::ShardKey) -> Result<bool> {
        Ok(self.resolve(shard_key)?.remove(key) > 0)
    }

    pub fn contains_key(&self, key: &S::Key, shard_key: &S::ShardKey) -> Result<bool> {
        Ok(self.resolve(shard_key)?.contains_key(key))
    }

    #[must_use]
    pub fn shard(&self, index: ShardIndex) -> Option<Arc<Shard<S>>> {
        self.topology.shard(index)
    }

    /// Indices of the existing shards, ascending
    #[must_use]
    pub fn shard_indices(&self) -> Vec<ShardIndex> {
        self.topology.shards.read().keys().copied().collect()
    }

    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.topology.shards.read().len()
    }

    /// Entries across all shards
    ///
    /// Shards are counted one after another, so a relocation running
    /// concurrently may be missed or counted twice.
    #[must_use]
    pub fn len(&self) -> usize {
        let shards: Vec<_> = self.topology.shards.read().values().cloned().collect();
        shards.iter().map(|shard| shard.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Revision recorded in the global version index for `key`
    #[must_use]
    pub fn revision_of(&self, key: &S::Key) -> Option<u64> {
        self.topology.versions.get(key).map(|recorded| *recorded)
    }

    #[must_use]
    pub fn schema(&self) -> &S {
        &self.topology.schema
    }

    #[must_use]
    pub fn config(&self) -> &RepositoryConfig {
        &self.topology.config
    }

    /// Sink that mirrors changes to the system of record
    #[must_use]
    pub fn write_back(&self) -> &Arc<dyn WriteBack> {
        &self.write_back
    }

    /// A fresh, idle unit of work bound to this repository
    #[must_use]
    pub fn transaction(&self) -> UnitOfWork<'_, S> {
        UnitOfWork::new(self)
    }

    pub(crate) fn topology(&self) -> &Arc<Topology<S>> {
        &self.topology
    }

    pub(crate) fn transactions(&self) -> &DashMap<ThreadId, ShardIndex> {
        &self.transactions
    }

    /// Existing shard for `shard_key`
    pub(crate) fn resolve(&self, shard_key: &S::ShardKey) -> Result<Arc<Shard<S>>> {
        let route = self.topology.route(shard_key);
        self.topology
            .shard(route.index)
            .ok_or_else(|| Error::invalid_shard(route.index))
    }
}

impl<S: Schema> fmt::Debug for Repository<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.topology.config.name)
            .field("shards", &self.shard_indices())
            .field("tracked_keys", &self.topology.versions.len())
            .field("active_transactions", &self.transactions.len())
            .finish()
    }
}

