//! How values are keyed and partitioned, and where they come from

use shardcache_core::{Cacheable, Result};
use std::fmt::Debug;
use std::hash::Hash;

/// Describes the entries a repository holds
///
/// `key_of` and `shard_key_of` must be pure: the repository calls them on
/// every insert and after every mutation to decide where a value lives.
pub trait Schema: Send + Sync + 'static {
    /// Key unique across the whole repository
    type Key: Eq + Hash + Clone + Debug + Send + Sync + 'static;
    /// Stored value
    type Value: Cacheable;
    /// Attribute fed to the sharding rule
    type ShardKey: Send + Sync + 'static;

    fn key_of(&self, value: &Self::Value) -> Self::Key;

    fn shard_key_of(&self, value: &Self::Value) -> Self::ShardKey;
}

/// Bulk source of the initial records, consumed once by `Repository::init`
pub trait DataLoader<V>: Send + Sync {
    fn load(&self) -> Result<Vec<V>>;
}

impl<V, F> DataLoader<V> for F
where
    F: Fn() -> Result<Vec<V>> + Send + Sync,
{
    fn load(&self) -> Result<Vec<V>> {
        self()
    }
}

/// Loader over records already held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticLoader<V> {
    records: Vec<V>,
}

impl<V> StaticLoader<V> {
    pub fn new(records: Vec<V>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<V: Clone + Send + Sync> DataLoader<V> for StaticLoader<V> {
    fn load(&self) -> Result<Vec<V>> {
        Ok(self.records.clone())
    }
}
