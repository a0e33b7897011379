//! Sharded in-process cache repository for `shardcache`.
//!
//! ## Key Components
//!
//! - **`repository`**: the [`Repository`] that owns the shard table, the
//!   sharding rule and the global version index, plus its builder.
//! - **`shard`**: one partition with its own reader/writer lock; point
//!   operations and relocation live here.
//! - **`transaction`**: the [`UnitOfWork`] that chains several operations on
//!   one shard under a single held write lock.
//! - **`sharding`** and **`schema`**: how values are keyed and partitioned,
//!   and the loader seam that supplies the initial records.
//! - **`handle`**: the [`Handle`] every read returns; `Shared` reads alias
//!   the stored value, `DeepClone` reads get a detached copy.
//! - **`config`**: layered repository configuration (defaults, file, env).
//! - **`write_back`**: the async seam for mirroring changes to a backing
//!   store.
//!
//! ## Example
//!
//! ```no_run
//! use shardcache_core::{Cacheable, ReadMode, Revision};
//! use shardcache_engine::{ModuloRule, Repository, Schema};
//!
//! #[derive(Clone)]
//! struct Account {
//!     id: u32,
//!     tier: i32,
//!     revision: Revision,
//! }
//!
//! impl Cacheable for Account {
//!     fn revision(&self) -> u64 {
//!         self.revision.get()
//!     }
//! }
//!
//! struct Accounts;
//!
//! impl Schema for Accounts {
//!     type Key = u32;
//!     type Value = Account;
//!     type ShardKey = i32;
//!
//!     fn key_of(&self, value: &Account) -> u32 {
//!         value.id
//!     }
//!
//!     fn shard_key_of(&self, value: &Account) -> i32 {
//!         value.tier
//!     }
//! }
//!
//! # fn main() -> shardcache_core::Result<()> {
//! let repository = Repository::builder(Accounts, ModuloRule::new(4)?)
//!     .with_records(vec![Account { id: 1, tier: 2, revision: Revision::new() }])
//!     .build();
//! repository.init()?;
//!
//! let account = repository.get(&1, &2, ReadMode::DeepClone)?;
//! assert_eq!(account.read().tier, 2);
//!
//! repository
//!     .transaction()
//!     .begin(&2)?
//!     .update_item(1, |account| {
//!         account.tier = 3;
//!         account.revision.bump();
//!     })?
//!     .go()?;
//! assert!(repository.contains_key(&1, &3)?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod handle;
pub mod repository;
pub mod schema;
pub mod shard;
pub mod sharding;
pub mod transaction;
pub mod write_back;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{
    ConfigSource, LoadedConfig, RepositoryConfig, RepositoryConfigBuilder, RepositoryConfigLoader,
    RepositoryConfigOverrides,
};
pub use handle::Handle;
pub use repository::{Repository, RepositoryBuilder};
pub use schema::{DataLoader, Schema, StaticLoader};
pub use shard::{Shard, UpdateOutcome};
pub use sharding::{ModuloRule, ShardingRule, SingleShard};
pub use transaction::UnitOfWork;
pub use write_back::{ChangedFields, NoopWriteBack, WriteBack};
