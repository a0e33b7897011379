//! Sharding rules: pure functions from a shard key to a shard route

use shardcache_core::{Error, Result, ShardIndex, ShardRoute};
use std::borrow::Cow;

/// Deterministic, side-effect-free mapping from shard key to destination
pub trait ShardingRule<SK>: Send + Sync {
    fn route(&self, shard_key: &SK) -> ShardRoute;
}

impl<SK, F> ShardingRule<SK> for F
where
    F: Fn(&SK) -> ShardRoute + Send + Sync,
{
    fn route(&self, shard_key: &SK) -> ShardRoute {
        self(shard_key)
    }
}

/// Sends every shard key to shard 0
#[derive(Debug, Clone)]
pub struct SingleShard {
    tag: Cow<'static, str>,
}

impl SingleShard {
    pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
        Self { tag: tag.into() }
    }
}

impl Default for SingleShard {
    fn default() -> Self {
        Self::new("default")
    }
}

impl<SK> ShardingRule<SK> for SingleShard {
    fn route(&self, _shard_key: &SK) -> ShardRoute {
        ShardRoute::new(0, self.tag.clone())
    }
}

/// Integer shard keys modulo a fixed shard count, tagged `shard-{index}`
///
/// Uses the truncated remainder, so negative keys land on negative indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuloRule {
    shards: ShardIndex,
}

impl ModuloRule {
    pub fn new(shards: ShardIndex) -> Result<Self> {
        if shards <= 0 {
            return Err(Error::configuration(format!(
                "modulo rule needs a positive shard count, got {shards}"
            )));
        }
        Ok(Self { shards })
    }

    #[must_use]
    pub const fn shards(&self) -> ShardIndex {
        self.shards
    }

    fn route_index(&self, index: ShardIndex) -> ShardRoute {
        ShardRoute::new(index, format!("shard-{index}"))
    }
}

impl ShardingRule<i32> for ModuloRule {
    fn route(&self, shard_key: &i32) -> ShardRoute {
        self.route_index(shard_key % self.shards)
    }
}

impl ShardingRule<i64> for ModuloRule {
    fn route(&self, shard_key: &i64) -> ShardRoute {
        // |k % n| < n, and n fits in a ShardIndex
        self.route_index((shard_key % i64::from(self.shards)) as ShardIndex)
    }
}

impl ShardingRule<u32> for ModuloRule {
    fn route(&self, shard_key: &u32) -> ShardRoute {
        self.route_index((shard_key % self.shards as u32) as ShardIndex)
    }
}
