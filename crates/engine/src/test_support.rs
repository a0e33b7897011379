//! Small fixtures for the unit tests in this crate

use crate::repository::Repository;
use crate::schema::Schema;
use crate::sharding::ModuloRule;
use shardcache_core::{Cacheable, Revision};

/// Minimal cached record: `bucket` decides the shard
#[derive(Debug, Clone)]
pub(crate) struct Item {
    pub id: u32,
    pub bucket: i32,
    pub label: String,
    pub revision: Revision,
}

impl Item {
    pub fn new(id: u32, bucket: i32, label: &str) -> Self {
        Self {
            id,
            bucket,
            label: label.to_string(),
            revision: Revision::new(),
        }
    }

    pub fn set_bucket(&mut self, bucket: i32) {
        self.bucket = bucket;
        self.revision.bump();
    }

    pub fn set_label(&mut self, label: &str) {
        self.label = label.to_string();
        self.revision.bump();
    }
}

impl Cacheable for Item {
    fn revision(&self) -> u64 {
        self.revision.get()
    }
}

pub(crate) struct Items;

impl Schema for Items {
    type Key = u32;
    type Value = Item;
    type ShardKey = i32;

    fn key_of(&self, value: &Item) -> u32 {
        value.id
    }

    fn shard_key_of(&self, value: &Item) -> i32 {
        value.bucket
    }
}

/// Three shards (0, 1, 2) with two items each
pub(crate) fn repository() -> Repository<Items> {
    let rule = ModuloRule::new(3).expect("positive shard count");
    let repository = Repository::builder(Items, rule)
        .with_records(vec![
            Item::new(1, 0, "a"),
            Item::new(2, 3, "b"),
            Item::new(3, 1, "c"),
            Item::new(4, 4, "d"),
            Item::new(5, 2, "e"),
            Item::new(6, 5, "f"),
        ])
        .build();
    repository.init().expect("fixture records load");
    repository
}
