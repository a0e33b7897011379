#![allow(dead_code)]
//! Shared fixtures for the engine integration tests

use shardcache_core::{Cacheable, Revision, ShardRoute};
use shardcache_engine::{Repository, Schema, SingleShard};
use std::sync::atomic::{AtomicU32, Ordering};

/// Cached user record
///
/// Setters bump the revision. `visits` is interior-mutable so callers holding
/// a shared handle can still change it.
#[derive(Debug)]
pub struct User {
    pub id: i32,
    pub name: String,
    age: i16,
    level: i32,
    visits: AtomicU32,
    revision: Revision,
}

impl User {
    pub fn new(id: i32, name: &str, age: i16, level: i32) -> Self {
        Self {
            id,
            name: name.to_string(),
            age,
            level,
            visits: AtomicU32::new(0),
            revision: Revision::new(),
        }
    }

    pub fn age(&self) -> i16 {
        self.age
    }

    pub fn set_age(&mut self, age: i16) {
        self.age = age;
        self.revision.bump();
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn set_level(&mut self, level: i32) {
        self.level = level;
        self.revision.bump();
    }

    pub fn visits(&self) -> u32 {
        self.visits.load(Ordering::Acquire)
    }

    pub fn visit(&self) {
        self.visits.fetch_add(1, Ordering::AcqRel);
        self.revision.bump();
    }
}

impl Clone for User {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            age: self.age,
            level: self.level,
            visits: AtomicU32::new(self.visits()),
            revision: self.revision.clone(),
        }
    }
}

impl Cacheable for User {
    fn revision(&self) -> u64 {
        self.revision.get()
    }
}

/// Users keyed by id, all in one shard whatever the shard key
pub struct UsersById;

impl Schema for UsersById {
    type Key = i32;
    type Value = User;
    type ShardKey = i32;

    fn key_of(&self, value: &User) -> i32 {
        value.id
    }

    fn shard_key_of(&self, _value: &User) -> i32 {
        0
    }
}

/// Users keyed by name, sharded by level
pub struct UsersByName;

impl Schema for UsersByName {
    type Key = String;
    type Value = User;
    type ShardKey = i32;

    fn key_of(&self, value: &User) -> String {
        value.name.clone()
    }

    fn shard_key_of(&self, value: &User) -> i32 {
        value.level()
    }
}

pub fn single_shard_users() -> Vec<User> {
    vec![
        User::new(1, "UserA", 10, 0),
        User::new(2, "UserB", 12, 1),
        User::new(3, "UserC", 12, 1),
        User::new(4, "UserD", 15, 2),
        User::new(5, "UserE", 16, 2),
    ]
}

/// Level % 3:
///
/// ```text
/// shard 0: A(0) B(0) I(3) J(3)
/// shard 1: C(1) D(1) K(1)
/// shard 2: E(2) F(2) G(2) H(2)
/// ```
pub fn multiple_shard_users() -> Vec<User> {
    vec![
        User::new(1, "UserA", 10, 0),
        User::new(2, "UserB", 10, 0),
        User::new(3, "UserC", 11, 1),
        User::new(4, "UserD", 12, 1),
        User::new(5, "UserE", 12, 2),
        User::new(6, "UserF", 12, 2),
        User::new(7, "UserG", 12, 2),
        User::new(8, "UserH", 13, 2),
        User::new(9, "UserI", 15, 3),
        User::new(10, "UserJ", 16, 3),
        User::new(11, "UserK", 16, 1),
    ]
}

pub fn level_rule(level: &i32) -> ShardRoute {
    let index = level % 3;
    ShardRoute::new(index, format!("level-mod-{index}"))
}

pub fn single_shard_repository() -> Repository<UsersById> {
    shardcache_utils::tracing::init_for_tests();
    let repository = Repository::builder(UsersById, SingleShard::new("users"))
        .with_records(single_shard_users())
        .build();
    repository.init().expect("single shard fixture loads");
    repository
}

pub fn multiple_shards_repository() -> Repository<UsersByName> {
    shardcache_utils::tracing::init_for_tests();
    let repository = Repository::builder(UsersByName, level_rule)
        .with_records(multiple_shard_users())
        .build();
    repository.init().expect("multiple shard fixture loads");
    repository
}

/// Sorted names held by `index`
pub fn names_in(repository: &Repository<UsersByName>, index: i32) -> Vec<String> {
    let mut names = repository
        .shard(index)
        .map(|shard| shard.keys())
        .unwrap_or_default();
    names.sort();
    names
}

pub fn names(expected: &[&str]) -> Vec<String> {
    expected.iter().map(|name| (*name).to_string()).collect()
}
