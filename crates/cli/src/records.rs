//! Generic JSON records the inspector loads into a repository

use serde::{Deserialize, Serialize};
use shardcache_core::{Cacheable, Error, Result, Revision};
use shardcache_engine::Schema;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One record from the input file
///
/// ```json
/// { "key": "user-1", "shard_key": 4, "fields": { "age": 17 } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub shard_key: i32,
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    revision: Revision,
}

impl Record {
    pub fn set_field(&mut self, name: &str, value: serde_json::Value) {
        self.fields.insert(name.to_string(), value);
        self.revision.bump();
    }

    pub fn set_shard_key(&mut self, shard_key: i32) {
        self.shard_key = shard_key;
        self.revision.bump();
    }
}

impl Cacheable for Record {
    fn revision(&self) -> u64 {
        self.revision.get()
    }
}

/// Records keyed by `key`, sharded by `shard_key`
pub struct Records;

impl Schema for Records {
    type Key = String;
    type Value = Record;
    type ShardKey = i32;

    fn key_of(&self, value: &Record) -> String {
        value.key.clone()
    }

    fn shard_key_of(&self, value: &Record) -> i32 {
        value.shard_key
    }
}

/// Loader reading a JSON array of records from `path`
pub fn file_loader(path: PathBuf) -> impl Fn() -> Result<Vec<Record>> + Send + Sync {
    move || read_records(&path)
}

fn read_records(path: &Path) -> Result<Vec<Record>> {
    let raw = fs::read_to_string(path)
        .map_err(|e| Error::file_system(format!("read {}", path.display()), e))?;
    serde_json::from_str(&raw).map_err(|e| {
        Error::load_with_source(format!("invalid records in {}", path.display()), e)
    })
}
