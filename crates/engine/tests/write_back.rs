//! Driving the write-back seam from a layer over the repository

mod common;

use async_trait::async_trait;
use common::{single_shard_repository, User, UsersById};
use shardcache_core::{Error, Result};
use shardcache_engine::{ChangedFields, Repository, SingleShard, WriteBack};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
enum Synced {
    Insert,
    Delete,
    Update(ChangedFields),
}

#[derive(Default)]
struct RecordingWriteBack {
    calls: Mutex<Vec<Synced>>,
    reject_deletes: bool,
}

#[async_trait]
impl WriteBack for RecordingWriteBack {
    async fn sync_insert(&self) -> Result<bool> {
        self.calls.lock().await.push(Synced::Insert);
        Ok(true)
    }

    async fn sync_delete(&self) -> Result<bool> {
        if self.reject_deletes {
            return Err(Error::write_back("delete", "store is read-only"));
        }
        self.calls.lock().await.push(Synced::Delete);
        Ok(true)
    }

    async fn sync_update(&self, changed_fields: &ChangedFields) -> Result<bool> {
        self.calls
            .lock()
            .await
            .push(Synced::Update(changed_fields.clone()));
        Ok(true)
    }
}

/// Applies an age change to the cache, then mirrors it when it was affected
async fn set_age(repository: &Repository<UsersById>, id: i32, age: i16) -> Result<bool> {
    if !repository.try_update(&id, &0, |user| user.set_age(age))? {
        return Ok(false);
    }
    let mut fields = ChangedFields::new();
    fields.insert("age".to_string(), serde_json::json!(age));
    repository.write_back().sync_update(&fields).await
}

#[tokio::test]
async fn test_default_write_back_is_noop() {
    let repository = single_shard_repository();

    assert!(set_age(&repository, 1, 33).await.unwrap());
    assert!(repository.write_back().sync_insert().await.unwrap());
    assert!(repository.write_back().sync_delete().await.unwrap());
}

#[tokio::test]
async fn test_custom_write_back_sees_mirrored_changes() {
    let sink = Arc::new(RecordingWriteBack::default());
    let repository = Repository::builder(UsersById, SingleShard::default())
        .with_records(common::single_shard_users())
        .with_write_back(sink.clone())
        .build();
    repository.init().unwrap();

    repository.add(6, User::new(6, "UserF", 10, 0)).unwrap();
    repository.write_back().sync_insert().await.unwrap();
    assert!(set_age(&repository, 6, 11).await.unwrap());
    // Missing keys are not mirrored.
    assert!(!set_age(&repository, 7, 11).await.unwrap());

    let calls = sink.calls.lock().await.clone();
    let mut expected = ChangedFields::new();
    expected.insert("age".to_string(), serde_json::json!(11));
    assert_eq!(calls, vec![Synced::Insert, Synced::Update(expected)]);
}

#[tokio::test]
async fn test_write_back_errors_surface() {
    let sink = Arc::new(RecordingWriteBack {
        reject_deletes: true,
        ..RecordingWriteBack::default()
    });
    let repository = Repository::builder(UsersById, SingleShard::default())
        .with_write_back(sink)
        .build();

    let err = repository.write_back().sync_delete().await.unwrap_err();
    assert!(matches!(err, Error::WriteBack { operation: "delete", .. }));
    assert_eq!(repository.init().unwrap(), 0);
}
