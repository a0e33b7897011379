//! Write-back seam towards the system of record
//!
//! The repository never calls these hooks itself. A layer wrapping the
//! repository mirrors its mutations through them.

use async_trait::async_trait;
use shardcache_core::Result;
use std::collections::HashMap;

/// Field name to new value, as reported to [`WriteBack::sync_update`]
pub type ChangedFields = HashMap<String, serde_json::Value>;

/// Sink that mirrors cache mutations to an external store
#[async_trait]
pub trait WriteBack: Send + Sync {
    async fn sync_insert(&self) -> Result<bool>;

    async fn sync_delete(&self) -> Result<bool>;

    async fn sync_update(&self, changed_fields: &ChangedFields) -> Result<bool>;
}

/// Write-back sink that accepts everything and does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWriteBack;

#[async_trait]
impl WriteBack for NoopWriteBack {
    async fn sync_insert(&self) -> Result<bool> {
        Ok(true)
    }

    async fn sync_delete(&self) -> Result<bool> {
        Ok(true)
    }

    async fn sync_update(&self, changed_fields: &ChangedFields) -> Result<bool> {
        tracing::trace!(fields = changed_fields.len(), "noop write-back update");
        Ok(true)
    }
}
