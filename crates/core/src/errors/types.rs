//! Core error types for shardcache

use crate::types::ShardIndex;

/// Result type alias for shardcache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for shardcache operations
///
/// Keys are carried as their `Debug` rendering so the error stays independent
/// of the key type of any particular repository.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A key was inserted into a shard that already holds it
    #[error("key {key} already exists in shard {shard}")]
    DuplicateKey { key: String, shard: ShardIndex },

    /// A key was looked up in a shard that does not hold it
    #[error("key {key} not found in shard {shard}")]
    KeyNotFound { key: String, shard: ShardIndex },

    /// The sharding rule resolved to an index with no shard behind it
    #[error("no shard exists at index {index}")]
    InvalidShard { index: ShardIndex },

    /// A unit of work was driven in the wrong lifecycle phase
    #[error("invalid transaction state: expected {expected}, found {actual}")]
    InvalidTransactionState {
        expected: TransactionPhase,
        actual: TransactionPhase,
    },

    /// A value's shard key resolves to a different shard than the one in use
    #[error("value belongs to shard {actual} but shard {expected} was targeted")]
    ShardMismatch {
        expected: ShardIndex,
        actual: ShardIndex,
    },

    /// A unit-of-work step needed the carried value but none was loaded
    #[error("no value is carried by the unit of work; call get_item first")]
    NoCarriedValue,

    /// A moving value could not reach its destination and its key had been
    /// re-added to the source shard in the meantime, so the value was dropped
    #[error("value for key {key} was discarded: it could not move from shard {from} to shard {to} and shard {from} holds the key again")]
    RelocationDiscarded {
        key: String,
        from: ShardIndex,
        to: ShardIndex,
        #[source]
        source: Box<Error>,
    },

    /// A `get_or_create` factory produced no value
    #[error("factory for key {key} produced no value")]
    NullFactoryResult { key: String },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The external data loader failed
    #[error("failed to load initial records: {message}")]
    Load {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A write-back sink rejected an operation
    #[error("write-back {operation} failed: {message}")]
    WriteBack {
        operation: &'static str,
        message: String,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// File system operations
    #[error("file system {operation} operation failed: {source}")]
    FileSystem {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

/// Lifecycle phase of a unit of work, reported by
/// [`Error::InvalidTransactionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionPhase {
    Idle,
    Active,
}

impl std::fmt::Display for TransactionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionPhase::Idle => write!(f, "idle"),
            TransactionPhase::Active => write!(f, "active"),
        }
    }
}
