//! Builder methods for creating errors with context

use super::types::{Error, TransactionPhase};
use crate::types::ShardIndex;
use std::fmt::Debug;

impl Error {
    /// Create a duplicate key error
    #[must_use]
    pub fn duplicate_key(key: &impl Debug, shard: ShardIndex) -> Self {
        Error::DuplicateKey {
            key: format!("{key:?}"),
            shard,
        }
    }

    /// Create a key-not-found error
    #[must_use]
    pub fn key_not_found(key: &impl Debug, shard: ShardIndex) -> Self {
        Error::KeyNotFound {
            key: format!("{key:?}"),
            shard,
        }
    }

    /// Create an invalid shard error
    #[must_use]
    pub fn invalid_shard(index: ShardIndex) -> Self {
        Error::InvalidShard { index }
    }

    /// The operation needs an active unit of work but none is running
    #[must_use]
    pub fn not_active() -> Self {
        Error::InvalidTransactionState {
            expected: TransactionPhase::Active,
            actual: TransactionPhase::Idle,
        }
    }

    /// The operation needs an idle context but a unit of work is running
    #[must_use]
    pub fn already_active() -> Self {
        Error::InvalidTransactionState {
            expected: TransactionPhase::Idle,
            actual: TransactionPhase::Active,
        }
    }

    /// Create a shard mismatch error
    #[must_use]
    pub fn shard_mismatch(expected: ShardIndex, actual: ShardIndex) -> Self {
        Error::ShardMismatch { expected, actual }
    }

    /// A relocating value was dropped after `source` made its move fail
    #[must_use]
    pub fn relocation_discarded(
        key: &impl Debug,
        from: ShardIndex,
        to: ShardIndex,
        source: Error,
    ) -> Self {
        Error::RelocationDiscarded {
            key: format!("{key:?}"),
            from,
            to,
            source: Box::new(source),
        }
    }

    /// Create a null factory result error
    #[must_use]
    pub fn null_factory_result(key: &impl Debug) -> Self {
        Error::NullFactoryResult {
            key: format!("{key:?}"),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a loader error
    #[must_use]
    pub fn load(message: impl Into<String>) -> Self {
        Error::Load {
            message: message.into(),
            source: None,
        }
    }

    /// Create a loader error with a source error
    #[must_use]
    pub fn load_with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Load {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a write-back error
    #[must_use]
    pub fn write_back(operation: &'static str, message: impl Into<String>) -> Self {
        Error::WriteBack {
            operation,
            message: message.into(),
        }
    }

    /// Create a file system error
    #[must_use]
    pub fn file_system(operation: impl Into<String>, source: std::io::Error) -> Self {
        Error::FileSystem {
            operation: operation.into(),
            source,
        }
    }

    /// Whether this error reports a missing key
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::KeyNotFound { .. })
    }

    /// Whether this error reports a unit-of-work sequencing fault
    #[must_use]
    pub const fn is_lifecycle(&self) -> bool {
        matches!(self, Error::InvalidTransactionState { .. })
    }
}
