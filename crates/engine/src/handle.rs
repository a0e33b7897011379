//! Handles to cached values
//!
//! Every key owns one [`Handle`]. Updates through the repository lock that
//! handle and mutate the value in place, so a handle obtained with
//! [`ReadMode::Shared`] keeps observing the stored value for as long as the
//! key stays in the repository. A [`ReadMode::DeepClone`] read returns a
//! handle around a fresh copy that nothing else references.
//!
//! Do not hold a guard from [`Handle::read`] or [`Handle::write`] across a
//! repository call for the same key: the repository takes the shard lock
//! before the value lock, and neither lock is reentrant.
//!
//! [`ReadMode::Shared`]: shardcache_core::ReadMode::Shared
//! [`ReadMode::DeepClone`]: shardcache_core::ReadMode::DeepClone

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use shardcache_core::ReadMode;
use std::fmt;
use std::sync::Arc;

/// Shared reference to one cached value
pub struct Handle<V> {
    inner: Arc<RwLock<V>>,
}

impl<V> Handle<V> {
    pub fn new(value: V) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, V> {
        self.inner.read()
    }

    /// Write access to the value
    ///
    /// Changes made here bypass the repository, so the version index only
    /// sees them through the next repository-level update of the key.
    pub fn write(&self) -> RwLockWriteGuard<'_, V> {
        self.inner.write()
    }

    /// Whether both handles refer to the same stored value
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<V: Clone> Handle<V> {
    /// Copy of the current value
    #[must_use]
    pub fn cloned(&self) -> V {
        self.inner.read().clone()
    }

    /// The handle a read in `mode` gives back
    pub(crate) fn hand_out(&self, mode: ReadMode) -> Self {
        match mode {
            ReadMode::DeepClone => Self::new(self.cloned()),
            ReadMode::Shared => self.clone(),
        }
    }
}

impl<V> Clone for Handle<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> From<V> for Handle<V> {
    fn from(value: V) -> Self {
        Self::new(value)
    }
}

impl<V: fmt::Debug> fmt::Debug for Handle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_read() {
            Some(value) => f.debug_tuple("Handle").field(&*value).finish(),
            None => f.write_str("Handle(<locked>)"),
        }
    }
}
