//! Revision markers for change detection
//!
//! A cached value carries a [`Revision`] that its setters bump on every field
//! write. The repository records the revision when a key is inserted and
//! compares it after an update, so "did the content change" is answered by
//! the value itself rather than by hashing its fields.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing change counter embedded in a cached value
///
/// `bump` takes `&self` so values shared between the cache and a caller can
/// still record writes made through interior-mutable fields.
#[derive(Default)]
pub struct Revision(AtomicU64);

impl Revision {
    /// Start a counter at zero
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Current revision
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Record one write and return the new revision
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl Clone for Revision {
    fn clone(&self) -> Self {
        Self(AtomicU64::new(self.get()))
    }
}

impl PartialEq for Revision {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl Eq for Revision {}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Revision").field(&self.get()).finish()
    }
}

impl Serialize for Revision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.get())
    }
}

impl<'de> Deserialize<'de> for Revision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u64::deserialize(deserializer).map(|n| Self(AtomicU64::new(n)))
    }
}

/// Contract for values stored in a repository
///
/// `Clone` is the deep-copy capability used by [`ReadMode::DeepClone`]
/// reads, and `revision` must change whenever observable content changes.
///
/// [`ReadMode::DeepClone`]: crate::ReadMode::DeepClone
pub trait Cacheable: Clone + Send + Sync + 'static {
    fn revision(&self) -> u64;
}
