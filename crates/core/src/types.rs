use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::errors::Error;

/// Index of a shard as produced by a sharding rule.
///
/// Signed because rules are free to map shard keys onto negative indices;
/// such an index simply never has a shard unless one is created for it.
pub type ShardIndex = i32;

/// Destination of a shard key: the shard index plus a human-readable tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardRoute {
    pub index: ShardIndex,
    pub tag: Cow<'static, str>,
}

impl ShardRoute {
    /// Create a route with a borrowed or owned tag
    #[must_use]
    pub fn new(index: ShardIndex, tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            index,
            tag: tag.into(),
        }
    }
}

impl fmt::Display for ShardRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tag, self.index)
    }
}

/// How a read hands the stored value back to the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadMode {
    /// Return an independent copy of the stored value
    #[default]
    DeepClone,
    /// Return the stored instance itself; the caller shares it with the cache
    Shared,
}

impl ReadMode {
    /// Whether reads in this mode copy the stored value
    #[must_use]
    pub const fn is_deep(self) -> bool {
        matches!(self, ReadMode::DeepClone)
    }
}

impl fmt::Display for ReadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadMode::DeepClone => write!(f, "deep-clone"),
            ReadMode::Shared => write!(f, "shared"),
        }
    }
}

impl FromStr for ReadMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deep-clone" | "deep" | "clone" => Ok(ReadMode::DeepClone),
            "shared" | "alias" => Ok(ReadMode::Shared),
            other => Err(Error::configuration(format!("unknown read mode '{other}'"))),
        }
    }
}

impl From<bool> for ReadMode {
    /// `true` asks for a deep clone, mirroring a `deep_clone` flag
    fn from(deep_clone: bool) -> Self {
        if deep_clone {
            ReadMode::DeepClone
        } else {
            ReadMode::Shared
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_mode_parsing() {
        assert_eq!("shared".parse::<ReadMode>().unwrap(), ReadMode::Shared);
        assert_eq!("Deep-Clone".parse::<ReadMode>().unwrap(), ReadMode::DeepClone);
        assert!("sometimes".parse::<ReadMode>().is_err());
    }

    #[test]
    fn test_read_mode_from_flag() {
        assert_eq!(ReadMode::from(true), ReadMode::DeepClone);
        assert_eq!(ReadMode::from(false), ReadMode::Shared);
        assert!(ReadMode::default().is_deep());
    }

    #[test]
    fn test_route_display() {
        assert_eq!(ShardRoute::new(2, "shard-2").to_string(), "shard-2#2");
    }
}
