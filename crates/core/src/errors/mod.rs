//! Error types and result extensions for shardcache operations

mod builders;
mod conversions;
mod extensions;
mod types;

pub use extensions::*;
pub use types::{Error, Result, TransactionPhase};
