//! Core domain types and errors for `shardcache`.
//!
//! ## Key Components
//!
//! - **`errors`**: the `Error` enum and `Result` alias shared by every crate
//!   in the workspace.
//! - **`types`**: shard addressing (`ShardIndex`, `ShardRoute`) and the
//!   `ReadMode` that decides whether reads copy or share stored values.
//! - **`revision`**: the `Revision` change counter and the `Cacheable`
//!   contract every cached value implements.

pub mod errors;
pub mod revision;
pub mod types;

pub use self::{
    errors::{Error, Result, ResultExt, TransactionPhase},
    revision::{Cacheable, Revision},
    types::*,
};
