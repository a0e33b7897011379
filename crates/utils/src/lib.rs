//! Shared utilities for shardcache
//!
//! Currently the tracing subscriber setup used by the binary and the test
//! suites.

pub mod tracing;
