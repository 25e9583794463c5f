//! Hiscore - snapshot and delta caching engine
//!
//! Tracks per-user game hiscore progress: periodic snapshots of every
//! skill, boss and activity, the deltas between consecutive snapshots,
//! and in-memory caches that answer aggregated interval queries without
//! rescanning history.

pub mod cache;
pub mod calculator;
pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod interfaces;
pub mod services;
pub mod storage;
pub mod transaction;
pub mod utils;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{HiscoreError, Result};
