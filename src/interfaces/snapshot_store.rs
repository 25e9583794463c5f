//! Snapshot storage interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::storage_error::Result;
use super::transactor::TxContext;
use crate::domain::HiscoreSnapshot;

/// Interface for snapshot persistence.
///
/// Single-document lookups return `StorageError::NotFound` when nothing
/// matches. List queries return snapshots sorted by timestamp ascending and
/// treat both range bounds as inclusive.
///
/// Writes take a [`TxContext`]; implementations that support transactions
/// stage the write under the context's transaction until it commits.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist a new snapshot.
    async fn insert_snapshot(
        &self,
        ctx: &TxContext,
        snapshot: HiscoreSnapshot,
    ) -> Result<HiscoreSnapshot>;

    /// Remove a snapshot by id.
    async fn delete_snapshot(&self, ctx: &TxContext, id: &str) -> Result<()>;

    async fn get_snapshot_by_id(&self, id: &str) -> Result<HiscoreSnapshot>;

    async fn get_latest_snapshot_for_user(&self, user_id: &str) -> Result<HiscoreSnapshot>;

    async fn get_oldest_snapshot_for_user(&self, user_id: &str) -> Result<HiscoreSnapshot>;

    /// Snapshots with `start <= timestamp <= end`.
    async fn get_snapshots_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HiscoreSnapshot>>;

    /// Latest snapshot with `timestamp <= target`.
    async fn get_snapshot_nearest_less_than(
        &self,
        user_id: &str,
        target: DateTime<Utc>,
    ) -> Result<HiscoreSnapshot>;

    /// Earliest snapshot with `timestamp >= target`.
    async fn get_snapshot_nearest_greater_than(
        &self,
        user_id: &str,
        target: DateTime<Utc>,
    ) -> Result<HiscoreSnapshot>;

    async fn get_all_snapshots_for_user(&self, user_id: &str) -> Result<Vec<HiscoreSnapshot>>;
}
