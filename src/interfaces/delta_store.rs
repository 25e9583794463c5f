//! Delta storage interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::storage_error::Result;
use super::transactor::TxContext;
use crate::domain::HiscoreDelta;

/// Interface for delta persistence.
///
/// Deltas are append-only. Queries return deltas sorted by timestamp
/// ascending; range bounds are inclusive.
#[async_trait]
pub trait DeltaStore: Send + Sync {
    async fn insert_delta(&self, ctx: &TxContext, delta: HiscoreDelta) -> Result<HiscoreDelta>;

    async fn get_delta_by_id(&self, id: &str) -> Result<HiscoreDelta>;

    async fn get_latest_delta_for_user(&self, user_id: &str) -> Result<HiscoreDelta>;

    /// Deltas with `start <= timestamp <= end`.
    async fn get_deltas_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HiscoreDelta>>;

    async fn get_all_deltas_for_user(&self, user_id: &str) -> Result<Vec<HiscoreDelta>>;

    async fn count_deltas_for_user(&self, user_id: &str) -> Result<u64>;
}
