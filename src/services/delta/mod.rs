//! Delta service.
//!
//! Reads go to the delta cache first. A user missing from the cache is
//! loaded from the store in full and then served from the cache, so warm
//! and cold reads see the same day-merged deltas.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::cache::DeltaCache;
use crate::calculator::{sum_gains, GainTotals};
use crate::config::QueryLimits;
use crate::domain::HiscoreDelta;
use crate::error::{HiscoreError, Result};
use crate::interfaces::{DeltaStore, TxContext};
use crate::validation::validate_interval;

/// Summed gains for one user over an interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaTotals {
    pub user_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(flatten)]
    pub gains: GainTotals,
    /// Day buckets that contributed.
    pub delta_count: usize,
}

pub struct DeltaService {
    store: Arc<dyn DeltaStore>,
    cache: Arc<DeltaCache>,
    limits: QueryLimits,
}

impl DeltaService {
    pub fn new(store: Arc<dyn DeltaStore>, cache: Arc<DeltaCache>, limits: QueryLimits) -> Self {
        Self {
            store,
            cache,
            limits,
        }
    }

    pub fn cache(&self) -> &Arc<DeltaCache> {
        &self.cache
    }

    /// Stores `delta` under `ctx` unless it is empty.
    ///
    /// Returns `None` for an empty delta. The cache is not touched; call
    /// [`DeltaService::record_in_cache`] once the write has committed.
    pub async fn create_delta(
        &self,
        ctx: &TxContext,
        delta: HiscoreDelta,
    ) -> Result<Option<HiscoreDelta>> {
        if delta.is_empty() {
            debug!(
                user_id = %delta.user_id,
                snapshot_id = %delta.snapshot_id,
                "Skipping empty delta"
            );
            return Ok(None);
        }
        let created = self.store.insert_delta(ctx, delta).await?;
        debug!(
            user_id = %created.user_id,
            delta_id = %created.id,
            changes = created.change_count(),
            "Created delta"
        );
        Ok(Some(created))
    }

    pub fn record_in_cache(&self, delta: &HiscoreDelta) {
        self.cache.append_delta(&delta.user_id, delta);
    }

    pub async fn get_delta_by_id(&self, id: &str) -> Result<HiscoreDelta> {
        self.store
            .get_delta_by_id(id)
            .await
            .map_err(|e| HiscoreError::from_lookup(e, HiscoreError::DeltaNotFound))
    }

    /// The user's most recent day of deltas, merged.
    pub async fn get_latest_delta(&self, user_id: &str) -> Result<HiscoreDelta> {
        self.ensure_cached(user_id).await?;
        self.cache
            .get_latest_delta(user_id)
            .ok_or(HiscoreError::DeltaNotFound)
    }

    /// Day-merged deltas in `[start, end]` after interval validation.
    pub async fn get_deltas_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HiscoreDelta>> {
        let (start, end) = self.validate_interval(start, end)?;
        self.fetch_deltas(user_id, start, end).await
    }

    /// Per-activity totals over `[start, end]`.
    pub async fn get_delta_totals(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DeltaTotals> {
        let (start, end) = self.validate_interval(start, end)?;
        let deltas = self.fetch_deltas(user_id, start, end).await?;
        Ok(DeltaTotals {
            user_id: user_id.to_string(),
            start,
            end,
            gains: sum_gains(&deltas),
            delta_count: deltas.len(),
        })
    }

    pub fn validate_interval(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        validate_interval(start, end, self.limits.max_delta_interval())
    }

    /// Deltas for an already-validated interval.
    pub async fn fetch_deltas(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HiscoreDelta>> {
        self.ensure_cached(user_id).await?;
        Ok(self
            .cache
            .get_deltas_in_range(user_id, start, end)
            .unwrap_or_default())
    }

    /// Loads every delta for `user_id` into the cache, replacing any entry.
    pub async fn prime_user(&self, user_id: &str) -> Result<usize> {
        let deltas = self.store.get_all_deltas_for_user(user_id).await?;
        self.cache.set_user_deltas(user_id, &deltas);
        Ok(deltas.len())
    }

    async fn ensure_cached(&self, user_id: &str) -> Result<()> {
        if self.cache.is_cached(user_id) {
            debug!(user_id = %user_id, "Delta cache hit");
            return Ok(());
        }
        debug!(user_id = %user_id, "Delta cache miss, loading from store");
        self.prime_user(user_id).await.map(|_| ())
    }
}
