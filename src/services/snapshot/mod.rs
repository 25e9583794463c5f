//! Snapshot service.
//!
//! Owns snapshot creation, lookups, nearest-timestamp resolution and
//! aggregated interval queries. Interval queries are answered from the
//! snapshot cache; ranges the cache does not cover are fetched from the
//! store and merged in first.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::{
    aggregate_by_window, AggregatedSnapshots, MissingRange, SnapshotIntervalCache,
};
use crate::config::QueryLimits;
use crate::domain::{ActivityType, AggregationWindow, HiscoreSnapshot};
use crate::error::{HiscoreError, Result};
use crate::interfaces::{optional, SnapshotStore, TxContext};
use crate::validation::{validate_aggregation_window, validate_interval, validate_snapshot};

/// Picks whichever candidate is closer to `target`.
///
/// Equal distances resolve to `lower`.
pub fn pick_nearest(
    target: DateTime<Utc>,
    lower: Option<HiscoreSnapshot>,
    upper: Option<HiscoreSnapshot>,
) -> Option<HiscoreSnapshot> {
    match (lower, upper) {
        (Some(lower), Some(upper)) => {
            if target - lower.timestamp <= upper.timestamp - target {
                Some(lower)
            } else {
                Some(upper)
            }
        }
        (lower, upper) => lower.or(upper),
    }
}

/// Overall experience of `current` relative to `previous`, 0 when either is absent.
fn overall_change(current: &HiscoreSnapshot, previous: Option<&HiscoreSnapshot>) -> i64 {
    let overall = |s: &HiscoreSnapshot| s.skill(ActivityType::Overall).and_then(|o| o.experience);
    match (overall(current), previous.and_then(overall)) {
        (Some(curr), Some(prev)) => curr - prev,
        _ => 0,
    }
}

pub struct SnapshotService {
    store: Arc<dyn SnapshotStore>,
    cache: Arc<dyn SnapshotIntervalCache>,
    limits: QueryLimits,
}

impl SnapshotService {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        cache: Arc<dyn SnapshotIntervalCache>,
        limits: QueryLimits,
    ) -> Self {
        Self {
            store,
            cache,
            limits,
        }
    }

    pub fn cache(&self) -> &Arc<dyn SnapshotIntervalCache> {
        &self.cache
    }

    /// Validates and stores a snapshot, then merges it into the cache.
    pub async fn create_snapshot(&self, snapshot: HiscoreSnapshot) -> Result<HiscoreSnapshot> {
        let previous = self.find_latest(&snapshot.user_id).await?;
        let created = self
            .insert_snapshot(&TxContext::none(), snapshot, previous.as_ref())
            .await?;
        self.record_in_cache(&created, previous.as_ref());
        Ok(created)
    }

    /// Validates and stores a snapshot under `ctx` without touching the cache.
    ///
    /// Assigns a fresh id and sets `overall_experience_change` against `previous`.
    pub async fn insert_snapshot(
        &self,
        ctx: &TxContext,
        mut snapshot: HiscoreSnapshot,
        previous: Option<&HiscoreSnapshot>,
    ) -> Result<HiscoreSnapshot> {
        snapshot.id = Uuid::new_v4().to_string();
        validate_snapshot(&snapshot)?;
        snapshot.overall_experience_change = overall_change(&snapshot, previous);

        let created = self.store.insert_snapshot(ctx, snapshot).await?;
        debug!(
            user_id = %created.user_id,
            snapshot_id = %created.id,
            change = created.overall_experience_change,
            "Created snapshot"
        );
        Ok(created)
    }

    /// Merges a committed snapshot into the cache.
    ///
    /// `previous` is the latest snapshot read before `snapshot` was written.
    pub fn record_in_cache(&self, snapshot: &HiscoreSnapshot, previous: Option<&HiscoreSnapshot>) {
        self.cache
            .append_snapshot(&snapshot.user_id, snapshot, previous.map(|p| p.timestamp));
    }

    pub async fn get_snapshot_by_id(&self, id: &str) -> Result<HiscoreSnapshot> {
        self.store
            .get_snapshot_by_id(id)
            .await
            .map_err(|e| HiscoreError::from_lookup(e, HiscoreError::SnapshotNotFound))
    }

    pub async fn get_latest_snapshot_for_user(&self, user_id: &str) -> Result<HiscoreSnapshot> {
        self.find_latest(user_id)
            .await?
            .ok_or(HiscoreError::SnapshotNotFound)
    }

    /// Latest snapshot, or `None` for a user with no history.
    pub async fn find_latest(&self, user_id: &str) -> Result<Option<HiscoreSnapshot>> {
        Ok(optional(self.store.get_latest_snapshot_for_user(user_id).await)?)
    }

    pub async fn get_all_snapshots_for_user(&self, user_id: &str) -> Result<Vec<HiscoreSnapshot>> {
        Ok(self.store.get_all_snapshots_for_user(user_id).await?)
    }

    pub async fn get_snapshot_nearest_timestamp(
        &self,
        user_id: &str,
        target: DateTime<Utc>,
    ) -> Result<HiscoreSnapshot> {
        self.find_nearest(user_id, target)
            .await?
            .ok_or(HiscoreError::SnapshotNotFound)
    }

    /// Snapshot closest to `target`, searching both sides concurrently.
    pub async fn find_nearest(
        &self,
        user_id: &str,
        target: DateTime<Utc>,
    ) -> Result<Option<HiscoreSnapshot>> {
        let (lower, upper) = tokio::try_join!(
            async { optional(self.store.get_snapshot_nearest_less_than(user_id, target).await) },
            async {
                optional(
                    self.store
                        .get_snapshot_nearest_greater_than(user_id, target)
                        .await,
                )
            },
        )?;
        Ok(pick_nearest(target, lower, upper))
    }

    /// Best snapshot per `window` bucket in `[start, end]`, with interval counts.
    pub async fn get_snapshot_interval(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        window: AggregationWindow,
    ) -> Result<AggregatedSnapshots> {
        let (start, end) = validate_interval(start, end, self.limits.max_snapshot_interval())?;
        validate_aggregation_window(start, end, window, self.limits.max_window_span(window))?;

        match self.cache.get_missing_range(user_id, start, end) {
            None => debug!(user_id = %user_id, "Snapshot cache hit"),
            Some(MissingRange::Rebuild { start: from, end: to }) => {
                debug!(user_id = %user_id, "Snapshot cache miss, rebuilding");
                let snapshots = self.store.get_snapshots_in_range(user_id, from, to).await?;
                self.cache.set_user_snapshots(user_id, snapshots, from, to);
            }
            Some(MissingRange::Extend { start: from, end: to }) => {
                debug!(user_id = %user_id, "Snapshot cache partial hit, extending");
                let snapshots = self.store.get_snapshots_in_range(user_id, from, to).await?;
                self.cache.append_snapshots(user_id, snapshots, to);
            }
        }

        match self.cache.get_aggregated(user_id, start, end, window) {
            Some(result) => Ok(result),
            None => self.aggregate_from_store(user_id, start, end, window).await,
        }
    }

    /// Computes an interval result straight from the store, bypassing the cache.
    pub async fn aggregate_from_store(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        window: AggregationWindow,
    ) -> Result<AggregatedSnapshots> {
        let raw = self.store.get_snapshots_in_range(user_id, start, end).await?;
        Ok(AggregatedSnapshots {
            total_count: raw.len() as u64,
            gains_count: raw.iter().filter(|s| s.has_gains()).count() as u64,
            snapshots: aggregate_by_window(&raw, window),
        })
    }

    /// Loads a user's full history into the cache.
    ///
    /// The span from the oldest to the latest snapshot is fetched in
    /// `batch`-sized pieces concurrently and set in one call. Returns the
    /// number of snapshots cached, or `Ok(0)` for a user with no history.
    pub async fn prime_user(
        &self,
        user_id: &str,
        batch: Duration,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        if cancel.is_cancelled() {
            return Err(HiscoreError::Cancelled);
        }
        let oldest = optional(self.store.get_oldest_snapshot_for_user(user_id).await)?;
        let Some(oldest) = oldest else {
            return Ok(0);
        };
        let Some(latest) = self.find_latest(user_id).await? else {
            return Ok(0);
        };

        let batch = batch.max(Duration::seconds(1));
        let mut ranges = Vec::new();
        let mut from = oldest.timestamp;
        while from <= latest.timestamp {
            let to = (from + batch).min(latest.timestamp);
            ranges.push((from, to));
            if to == latest.timestamp {
                break;
            }
            from = to;
        }

        let fetches = ranges.iter().map(|(from, to)| async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(HiscoreError::Cancelled),
                result = self.store.get_snapshots_in_range(user_id, *from, *to) => {
                    result.map_err(|e| {
                        warn!(
                            user_id = %user_id,
                            from = %from,
                            to = %to,
                            error = %e,
                            "Snapshot batch fetch failed"
                        );
                        HiscoreError::from(e)
                    })
                }
            }
        });
        let batches = try_join_all(fetches).await?;

        // Adjacent batches share a boundary instant.
        let mut snapshots: Vec<HiscoreSnapshot> = batches.into_iter().flatten().collect();
        snapshots.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        snapshots.dedup_by(|a, b| a.id == b.id);

        let count = snapshots.len();
        let end = Utc::now().max(latest.timestamp);
        self.cache
            .set_user_snapshots(user_id, snapshots, oldest.timestamp, end);
        debug!(
            user_id = %user_id,
            snapshots = count,
            batches = ranges.len(),
            "Primed snapshot cache"
        );
        Ok(count)
    }
}

#[cfg(test)]
mod tests;
