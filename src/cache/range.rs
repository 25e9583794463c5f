use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use super::{
    advances_end, aggregate_by_window, missing_range, AggregatedSnapshots, MissingRange,
    SnapshotIntervalCache, SnapshotUserStats,
};
use crate::config::CacheRepresentation;
use crate::domain::{AggregationWindow, HiscoreSnapshot};

#[derive(Debug, Clone)]
struct CachedRange {
    /// Sorted by timestamp.
    snapshots: Vec<HiscoreSnapshot>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    cached_at: DateTime<Utc>,
}

impl CachedRange {
    fn insert(&mut self, snapshot: HiscoreSnapshot) {
        if self.snapshots.iter().any(|s| s.id == snapshot.id) {
            return;
        }
        let at = self
            .snapshots
            .partition_point(|s| s.timestamp <= snapshot.timestamp);
        self.snapshots.insert(at, snapshot);
    }
}

/// Snapshot cache holding raw snapshots over a covered time window.
///
/// Aggregation happens per query via [`SnapshotRangeCache::filter_and_aggregate`].
#[derive(Default)]
pub struct SnapshotRangeCache {
    users: DashMap<String, CachedRange>,
}

impl SnapshotRangeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_user_range(
        &self,
        user_id: &str,
        mut snapshots: Vec<HiscoreSnapshot>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) {
        snapshots.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        debug!(user_id = %user_id, count = snapshots.len(), "Cached snapshot range");
        self.users.insert(
            user_id.to_string(),
            CachedRange {
                snapshots,
                start,
                end,
                cached_at: Utc::now(),
            },
        );
    }

    /// Applies the best-snapshot rule to the cached snapshots in `[start, end]`.
    pub fn filter_and_aggregate(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        window: AggregationWindow,
    ) -> Option<AggregatedSnapshots> {
        let range = self.users.get(user_id)?;
        let in_range: Vec<&HiscoreSnapshot> = range
            .snapshots
            .iter()
            .filter(|s| s.timestamp >= start && s.timestamp <= end)
            .collect();
        let gains_count = in_range.iter().filter(|s| s.has_gains()).count() as u64;
        Some(AggregatedSnapshots {
            total_count: in_range.len() as u64,
            gains_count,
            snapshots: aggregate_by_window(in_range, window),
        })
    }
}

impl SnapshotIntervalCache for SnapshotRangeCache {
    fn representation(&self) -> CacheRepresentation {
        CacheRepresentation::Range
    }

    fn is_cached(&self, user_id: &str) -> bool {
        self.users.contains_key(user_id)
    }

    fn get_missing_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<MissingRange> {
        let cached = self.users.get(user_id).map(|r| (r.start, r.end));
        missing_range(cached, start, end)
    }

    fn set_user_snapshots(
        &self,
        user_id: &str,
        snapshots: Vec<HiscoreSnapshot>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) {
        self.set_user_range(user_id, snapshots, start, end);
    }

    fn append_snapshots(&self, user_id: &str, snapshots: Vec<HiscoreSnapshot>, new_end: DateTime<Utc>) {
        let Some(mut range) = self.users.get_mut(user_id) else {
            return;
        };
        for snapshot in snapshots {
            range.insert(snapshot);
        }
        if new_end > range.end {
            range.end = new_end;
        }
        range.cached_at = Utc::now();
    }

    fn append_snapshot(
        &self,
        user_id: &str,
        snapshot: &HiscoreSnapshot,
        previous: Option<DateTime<Utc>>,
    ) {
        let Some(mut range) = self.users.get_mut(user_id) else {
            return;
        };
        if snapshot.timestamp > range.end {
            if !advances_end(range.end, snapshot.timestamp, previous) {
                debug!(user_id = %user_id, "Cached range is behind the store, deferring to extend");
                return;
            }
            range.end = snapshot.timestamp;
        }
        range.insert(snapshot.clone());
        range.cached_at = Utc::now();
    }

    fn get_aggregated(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        window: AggregationWindow,
    ) -> Option<AggregatedSnapshots> {
        self.filter_and_aggregate(user_id, start, end, window)
    }

    fn cached_users(&self) -> usize {
        self.users.len()
    }

    fn user_stats(&self, user_id: &str) -> Option<SnapshotUserStats> {
        let range = self.users.get(user_id)?;
        Some(SnapshotUserStats {
            start: range.start,
            end: range.end,
            total_snapshots: range.snapshots.len() as u64,
            snapshots_with_gains: range.snapshots.iter().filter(|s| s.has_gains()).count() as u64,
            entries: HashMap::from([("raw".to_string(), range.snapshots.len())]),
            cached_at: range.cached_at,
        })
    }
}
