//! Per-user in-memory caches.
//!
//! Two snapshot cache representations implement [`SnapshotIntervalCache`]:
//!
//! | Representation        | Holds                                   | Aggregates   |
//! |-----------------------|-----------------------------------------|--------------|
//! | [`SnapshotCache`]     | best snapshot per day, week and month   | on write     |
//! | [`SnapshotRangeCache`]| raw snapshots over a covered window     | on read      |
//!
//! Both share the best-snapshot rule in [`aggregate_by_window`], so they
//! return the same representatives for whole calendar buckets.
//!
//! Entries live in a [`dashmap::DashMap`] keyed by user id. Reads and writes
//! for one user lock only that user's shard.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::CacheRepresentation;
use crate::domain::{AggregationWindow, HiscoreSnapshot};

mod delta;
mod range;
mod snapshot;

pub use delta::{DeltaCache, DeltaCacheStats};
pub use range::SnapshotRangeCache;
pub use snapshot::SnapshotCache;

/// Result of an interval query against a snapshot cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedSnapshots {
    /// One representative per bucket, oldest first.
    pub snapshots: Vec<HiscoreSnapshot>,
    /// Snapshots recorded in the interval.
    pub total_count: u64,
    /// Snapshots in the interval whose overall experience went up.
    pub gains_count: u64,
}

/// What a caller must fetch from the store before the cache can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRange {
    /// Nothing usable is cached. Fetch `[start, end]` and replace the entry.
    Rebuild {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// The cached window ends early. Fetch `[start, end]` and extend it.
    Extend {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Size of one user's snapshot cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotUserStats {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub total_snapshots: u64,
    pub snapshots_with_gains: u64,
    /// Cached snapshots per aggregation window, or raw snapshots for the range cache.
    pub entries: HashMap<String, usize>,
    pub cached_at: DateTime<Utc>,
}

/// Interval-query cache over a user's snapshots.
pub trait SnapshotIntervalCache: Send + Sync {
    fn representation(&self) -> CacheRepresentation;

    fn is_cached(&self, user_id: &str) -> bool;

    /// `None` when the cached window fully contains `[start, end]`.
    fn get_missing_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<MissingRange>;

    /// Replaces the user's entry with one built from `snapshots` covering `[start, end]`.
    fn set_user_snapshots(
        &self,
        user_id: &str,
        snapshots: Vec<HiscoreSnapshot>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    );

    /// Merges snapshots fetched past the cached end and moves the end to `new_end`.
    fn append_snapshots(&self, user_id: &str, snapshots: Vec<HiscoreSnapshot>, new_end: DateTime<Utc>);

    /// Merges one newly written snapshot. No-op for users that are not cached.
    ///
    /// `previous` is the timestamp of the user's latest snapshot before this
    /// one. A snapshot past the cached end is merged, and the end moved to it,
    /// only when `previous` is already covered; otherwise it is left for the
    /// next extend.
    fn append_snapshot(
        &self,
        user_id: &str,
        snapshot: &HiscoreSnapshot,
        previous: Option<DateTime<Utc>>,
    );

    /// Best snapshot per bucket of `window` within `[start, end]`, or `None` on a miss.
    fn get_aggregated(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        window: AggregationWindow,
    ) -> Option<AggregatedSnapshots>;

    fn cached_users(&self) -> usize;

    fn user_stats(&self, user_id: &str) -> Option<SnapshotUserStats>;
}

/// Creates the cache for the configured representation.
pub fn build_snapshot_cache(representation: CacheRepresentation) -> Arc<dyn SnapshotIntervalCache> {
    match representation {
        CacheRepresentation::Aggregate => Arc::new(SnapshotCache::new()),
        CacheRepresentation::Range => Arc::new(SnapshotRangeCache::new()),
    }
}

/// Whether a point append at `timestamp` may move `cached_end` up to it.
///
/// True when nothing in the store can sit between the cached end and the new
/// snapshot, that is when the user's previous snapshot is inside the window.
pub(crate) fn advances_end(
    cached_end: DateTime<Utc>,
    timestamp: DateTime<Utc>,
    previous: Option<DateTime<Utc>>,
) -> bool {
    timestamp > cached_end && previous.map_or(true, |p| p <= cached_end)
}

/// Coverage check shared by both representations.
pub(crate) fn missing_range(
    cached: Option<(DateTime<Utc>, DateTime<Utc>)>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<MissingRange> {
    let Some((cached_start, cached_end)) = cached else {
        return Some(MissingRange::Rebuild { start, end });
    };
    if start < cached_start {
        return Some(MissingRange::Rebuild {
            start,
            end: end.max(cached_end),
        });
    }
    if end > cached_end {
        return Some(MissingRange::Extend {
            start: cached_end,
            end,
        });
    }
    None
}

/// True when `candidate` beats `incumbent` under the best-snapshot rule:
/// higher overall experience wins, ties go to the later timestamp.
pub fn is_better(candidate: &HiscoreSnapshot, incumbent: &HiscoreSnapshot) -> bool {
    (candidate.overall_experience(), candidate.timestamp)
        > (incumbent.overall_experience(), incumbent.timestamp)
}

/// Picks the best snapshot per bucket of `window`, oldest first.
///
/// Snapshots without an overall experience change are ignored.
pub fn aggregate_by_window<'a>(
    snapshots: impl IntoIterator<Item = &'a HiscoreSnapshot>,
    window: AggregationWindow,
) -> Vec<HiscoreSnapshot> {
    let mut best: HashMap<String, &HiscoreSnapshot> = HashMap::new();
    for snapshot in snapshots {
        if snapshot.overall_experience_change == 0 {
            continue;
        }
        best.entry(window.bucket_key(&snapshot.timestamp))
            .and_modify(|current| {
                if is_better(snapshot, current) {
                    *current = snapshot;
                }
            })
            .or_insert(snapshot);
    }
    let mut out: Vec<HiscoreSnapshot> = best.into_values().cloned().collect();
    out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    out
}

/// Inserts `snapshot` into a window's representatives, keeping them sorted.
pub(crate) fn merge_into_window(
    representatives: &mut Vec<HiscoreSnapshot>,
    snapshot: &HiscoreSnapshot,
    window: AggregationWindow,
) {
    let key = window.bucket_key(&snapshot.timestamp);
    if let Some(pos) = representatives
        .iter()
        .position(|r| window.bucket_key(&r.timestamp) == key)
    {
        if !is_better(snapshot, &representatives[pos]) {
            return;
        }
        representatives.remove(pos);
    }
    let at = representatives.partition_point(|r| r.timestamp <= snapshot.timestamp);
    representatives.insert(at, snapshot.clone());
}
