use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use super::{
    advances_end, aggregate_by_window, merge_into_window, missing_range, AggregatedSnapshots,
    MissingRange, SnapshotIntervalCache, SnapshotUserStats,
};
use crate::config::CacheRepresentation;
use crate::domain::{AggregationWindow, HiscoreSnapshot};

/// One recorded snapshot, reduced to what interval counts need.
#[derive(Debug, Clone)]
struct TimelineEntry {
    id: String,
    timestamp: DateTime<Utc>,
    overall_experience_change: i64,
}

#[derive(Debug, Clone)]
struct CachedUserData {
    daily: Vec<HiscoreSnapshot>,
    weekly: Vec<HiscoreSnapshot>,
    monthly: Vec<HiscoreSnapshot>,
    /// Every snapshot in the window, sorted by timestamp.
    timeline: Vec<TimelineEntry>,
    ids: HashSet<String>,
    total_snapshots: u64,
    snapshots_with_gains: u64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    cached_at: DateTime<Utc>,
}

impl CachedUserData {
    fn build(raw: &[HiscoreSnapshot], start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let mut timeline: Vec<TimelineEntry> = raw
            .iter()
            .map(|s| TimelineEntry {
                id: s.id.clone(),
                timestamp: s.timestamp,
                overall_experience_change: s.overall_experience_change,
            })
            .collect();
        timeline.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Self {
            daily: aggregate_by_window(raw, AggregationWindow::Daily),
            weekly: aggregate_by_window(raw, AggregationWindow::Weekly),
            monthly: aggregate_by_window(raw, AggregationWindow::Monthly),
            total_snapshots: raw.len() as u64,
            snapshots_with_gains: raw.iter().filter(|s| s.has_gains()).count() as u64,
            ids: timeline.iter().map(|e| e.id.clone()).collect(),
            timeline,
            start,
            end,
            cached_at: Utc::now(),
        }
    }

    fn window(&self, window: AggregationWindow) -> &Vec<HiscoreSnapshot> {
        match window {
            AggregationWindow::Daily => &self.daily,
            AggregationWindow::Weekly => &self.weekly,
            AggregationWindow::Monthly => &self.monthly,
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Merges `snapshot` without touching the covered window.
    fn append(&mut self, snapshot: &HiscoreSnapshot) {
        if !self.ids.insert(snapshot.id.clone()) {
            return;
        }
        self.total_snapshots += 1;
        if snapshot.has_gains() {
            self.snapshots_with_gains += 1;
        }
        if snapshot.overall_experience_change != 0 {
            merge_into_window(&mut self.daily, snapshot, AggregationWindow::Daily);
            merge_into_window(&mut self.weekly, snapshot, AggregationWindow::Weekly);
            merge_into_window(&mut self.monthly, snapshot, AggregationWindow::Monthly);
        }
        let at = self
            .timeline
            .partition_point(|e| e.timestamp <= snapshot.timestamp);
        self.timeline.insert(
            at,
            TimelineEntry {
                id: snapshot.id.clone(),
                timestamp: snapshot.timestamp,
                overall_experience_change: snapshot.overall_experience_change,
            },
        );
        self.cached_at = Utc::now();
    }

    /// `(total, with_gains)` for snapshots in `[start, end]`.
    fn counts(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> (u64, u64) {
        let lo = self.timeline.partition_point(|e| e.timestamp < start);
        let hi = self.timeline.partition_point(|e| e.timestamp <= end);
        let slice = &self.timeline[lo..hi.max(lo)];
        let gains = slice
            .iter()
            .filter(|e| e.overall_experience_change > 0)
            .count();
        (slice.len() as u64, gains as u64)
    }
}

/// Snapshot cache holding precomputed daily, weekly and monthly aggregates.
///
/// Each user's entry keeps one best snapshot per bucket for all three
/// windows, so interval queries only filter by time. New snapshots are
/// merged into each window as they are written.
#[derive(Default)]
pub struct SnapshotCache {
    users: DashMap<String, CachedUserData>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregates `raw` into all three windows and replaces the user's entry.
    pub fn build_and_set_user_data(
        &self,
        user_id: &str,
        raw: &[HiscoreSnapshot],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) {
        let data = CachedUserData::build(raw, start, end);
        debug!(
            user_id = %user_id,
            total = data.total_snapshots,
            daily = data.daily.len(),
            "Built snapshot aggregates"
        );
        self.users.insert(user_id.to_string(), data);
    }

    /// Representatives of `window` within `[start, end]` plus the interval's counts.
    pub fn get_aggregated_data(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        window: AggregationWindow,
    ) -> Option<AggregatedSnapshots> {
        let data = self.users.get(user_id)?;
        let snapshots = data
            .window(window)
            .iter()
            .filter(|s| s.timestamp >= start && s.timestamp <= end)
            .cloned()
            .collect();
        let (total_count, gains_count) = data.counts(start, end);
        Some(AggregatedSnapshots {
            snapshots,
            total_count,
            gains_count,
        })
    }
}

impl SnapshotIntervalCache for SnapshotCache {
    fn representation(&self) -> CacheRepresentation {
        CacheRepresentation::Aggregate
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
        let cached = self.users.get(user_id).map(|d| (d.start, d.end));
        missing_range(cached, start, end)
    }

    fn set_user_snapshots(
        &self,
        user_id: &str,
        snapshots: Vec<HiscoreSnapshot>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) {
        self.build_and_set_user_data(user_id, &snapshots, start, end);
    }

    fn append_snapshots(&self, user_id: &str, snapshots: Vec<HiscoreSnapshot>, new_end: DateTime<Utc>) {
        let Some(mut data) = self.users.get_mut(user_id) else {
            return;
        };
        let cached_end = data.end;
        for snapshot in &snapshots {
            if snapshot.timestamp < cached_end || data.contains(&snapshot.id) {
                continue;
            }
            data.append(snapshot);
        }
        if new_end > data.end {
            data.end = new_end;
        }
    }

    fn append_snapshot(
        &self,
        user_id: &str,
        snapshot: &HiscoreSnapshot,
        previous: Option<DateTime<Utc>>,
    ) {
        let Some(mut data) = self.users.get_mut(user_id) else {
            return;
        };
        if snapshot.timestamp > data.end {
            if !advances_end(data.end, snapshot.timestamp, previous) {
                debug!(user_id = %user_id, "Cached window is behind the store, deferring to extend");
                return;
            }
            data.end = snapshot.timestamp;
        }
        data.append(snapshot);
    }

    fn get_aggregated(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        window: AggregationWindow,
    ) -> Option<AggregatedSnapshots> {
        self.get_aggregated_data(user_id, start, end, window)
    }

    fn cached_users(&self) -> usize {
        self.users.len()
    }

    fn user_stats(&self, user_id: &str) -> Option<SnapshotUserStats> {
        let data = self.users.get(user_id)?;
        let entries = AggregationWindow::ALL
            .iter()
            .map(|w| (format!("{w:?}").to_lowercase(), data.window(*w).len()))
            .collect::<HashMap<_, _>>();
        Some(SnapshotUserStats {
            start: data.start,
            end: data.end,
            total_snapshots: data.total_snapshots,
            snapshots_with_gains: data.snapshots_with_gains,
            entries,
            cached_at: data.cached_at,
        })
    }
}
