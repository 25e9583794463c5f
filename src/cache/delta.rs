use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::calculator::merge_deltas;
use crate::domain::{day_key, HiscoreDelta};

#[derive(Debug, Clone)]
struct CachedDeltas {
    /// Day key to the sum of that day's deltas. Ordered, so the last key is the latest day.
    daily: BTreeMap<String, HiscoreDelta>,
    cached_at: DateTime<Utc>,
}

impl CachedDeltas {
    fn add(&mut self, delta: &HiscoreDelta) {
        let key = day_key(&delta.timestamp);
        let merged = match self.daily.get(&key) {
            Some(existing) => merge_deltas(existing, delta),
            None => delta.clone(),
        };
        self.daily.insert(key, merged);
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaCacheStats {
    pub cached_users: usize,
    pub cached_days: usize,
}

/// Per-user deltas pre-summed by UTC calendar day.
#[derive(Default)]
pub struct DeltaCache {
    users: DashMap<String, CachedDeltas>,
}

impl DeltaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the user's entry. An empty `deltas` still marks the user as cached.
    pub fn set_user_deltas(&self, user_id: &str, deltas: &[HiscoreDelta]) {
        let mut entry = CachedDeltas {
            daily: BTreeMap::new(),
            cached_at: Utc::now(),
        };
        for delta in deltas {
            entry.add(delta);
        }
        debug!(
            user_id = %user_id,
            deltas = deltas.len(),
            days = entry.daily.len(),
            "Cached deltas"
        );
        self.users.insert(user_id.to_string(), entry);
    }

    /// Merges a newly written delta into its day. No-op for users that are not cached.
    pub fn append_delta(&self, user_id: &str, delta: &HiscoreDelta) {
        match self.users.get_mut(user_id) {
            Some(mut entry) => {
                entry.add(delta);
                entry.cached_at = Utc::now();
            }
            None => debug!(user_id = %user_id, "Delta cache miss on append"),
        }
    }

    /// The merged delta for the user's most recent day.
    ///
    /// `None` both for users that are not cached and for cached users with no deltas.
    pub fn get_latest_delta(&self, user_id: &str) -> Option<HiscoreDelta> {
        let entry = self.users.get(user_id)?;
        entry.daily.values().next_back().cloned()
    }

    /// Day buckets whose key falls in `[day(start), day(end)]`, oldest first.
    ///
    /// `None` when the user is not cached.
    pub fn get_deltas_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<Vec<HiscoreDelta>> {
        let entry = self.users.get(user_id)?;
        let (from, to) = (day_key(&start), day_key(&end));
        if from > to {
            return Some(Vec::new());
        }
        let mut deltas: Vec<HiscoreDelta> = entry
            .daily
            .range(from..=to)
            .map(|(_, d)| d.clone())
            .collect();
        deltas.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Some(deltas)
    }

    pub fn is_cached(&self, user_id: &str) -> bool {
        self.users.contains_key(user_id)
    }

    pub fn stats(&self) -> DeltaCacheStats {
        DeltaCacheStats {
            cached_users: self.users.len(),
            cached_days: self.users.iter().map(|e| e.daily.len()).sum(),
        }
    }
}
