//! Test utilities.
//!
//! Builders for complete snapshots and a service stack wired over the
//! in-memory store, for unit tests and downstream integration tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::cache::{DeltaCache, SnapshotIntervalCache};
use crate::config::Config;
use crate::domain::{
    ActivitySnapshot, ActivityType, BossSnapshot, HiscoreSnapshot, SkillSnapshot,
    SnapshotSource, ACTIVITY_ACTIVITY_TYPES, BOSS_ACTIVITY_TYPES, SKILL_ACTIVITY_TYPES,
};
use crate::services::{DeltaService, HiscoreOrchestrator, SnapshotService};
use crate::storage::MemoryStore;
use crate::transaction::TransactionManager;

/// Fixed reference instant so tests are independent of the wall clock.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).single().unwrap_or_default()
}

/// `base_time()` plus `hours`.
pub fn at_hours(hours: i64) -> DateTime<Utc> {
    base_time() + Duration::hours(hours)
}

/// Builder for snapshots that cover every known activity type.
///
/// Unset skills default to level 1 with zero experience; bosses and
/// activities default to absent.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    snapshot: HiscoreSnapshot,
}

impl SnapshotBuilder {
    pub fn new(user_id: &str, id: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            snapshot: HiscoreSnapshot {
                id: id.to_string(),
                user_id: user_id.to_string(),
                timestamp,
                source: SnapshotSource::Live,
                skills: SKILL_ACTIVITY_TYPES
                    .iter()
                    .map(|t| SkillSnapshot::new(*t, 1, 0))
                    .collect(),
                bosses: BOSS_ACTIVITY_TYPES
                    .iter()
                    .map(|t| BossSnapshot::absent(*t))
                    .collect(),
                activities: ACTIVITY_ACTIVITY_TYPES
                    .iter()
                    .map(|t| ActivitySnapshot::absent(*t))
                    .collect(),
                overall_experience_change: 0,
            },
        }
    }

    pub fn skill(mut self, activity_type: ActivityType, level: i64, experience: i64) -> Self {
        if let Some(s) = self
            .snapshot
            .skills
            .iter_mut()
            .find(|s| s.activity_type == activity_type)
        {
            *s = SkillSnapshot::new(activity_type, level, experience);
        }
        self
    }

    pub fn absent_skill(mut self, activity_type: ActivityType) -> Self {
        if let Some(s) = self
            .snapshot
            .skills
            .iter_mut()
            .find(|s| s.activity_type == activity_type)
        {
            *s = SkillSnapshot::absent(activity_type);
        }
        self
    }

    pub fn overall(self, experience: i64) -> Self {
        self.skill(ActivityType::Overall, 32, experience)
    }

    pub fn boss(mut self, activity_type: ActivityType, kill_count: i64) -> Self {
        if let Some(b) = self
            .snapshot
            .bosses
            .iter_mut()
            .find(|b| b.activity_type == activity_type)
        {
            *b = BossSnapshot::new(activity_type, kill_count);
        }
        self
    }

    pub fn activity(mut self, activity_type: ActivityType, score: i64) -> Self {
        if let Some(a) = self
            .snapshot
            .activities
            .iter_mut()
            .find(|a| a.activity_type == activity_type)
        {
            *a = ActivitySnapshot::new(activity_type, score);
        }
        self
    }

    pub fn source(mut self, source: SnapshotSource) -> Self {
        self.snapshot.source = source;
        self
    }

    pub fn overall_change(mut self, change: i64) -> Self {
        self.snapshot.overall_experience_change = change;
        self
    }

    pub fn build(self) -> HiscoreSnapshot {
        self.snapshot
    }
}

/// Complete snapshot with the given overall experience and change.
pub fn snapshot(
    user_id: &str,
    id: &str,
    timestamp: DateTime<Utc>,
    overall_xp: i64,
    change: i64,
) -> HiscoreSnapshot {
    SnapshotBuilder::new(user_id, id, timestamp)
        .overall(overall_xp)
        .overall_change(change)
        .build()
}

/// Services wired over one shared in-memory store.
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub snapshots: Arc<SnapshotService>,
    pub deltas: Arc<DeltaService>,
    pub orchestrator: HiscoreOrchestrator,
    pub config: Config,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let snapshot_cache: Arc<dyn SnapshotIntervalCache> =
            crate::cache::build_snapshot_cache(config.cache.representation);
        let delta_cache = Arc::new(DeltaCache::new());
        let transactions = Arc::new(TransactionManager::new(
            store.clone(),
            config.storage.transactions_enabled,
        ));
        let snapshots = Arc::new(SnapshotService::new(
            store.clone(),
            snapshot_cache,
            config.limits.clone(),
        ));
        let deltas = Arc::new(DeltaService::new(
            store.clone(),
            delta_cache,
            config.limits.clone(),
        ));
        let orchestrator =
            HiscoreOrchestrator::new(snapshots.clone(), deltas.clone(), transactions);
        Self {
            store,
            snapshots,
            deltas,
            orchestrator,
            config,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
