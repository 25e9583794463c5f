//! Hiscore snapshot types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::activity_type::ActivityType;

/// Where a snapshot came from.
///
/// Imported snapshots were bulk-loaded from a third-party history source and
/// are the only ones the backfill path may delete as invalid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotSource {
    #[default]
    Live,
    Imported,
}

/// Point-in-time capture of a user's stats across all tracked activity types.
///
/// `skills`, `bosses` and `activities` each cover every known activity type
/// of their category; values the source lacked are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HiscoreSnapshot {
    pub id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source: SnapshotSource,
    pub skills: Vec<SkillSnapshot>,
    pub bosses: Vec<BossSnapshot>,
    pub activities: Vec<ActivitySnapshot>,
    /// Overall experience relative to the user's preceding snapshot, set at write time.
    #[serde(default)]
    pub overall_experience_change: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillSnapshot {
    pub activity_type: ActivityType,
    pub level: Option<i64>,
    pub experience: Option<i64>,
    pub rank: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BossSnapshot {
    pub activity_type: ActivityType,
    pub kill_count: Option<i64>,
    pub rank: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySnapshot {
    pub activity_type: ActivityType,
    pub score: Option<i64>,
    pub rank: Option<i64>,
}

impl HiscoreSnapshot {
    pub fn skill(&self, activity_type: ActivityType) -> Option<&SkillSnapshot> {
        self.skills.iter().find(|s| s.activity_type == activity_type)
    }

    /// Overall experience, or 0 when the snapshot has no overall value.
    pub fn overall_experience(&self) -> i64 {
        self.skill(ActivityType::Overall)
            .and_then(|s| s.experience)
            .unwrap_or(0)
    }

    pub fn has_gains(&self) -> bool {
        self.overall_experience_change > 0
    }
}

impl SkillSnapshot {
    pub fn new(activity_type: ActivityType, level: i64, experience: i64) -> Self {
        Self {
            activity_type,
            level: Some(level),
            experience: Some(experience),
            rank: None,
        }
    }

    /// Entry for a skill the source did not report.
    pub fn absent(activity_type: ActivityType) -> Self {
        Self {
            activity_type,
            level: None,
            experience: None,
            rank: None,
        }
    }
}

impl BossSnapshot {
    pub fn new(activity_type: ActivityType, kill_count: i64) -> Self {
        Self {
            activity_type,
            kill_count: Some(kill_count),
            rank: None,
        }
    }

    pub fn absent(activity_type: ActivityType) -> Self {
        Self {
            activity_type,
            kill_count: None,
            rank: None,
        }
    }
}

impl ActivitySnapshot {
    pub fn new(activity_type: ActivityType, score: i64) -> Self {
        Self {
            activity_type,
            score: Some(score),
            rank: None,
        }
    }

    pub fn absent(activity_type: ActivityType) -> Self {
        Self {
            activity_type,
            score: None,
            rank: None,
        }
    }
}
