//! Hiscore delta types.
//!
//! A delta is the sparse difference between two chronologically adjacent
//! snapshots of the same user. Only activity types that changed appear.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::activity_type::ActivityType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HiscoreDelta {
    pub id: String,
    pub user_id: String,
    pub snapshot_id: String,
    pub previous_snapshot_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub skills: Vec<SkillDelta>,
    #[serde(default)]
    pub bosses: Vec<BossDelta>,
    #[serde(default)]
    pub activities: Vec<ActivityDelta>,
    /// Sum of all positive experience gains across `skills`.
    #[serde(default)]
    pub total_experience_gain: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillDelta {
    pub activity_type: ActivityType,
    pub experience_gain: i64,
    pub level_gain: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BossDelta {
    pub activity_type: ActivityType,
    pub kill_count_gain: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDelta {
    pub activity_type: ActivityType,
    pub score_gain: i64,
}

impl HiscoreDelta {
    /// True when no activity type changed; such deltas are never persisted.
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty() && self.bosses.is_empty() && self.activities.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.skills.len() + self.bosses.len() + self.activities.len()
    }
}

/// Sums positive experience gains; negative gains never reduce the total.
pub fn total_experience_gain(skills: &[SkillDelta]) -> i64 {
    skills
        .iter()
        .map(|s| s.experience_gain)
        .filter(|gain| *gain > 0)
        .sum()
}
