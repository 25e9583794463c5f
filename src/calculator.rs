//! Delta calculation.
//!
//! Two distinct inclusion policies:
//!
//! - [`live_delta`] runs when a snapshot has just been written. Any nonzero
//!   gain is recorded, regressions included.
//! - [`backfill_delta`] runs over historical data. Only strictly positive
//!   gains are recorded, and [`is_regressive_import`] flags imported
//!   snapshots whose overall experience went backwards so the caller can
//!   delete them instead of diffing them.
//!
//! In both paths an absent value never contributes to a delta.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    total_experience_gain, ActivityDelta, ActivityType, BossDelta, HiscoreDelta,
    HiscoreSnapshot, SkillDelta, SnapshotSource,
};

/// Difference of two present values.
fn gain(current: Option<i64>, previous: Option<i64>) -> Option<i64> {
    Some(current? - previous?)
}

/// Which gains a delta keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inclusion {
    Nonzero,
    Positive,
}

impl Inclusion {
    fn keeps(self, gain: i64) -> bool {
        match self {
            Inclusion::Nonzero => gain != 0,
            Inclusion::Positive => gain > 0,
        }
    }
}

/// Delta for a snapshot that was just written, relative to its predecessor.
///
/// Includes every activity type whose gain is nonzero. Skills are included
/// when either the experience or the level changed.
pub fn live_delta(previous: &HiscoreSnapshot, current: &HiscoreSnapshot) -> HiscoreDelta {
    compute(previous, current, Inclusion::Nonzero)
}

/// Delta derived from historical data. Only strictly positive gains count.
pub fn backfill_delta(previous: &HiscoreSnapshot, current: &HiscoreSnapshot) -> HiscoreDelta {
    compute(previous, current, Inclusion::Positive)
}

/// True when `current` is an imported snapshot whose overall experience is
/// lower than `previous`. Live snapshots are never flagged.
pub fn is_regressive_import(previous: &HiscoreSnapshot, current: &HiscoreSnapshot) -> bool {
    if current.source != SnapshotSource::Imported {
        return false;
    }
    let overall = |s: &HiscoreSnapshot| {
        s.skill(ActivityType::Overall).and_then(|skill| skill.experience)
    };
    matches!(
        gain(overall(current), overall(previous)),
        Some(change) if change < 0
    )
}

fn compute(previous: &HiscoreSnapshot, current: &HiscoreSnapshot, policy: Inclusion) -> HiscoreDelta {
    let prev_skills: HashMap<_, _> = previous
        .skills
        .iter()
        .map(|s| (s.activity_type, s))
        .collect();
    let skills: Vec<SkillDelta> = current
        .skills
        .iter()
        .filter_map(|curr| {
            let prev = prev_skills.get(&curr.activity_type)?;
            let xp = gain(curr.experience, prev.experience);
            let level = gain(curr.level, prev.level);
            let keep = match policy {
                Inclusion::Nonzero => {
                    xp.is_some_and(|g| policy.keeps(g)) || level.is_some_and(|g| policy.keeps(g))
                }
                Inclusion::Positive => xp.is_some_and(|g| policy.keeps(g)),
            };
            keep.then(|| SkillDelta {
                activity_type: curr.activity_type,
                experience_gain: xp.unwrap_or(0),
                level_gain: level.unwrap_or(0),
            })
        })
        .collect();

    let prev_bosses: HashMap<_, _> = previous
        .bosses
        .iter()
        .map(|b| (b.activity_type, b.kill_count))
        .collect();
    let bosses = current
        .bosses
        .iter()
        .filter_map(|curr| {
            let kc = gain(curr.kill_count, *prev_bosses.get(&curr.activity_type)?)?;
            policy.keeps(kc).then_some(BossDelta {
                activity_type: curr.activity_type,
                kill_count_gain: kc,
            })
        })
        .collect();

    let prev_activities: HashMap<_, _> = previous
        .activities
        .iter()
        .map(|a| (a.activity_type, a.score))
        .collect();
    let activities = current
        .activities
        .iter()
        .filter_map(|curr| {
            let score = gain(curr.score, *prev_activities.get(&curr.activity_type)?)?;
            policy.keeps(score).then_some(ActivityDelta {
                activity_type: curr.activity_type,
                score_gain: score,
            })
        })
        .collect();

    HiscoreDelta {
        id: Uuid::new_v4().to_string(),
        user_id: current.user_id.clone(),
        snapshot_id: current.id.clone(),
        previous_snapshot_id: previous.id.clone(),
        timestamp: current.timestamp,
        total_experience_gain: total_experience_gain(&skills),
        skills,
        bosses,
        activities,
    }
}

/// Summed gains per activity type, sorted by activity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GainTotals {
    pub skills: Vec<SkillDelta>,
    pub bosses: Vec<BossDelta>,
    pub activities: Vec<ActivityDelta>,
    pub total_experience_gain: i64,
}

#[derive(Default)]
struct GainAccumulator {
    skills: BTreeMap<ActivityType, (i64, i64)>,
    bosses: BTreeMap<ActivityType, i64>,
    activities: BTreeMap<ActivityType, i64>,
    total_experience_gain: i64,
}

impl GainAccumulator {
    fn add(&mut self, delta: &HiscoreDelta) {
        for s in &delta.skills {
            let entry = self.skills.entry(s.activity_type).or_default();
            entry.0 += s.experience_gain;
            entry.1 += s.level_gain;
        }
        for b in &delta.bosses {
            *self.bosses.entry(b.activity_type).or_default() += b.kill_count_gain;
        }
        for a in &delta.activities {
            *self.activities.entry(a.activity_type).or_default() += a.score_gain;
        }
        self.total_experience_gain += delta.total_experience_gain;
    }

    fn finish(self) -> GainTotals {
        GainTotals {
            skills: self
                .skills
                .into_iter()
                .map(|(activity_type, (experience_gain, level_gain))| SkillDelta {
                    activity_type,
                    experience_gain,
                    level_gain,
                })
                .collect(),
            bosses: self
                .bosses
                .into_iter()
                .map(|(activity_type, kill_count_gain)| BossDelta {
                    activity_type,
                    kill_count_gain,
                })
                .collect(),
            activities: self
                .activities
                .into_iter()
                .map(|(activity_type, score_gain)| ActivityDelta {
                    activity_type,
                    score_gain,
                })
                .collect(),
            total_experience_gain: self.total_experience_gain,
        }
    }
}

/// Sums gains across `deltas`.
pub fn sum_gains<'a>(deltas: impl IntoIterator<Item = &'a HiscoreDelta>) -> GainTotals {
    let mut acc = GainAccumulator::default();
    for delta in deltas {
        acc.add(delta);
    }
    acc.finish()
}

/// Merges two deltas that fall on the same day.
///
/// Gains are summed over the union of activity types. Identity fields come
/// from the later delta, `previous_snapshot_id` from the earlier one.
/// Ordering uses the timestamp then the id, so `merge(a, b) == merge(b, a)`.
pub fn merge_deltas(a: &HiscoreDelta, b: &HiscoreDelta) -> HiscoreDelta {
    let (earlier, later) = if (a.timestamp, &a.id) <= (b.timestamp, &b.id) {
        (a, b)
    } else {
        (b, a)
    };
    let totals = sum_gains([earlier, later]);
    HiscoreDelta {
        id: later.id.clone(),
        user_id: later.user_id.clone(),
        snapshot_id: later.snapshot_id.clone(),
        previous_snapshot_id: earlier.previous_snapshot_id.clone(),
        timestamp: later.timestamp,
        skills: totals.skills,
        bosses: totals.bosses,
        activities: totals.activities,
        total_experience_gain: totals.total_experience_gain,
    }
}
