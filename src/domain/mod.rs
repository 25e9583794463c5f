//! Domain types shared by the stores, caches and services.

pub mod activity_type;
pub mod delta;
pub mod snapshot;
pub mod window;

pub use activity_type::{
    ActivityCategory, ActivityType, ACTIVITY_ACTIVITY_TYPES, ALL_ACTIVITY_TYPES,
    BOSS_ACTIVITY_TYPES, SKILL_ACTIVITY_TYPES,
};
pub use delta::{total_experience_gain, ActivityDelta, BossDelta, HiscoreDelta, SkillDelta};
pub use snapshot::{ActivitySnapshot, BossSnapshot, HiscoreSnapshot, SkillSnapshot, SnapshotSource};
pub use window::{day_key, AggregationWindow};
