//! Input validation for snapshots and query intervals.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{
    ActivityType, AggregationWindow, HiscoreSnapshot, ACTIVITY_ACTIVITY_TYPES,
    BOSS_ACTIVITY_TYPES, SKILL_ACTIVITY_TYPES,
};
use crate::error::{HiscoreError, Result};

/// Error constants for validation failures.
pub mod errmsg {
    pub const USER_ID_EMPTY: &str = "snapshot user id is empty";
    pub const TIMESTAMP_ZERO: &str = "snapshot timestamp is zero";
    pub const MISSING_SKILLS: &str = "snapshot must contain all skills";
    pub const MISSING_BOSSES: &str = "snapshot must contain all bosses";
    pub const MISSING_ACTIVITIES: &str = "snapshot must contain all activities";

    pub const START_EQUALS_END: &str = "start time must not equal end time";
    pub const INTERVAL_TOO_LONG: &str = "maximum time interval exceeded";
    pub const DAILY_SPAN: &str = "daily aggregation requires a shorter time range";
    pub const WEEKLY_SPAN: &str = "weekly aggregation requires a shorter time range";
}

/// Checks that one category covers every type in `expected` exactly once.
fn validate_category(
    present: impl Iterator<Item = ActivityType>,
    expected: &[ActivityType],
    category: &str,
    missing: &str,
) -> Result<()> {
    let mut seen = Vec::with_capacity(expected.len());
    for activity_type in present {
        if !expected.contains(&activity_type) {
            return Err(HiscoreError::Validation(format!(
                "{activity_type} is not a {category} activity type"
            )));
        }
        if seen.contains(&activity_type) {
            return Err(HiscoreError::Validation(format!(
                "duplicate {category} entry: {activity_type}"
            )));
        }
        seen.push(activity_type);
    }
    if seen.len() < expected.len() {
        return Err(HiscoreError::Validation(missing.to_string()));
    }
    Ok(())
}

/// Validate a snapshot before it is stored.
///
/// Rules:
/// - User id must not be empty
/// - Timestamp must not be the Unix epoch
/// - Skills, bosses and activities each list every type of their category once
pub fn validate_snapshot(snapshot: &HiscoreSnapshot) -> Result<()> {
    if snapshot.timestamp.timestamp_millis() == 0 {
        return Err(HiscoreError::Validation(errmsg::TIMESTAMP_ZERO.to_string()));
    }
    if snapshot.user_id.trim().is_empty() {
        return Err(HiscoreError::Validation(errmsg::USER_ID_EMPTY.to_string()));
    }
    validate_category(
        snapshot.skills.iter().map(|s| s.activity_type),
        SKILL_ACTIVITY_TYPES,
        "skill",
        errmsg::MISSING_SKILLS,
    )?;
    validate_category(
        snapshot.bosses.iter().map(|b| b.activity_type),
        BOSS_ACTIVITY_TYPES,
        "boss",
        errmsg::MISSING_BOSSES,
    )?;
    validate_category(
        snapshot.activities.iter().map(|a| a.activity_type),
        ACTIVITY_ACTIVITY_TYPES,
        "activity",
        errmsg::MISSING_ACTIVITIES,
    )
}

/// Normalizes a requested time range against the current time.
pub fn validate_interval(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    max_span: Duration,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    validate_interval_at(start, end, max_span, Utc::now())
}

/// [`validate_interval`] with an explicit "now".
///
/// Rejects `start == end`, clamps `end` to `now`, swaps inverted bounds,
/// then rejects spans longer than `max_span`.
pub fn validate_interval_at(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    max_span: Duration,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    if start == end {
        return Err(HiscoreError::InvalidInterval(
            errmsg::START_EQUALS_END.to_string(),
        ));
    }
    let end = end.min(now);
    let (start, end) = if end < start { (end, start) } else { (start, end) };
    if end - start > max_span {
        return Err(HiscoreError::InvalidInterval(
            errmsg::INTERVAL_TOO_LONG.to_string(),
        ));
    }
    Ok((start, end))
}

/// Rejects windows too fine for the span; `max_span` of `None` means unlimited.
pub fn validate_aggregation_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    window: AggregationWindow,
    max_span: Option<Duration>,
) -> Result<()> {
    let Some(max_span) = max_span else {
        return Ok(());
    };
    if end - start <= max_span {
        return Ok(());
    }
    let msg = match window {
        AggregationWindow::Weekly => errmsg::WEEKLY_SPAN,
        _ => errmsg::DAILY_SPAN,
    };
    Err(HiscoreError::InvalidAggregationWindow(format!(
        "{msg} (max: {} days)",
        max_span.num_days()
    )))
}
