//! Compact binary encoding of a delta summary.
//!
//! Served instead of JSON when the client sends
//! `Accept: application/x-hazelmere-binary`. All integers are big-endian.
//!
//! ```text
//! header      version u8, flags u8 (reserved, 0)
//! snapshot    timestamp i64 (unix ms)
//!             skill count u8,    { index u8, experience i32, level i16 }
//!             boss count u8,     { index u8, kill count i32 }
//!             activity count u8, { index u8, score i32 }
//! deltas      count u16
//!             per delta: timestamp i64 (unix ms)
//!             skill count u8,    { index u8, experience gain i32, level gain i16 }
//!             boss count u8,     { index u8, kill count gain i32 }
//!             activity count u8, { index u8, score gain i32 }
//! ```
//!
//! Activity indices are positions in [`ALL_ACTIVITY_TYPES`](crate::domain::ALL_ACTIVITY_TYPES).
//! Ranks, ids and the user id are not carried. Absent values encode as -1.

use bytes::{BufMut, Bytes, BytesMut};

use crate::domain::{ActivityType, HiscoreDelta, HiscoreSnapshot};
use crate::services::DeltaSummary;

pub const BINARY_CONTENT_TYPE: &str = "application/x-hazelmere-binary";

pub const BINARY_VERSION: u8 = 1;

const ABSENT: i64 = -1;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("{field} value {value} does not fit the binary layout")]
    ValueOutOfRange { field: &'static str, value: i64 },

    #[error("too many {what} entries: {count}")]
    TooManyEntries { what: &'static str, count: usize },
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Encodes `summary` in the compact binary layout.
///
/// Values that do not fit their fixed-width field are rejected rather than
/// truncated.
pub fn encode_delta_summary(summary: &DeltaSummary) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(512);
    buf.put_u8(BINARY_VERSION);
    buf.put_u8(0);
    put_snapshot(&mut buf, &summary.snapshot)?;

    let count = u16::try_from(summary.deltas.len()).map_err(|_| CodecError::TooManyEntries {
        what: "delta",
        count: summary.deltas.len(),
    })?;
    buf.put_u16(count);
    for delta in &summary.deltas {
        put_delta(&mut buf, delta)?;
    }
    Ok(buf.freeze())
}

fn put_snapshot(buf: &mut BytesMut, snapshot: &HiscoreSnapshot) -> Result<()> {
    buf.put_i64(snapshot.timestamp.timestamp_millis());

    put_count(buf, "skill", snapshot.skills.len())?;
    for s in &snapshot.skills {
        put_index(buf, s.activity_type);
        buf.put_i32(narrow32("experience", s.experience.unwrap_or(ABSENT))?);
        buf.put_i16(narrow16("level", s.level.unwrap_or(ABSENT))?);
    }

    put_count(buf, "boss", snapshot.bosses.len())?;
    for b in &snapshot.bosses {
        put_index(buf, b.activity_type);
        buf.put_i32(narrow32("kill count", b.kill_count.unwrap_or(ABSENT))?);
    }

    put_count(buf, "activity", snapshot.activities.len())?;
    for a in &snapshot.activities {
        put_index(buf, a.activity_type);
        buf.put_i32(narrow32("score", a.score.unwrap_or(ABSENT))?);
    }
    Ok(())
}

fn put_delta(buf: &mut BytesMut, delta: &HiscoreDelta) -> Result<()> {
    buf.put_i64(delta.timestamp.timestamp_millis());

    put_count(buf, "skill delta", delta.skills.len())?;
    for s in &delta.skills {
        put_index(buf, s.activity_type);
        buf.put_i32(narrow32("experience gain", s.experience_gain)?);
        buf.put_i16(narrow16("level gain", s.level_gain)?);
    }

    put_count(buf, "boss delta", delta.bosses.len())?;
    for b in &delta.bosses {
        put_index(buf, b.activity_type);
        buf.put_i32(narrow32("kill count gain", b.kill_count_gain)?);
    }

    put_count(buf, "activity delta", delta.activities.len())?;
    for a in &delta.activities {
        put_index(buf, a.activity_type);
        buf.put_i32(narrow32("score gain", a.score_gain)?);
    }
    Ok(())
}

fn put_index(buf: &mut BytesMut, activity_type: ActivityType) {
    buf.put_u8(activity_type.index());
}

fn put_count(buf: &mut BytesMut, what: &'static str, count: usize) -> Result<()> {
    let n = u8::try_from(count).map_err(|_| CodecError::TooManyEntries { what, count })?;
    buf.put_u8(n);
    Ok(())
}

fn narrow32(field: &'static str, value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| CodecError::ValueOutOfRange { field, value })
}

fn narrow16(field: &'static str, value: i64) -> Result<i16> {
    i16::try_from(value).map_err(|_| CodecError::ValueOutOfRange { field, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        BossDelta, SkillDelta, ACTIVITY_ACTIVITY_TYPES, BOSS_ACTIVITY_TYPES, SKILL_ACTIVITY_TYPES,
    };
    use crate::test_utils::{at_hours, SnapshotBuilder};

    fn snapshot_len() -> usize {
        8 + 1
            + SKILL_ACTIVITY_TYPES.len() * 7
            + 1
            + BOSS_ACTIVITY_TYPES.len() * 5
            + 1
            + ACTIVITY_ACTIVITY_TYPES.len() * 5
    }

    fn summary(deltas: Vec<HiscoreDelta>) -> DeltaSummary {
        DeltaSummary {
            snapshot: SnapshotBuilder::new("u1", "s1", at_hours(1))
                .overall(123_456)
                .boss(ActivityType::Zulrah, 7)
                .build(),
            deltas,
        }
    }

    fn delta() -> HiscoreDelta {
        HiscoreDelta {
            id: "d1".to_string(),
            user_id: "u1".to_string(),
            snapshot_id: "s2".to_string(),
            previous_snapshot_id: "s1".to_string(),
            timestamp: at_hours(2),
            skills: vec![SkillDelta {
                activity_type: ActivityType::Attack,
                experience_gain: -5,
                level_gain: 1,
            }],
            bosses: vec![BossDelta {
                activity_type: ActivityType::Zulrah,
                kill_count_gain: 2,
            }],
            activities: vec![],
            total_experience_gain: 0,
        }
    }

    #[test]
    fn test_header_and_snapshot_layout() {
        let bytes = encode_delta_summary(&summary(vec![])).unwrap();
        assert_eq!(bytes.len(), 2 + snapshot_len() + 2);
        assert_eq!(&bytes[..2], &[BINARY_VERSION, 0]);
        assert_eq!(
            i64::from_be_bytes(bytes[2..10].try_into().unwrap()),
            at_hours(1).timestamp_millis()
        );
        assert_eq!(bytes[10] as usize, SKILL_ACTIVITY_TYPES.len());

        // Skills are in hiscore order; Overall comes first.
        assert_eq!(bytes[11], ActivityType::Overall.index());
        assert_eq!(i32::from_be_bytes(bytes[12..16].try_into().unwrap()), 123_456);
        assert_eq!(i16::from_be_bytes(bytes[16..18].try_into().unwrap()), 32);

        assert_eq!(&bytes[bytes.len() - 2..], &[0, 0]);
    }

    #[test]
    fn test_absent_values_encode_as_minus_one() {
        let bytes = encode_delta_summary(&summary(vec![])).unwrap();
        let bosses_at = 2 + 8 + 1 + SKILL_ACTIVITY_TYPES.len() * 7;
        assert_eq!(bytes[bosses_at] as usize, BOSS_ACTIVITY_TYPES.len());
        let first = bosses_at + 1;
        assert_eq!(bytes[first], BOSS_ACTIVITY_TYPES[0].index());
        assert_ne!(BOSS_ACTIVITY_TYPES[0], ActivityType::Zulrah);
        assert_eq!(i32::from_be_bytes(bytes[first + 1..first + 5].try_into().unwrap()), -1);
    }

    #[test]
    fn test_sparse_delta_layout() {
        let bytes = encode_delta_summary(&summary(vec![delta()])).unwrap();
        let at = 2 + snapshot_len();
        assert_eq!(u16::from_be_bytes(bytes[at..at + 2].try_into().unwrap()), 1);

        let d = &bytes[at + 2..];
        assert_eq!(
            i64::from_be_bytes(d[..8].try_into().unwrap()),
            at_hours(2).timestamp_millis()
        );
        assert_eq!(d[8], 1);
        assert_eq!(d[9], ActivityType::Attack.index());
        assert_eq!(i32::from_be_bytes(d[10..14].try_into().unwrap()), -5);
        assert_eq!(i16::from_be_bytes(d[14..16].try_into().unwrap()), 1);
        assert_eq!(d[16], 1);
        assert_eq!(d[17], ActivityType::Zulrah.index());
        assert_eq!(i32::from_be_bytes(d[18..22].try_into().unwrap()), 2);
        assert_eq!(d[22], 0);
        assert_eq!(d.len(), 23);
    }

    #[test]
    fn test_rejects_values_that_do_not_fit() {
        let mut big = summary(vec![]);
        big.snapshot.skills[0].experience = Some(4_600_000_000);
        assert_eq!(
            encode_delta_summary(&big).unwrap_err(),
            CodecError::ValueOutOfRange {
                field: "experience",
                value: 4_600_000_000
            }
        );

        let mut gain = delta();
        gain.skills[0].level_gain = 40_000;
        assert!(matches!(
            encode_delta_summary(&summary(vec![gain])),
            Err(CodecError::ValueOutOfRange { field: "level gain", .. })
        ));
    }
}
