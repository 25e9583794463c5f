//! Aggregation windows and calendar bucket keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Calendar resolution used to pick one representative snapshot per bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregationWindow {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl AggregationWindow {
    pub const ALL: [AggregationWindow; 3] = [
        AggregationWindow::Daily,
        AggregationWindow::Weekly,
        AggregationWindow::Monthly,
    ];

    /// Parses a request value. Anything unrecognised normalizes to daily.
    pub fn parse_or_default(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => AggregationWindow::Daily,
            "weekly" | "week" => AggregationWindow::Weekly,
            "monthly" | "month" => AggregationWindow::Monthly,
            _ => AggregationWindow::Daily,
        }
    }

    /// Bucket key for `timestamp`: `YYYY-MM-DD`, ISO `YYYY-Www`, or `YYYY-MM`.
    ///
    /// Keys are zero-padded so lexical order matches chronological order
    /// within a window.
    pub fn bucket_key(&self, timestamp: &DateTime<Utc>) -> String {
        match self {
            AggregationWindow::Daily => day_key(timestamp),
            AggregationWindow::Weekly => timestamp.format("%G-W%V").to_string(),
            AggregationWindow::Monthly => timestamp.format("%Y-%m").to_string(),
        }
    }
}

/// UTC calendar day key (`YYYY-MM-DD`).
pub fn day_key(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d").to_string()
}
