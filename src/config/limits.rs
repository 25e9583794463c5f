//! Query span limits.
//!
//! | Query                  | Default max span |
//! |------------------------|------------------|
//! | Snapshot interval      | 3650 days        |
//! | Delta interval         | 1825 days        |
//! | Daily aggregation      | 366 days         |
//! | Weekly aggregation     | 732 days         |
//! | Monthly aggregation    | unlimited        |

use chrono::Duration;
use serde::Deserialize;

use crate::domain::AggregationWindow;

pub const DEFAULT_MAX_SNAPSHOT_INTERVAL_DAYS: i64 = 3650;
pub const DEFAULT_MAX_DELTA_INTERVAL_DAYS: i64 = 1825;
pub const DEFAULT_DAILY_WINDOW_MAX_DAYS: i64 = 366;
pub const DEFAULT_WEEKLY_WINDOW_MAX_DAYS: i64 = 732;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    pub max_snapshot_interval_days: i64,
    pub max_delta_interval_days: i64,
    pub daily_window_max_days: i64,
    pub weekly_window_max_days: i64,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_snapshot_interval_days: DEFAULT_MAX_SNAPSHOT_INTERVAL_DAYS,
            max_delta_interval_days: DEFAULT_MAX_DELTA_INTERVAL_DAYS,
            daily_window_max_days: DEFAULT_DAILY_WINDOW_MAX_DAYS,
            weekly_window_max_days: DEFAULT_WEEKLY_WINDOW_MAX_DAYS,
        }
    }
}

impl QueryLimits {
    pub fn max_snapshot_interval(&self) -> Duration {
        Duration::days(self.max_snapshot_interval_days)
    }

    pub fn max_delta_interval(&self) -> Duration {
        Duration::days(self.max_delta_interval_days)
    }

    /// Longest span `window` may aggregate over; `None` means unlimited.
    pub fn max_window_span(&self, window: AggregationWindow) -> Option<Duration> {
        match window {
            AggregationWindow::Daily => Some(Duration::days(self.daily_window_max_days)),
            AggregationWindow::Weekly => Some(Duration::days(self.weekly_window_max_days)),
            AggregationWindow::Monthly => None,
        }
    }
}
