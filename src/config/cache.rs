//! Cache configuration.

use serde::Deserialize;

/// Default width of one concurrent priming fetch.
pub const DEFAULT_PRIME_BATCH_DAYS: i64 = 30;

/// Which snapshot cache representation serves interval queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheRepresentation {
    /// Precomputed daily, weekly and monthly best snapshots.
    #[default]
    Aggregate,
    /// Raw snapshots over a covered window, aggregated per query.
    Range,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub representation: CacheRepresentation,
    /// Load every tracked user's history before serving.
    pub prime_on_startup: bool,
    /// Span of each concurrent snapshot fetch while priming.
    pub prime_batch_days: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            representation: CacheRepresentation::Aggregate,
            prime_on_startup: true,
            prime_batch_days: DEFAULT_PRIME_BATCH_DAYS,
        }
    }
}
