//! Startup cache priming.
//!
//! One task per tracked user loads that user's snapshot and delta history
//! into the caches. Priming is best-effort: a user whose load fails is
//! logged and skipped, and nothing it does is fatal to the caller.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{HiscoreError, Result};
use crate::interfaces::UserStore;
use crate::services::{DeltaService, SnapshotService};

/// Per-run priming outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimeReport {
    pub users_primed: usize,
    pub users_failed: usize,
    pub snapshots_loaded: usize,
    pub deltas_loaded: usize,
    pub cancelled: bool,
}

/// Counts for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UserPrime {
    snapshots: usize,
    deltas: usize,
}

pub struct CachePrimer {
    users: Arc<dyn UserStore>,
    snapshots: Arc<SnapshotService>,
    deltas: Arc<DeltaService>,
    batch: Duration,
}

impl CachePrimer {
    pub fn new(
        users: Arc<dyn UserStore>,
        snapshots: Arc<SnapshotService>,
        deltas: Arc<DeltaService>,
        batch_days: i64,
    ) -> Self {
        Self {
            users,
            snapshots,
            deltas,
            batch: Duration::days(batch_days.max(1)),
        }
    }

    /// Primes both caches for every tracked user.
    ///
    /// Only a failure to list the tracked users is returned as an error.
    pub async fn prime_all(&self, cancel: &CancellationToken) -> Result<PrimeReport> {
        let user_ids = self.users.get_tracked_user_ids().await?;
        info!(users = user_ids.len(), "Priming caches");

        let mut tasks = JoinSet::new();
        for user_id in user_ids {
            let snapshots = self.snapshots.clone();
            let deltas = self.deltas.clone();
            let cancel = cancel.clone();
            let batch = self.batch;
            tasks.spawn(async move {
                let outcome = prime_user(&snapshots, &deltas, &user_id, batch, &cancel).await;
                (user_id, outcome)
            });
        }

        let mut report = PrimeReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(counts))) => {
                    report.users_primed += 1;
                    report.snapshots_loaded += counts.snapshots;
                    report.deltas_loaded += counts.deltas;
                }
                Ok((_, Err(HiscoreError::Cancelled))) => report.cancelled = true,
                Ok((user_id, Err(e))) => {
                    warn!(user_id = %user_id, error = %e, "Cache priming failed, skipping user");
                    report.users_failed += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Cache priming task panicked");
                    report.users_failed += 1;
                }
            }
        }

        info!(
            users_primed = report.users_primed,
            users_failed = report.users_failed,
            snapshots = report.snapshots_loaded,
            deltas = report.deltas_loaded,
            cancelled = report.cancelled,
            snapshot_cache_users = self.snapshots.cache().cached_users(),
            delta_cache_users = self.deltas.cache().stats().cached_users,
            "Cache priming finished"
        );
        Ok(report)
    }
}

async fn prime_user(
    snapshots: &SnapshotService,
    deltas: &DeltaService,
    user_id: &str,
    batch: Duration,
    cancel: &CancellationToken,
) -> Result<UserPrime> {
    let snapshot_count = snapshots.prime_user(user_id, batch, cancel).await?;
    if cancel.is_cancelled() {
        return Err(HiscoreError::Cancelled);
    }
    let delta_count = deltas.prime_user(user_id).await?;
    Ok(UserPrime {
        snapshots: snapshot_count,
        deltas: delta_count,
    })
}
