//! Delta backfill.
//!
//! Derives deltas for users whose history predates live delta tracking.
//! Imported snapshots whose overall experience goes backwards are deleted
//! rather than diffed, and a cached user's snapshot entry is reloaded.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::calculator::{backfill_delta, is_regressive_import};
use crate::config::DEFAULT_PRIME_BATCH_DAYS;
use crate::domain::HiscoreSnapshot;
use crate::error::Result;
use crate::interfaces::{DeltaStore, SnapshotStore, TxContext, UserStore};
use crate::services::{DeltaService, SnapshotService};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    /// False when the user already had deltas.
    pub processed: bool,
    pub deltas_created: usize,
    pub snapshots_deleted: usize,
}

impl BackfillReport {
    fn absorb(&mut self, other: &BackfillReport) {
        self.processed |= other.processed;
        self.deltas_created += other.deltas_created;
        self.snapshots_deleted += other.snapshots_deleted;
    }
}

pub struct BackfillService {
    snapshots: Arc<dyn SnapshotStore>,
    delta_store: Arc<dyn DeltaStore>,
    users: Arc<dyn UserStore>,
    deltas: Arc<DeltaService>,
    snapshot_service: Arc<SnapshotService>,
}

impl BackfillService {
    pub fn new(
        snapshots: Arc<dyn SnapshotStore>,
        delta_store: Arc<dyn DeltaStore>,
        users: Arc<dyn UserStore>,
        deltas: Arc<DeltaService>,
        snapshot_service: Arc<SnapshotService>,
    ) -> Self {
        Self {
            snapshots,
            delta_store,
            users,
            deltas,
            snapshot_service,
        }
    }

    /// Backfills one user. Users that already have deltas are left alone.
    pub async fn backfill_user(&self, user_id: &str) -> Result<BackfillReport> {
        if self.delta_store.count_deltas_for_user(user_id).await? > 0 {
            debug!(user_id = %user_id, "User already has deltas, skipping backfill");
            return Ok(BackfillReport::default());
        }

        let history = self.snapshots.get_all_snapshots_for_user(user_id).await?;
        let mut report = BackfillReport {
            processed: true,
            ..Default::default()
        };
        let mut previous: Option<HiscoreSnapshot> = None;

        for current in history {
            let Some(prev) = previous.as_ref() else {
                previous = Some(current);
                continue;
            };
            if is_regressive_import(prev, &current) {
                warn!(
                    user_id = %user_id,
                    snapshot_id = %current.id,
                    previous_id = %prev.id,
                    "Deleting imported snapshot with regressed overall experience"
                );
                self.snapshots
                    .delete_snapshot(&TxContext::none(), &current.id)
                    .await?;
                report.snapshots_deleted += 1;
                continue;
            }
            if self
                .deltas
                .create_delta(&TxContext::none(), backfill_delta(prev, &current))
                .await?
                .is_some()
            {
                report.deltas_created += 1;
            }
            previous = Some(current);
        }

        self.deltas.prime_user(user_id).await?;
        if report.snapshots_deleted > 0 && self.snapshot_service.cache().is_cached(user_id) {
            self.snapshot_service
                .prime_user(
                    user_id,
                    Duration::days(DEFAULT_PRIME_BATCH_DAYS),
                    &CancellationToken::new(),
                )
                .await?;
        }
        info!(
            user_id = %user_id,
            deltas = report.deltas_created,
            deleted = report.snapshots_deleted,
            "Backfilled deltas"
        );
        Ok(report)
    }

    /// Backfills every tracked user in turn, stopping at the first error.
    pub async fn backfill_all(&self) -> Result<BackfillReport> {
        let mut total = BackfillReport::default();
        for user_id in self.users.get_tracked_user_ids().await? {
            total.absorb(&self.backfill_user(&user_id).await?);
        }
        Ok(total)
    }
}
