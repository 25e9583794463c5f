//! Hiscore orchestrator.
//!
//! Composes the snapshot and delta services into the two primary use
//! cases: recording a snapshot together with its delta, and fetching a
//! baseline snapshot with the deltas of a window.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::calculator::live_delta;
use crate::domain::{HiscoreDelta, HiscoreSnapshot};
use crate::error::{HiscoreError, Result};
use crate::interfaces::TxContext;
use crate::services::{DeltaService, SnapshotService};
use crate::transaction::TransactionManager;

/// Outcome of recording a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotWithDelta {
    pub snapshot: HiscoreSnapshot,
    /// `None` when nothing changed since the previous snapshot, or there was none.
    pub delta: Option<HiscoreDelta>,
}

/// A baseline snapshot plus the deltas that follow it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaSummary {
    pub snapshot: HiscoreSnapshot,
    pub deltas: Vec<HiscoreDelta>,
}

pub struct HiscoreOrchestrator {
    snapshots: Arc<SnapshotService>,
    deltas: Arc<DeltaService>,
    transactions: Arc<TransactionManager>,
}

impl HiscoreOrchestrator {
    pub fn new(
        snapshots: Arc<SnapshotService>,
        deltas: Arc<DeltaService>,
        transactions: Arc<TransactionManager>,
    ) -> Self {
        Self {
            snapshots,
            deltas,
            transactions,
        }
    }

    /// Stores `snapshot` and its live delta in one unit of work.
    ///
    /// The previous snapshot is read before the transaction opens. Caches
    /// are updated only after the transaction commits.
    pub async fn create_snapshot_with_delta(
        &self,
        snapshot: HiscoreSnapshot,
    ) -> Result<SnapshotWithDelta> {
        let previous = self.snapshots.find_latest(&snapshot.user_id).await?;

        let previous = previous.as_ref();
        let (created, delta) = self
            .transactions
            .with_transaction(&TxContext::none(), |ctx| async move {
                let created = self
                    .snapshots
                    .insert_snapshot(&ctx, snapshot, previous)
                    .await?;
                let delta = match previous {
                    Some(prev) => {
                        self.deltas
                            .create_delta(&ctx, live_delta(prev, &created))
                            .await?
                    }
                    None => None,
                };
                Ok((created, delta))
            })
            .await?;

        self.snapshots.record_in_cache(&created, previous);
        if let Some(delta) = &delta {
            self.deltas.record_in_cache(delta);
        }
        info!(
            user_id = %created.user_id,
            snapshot_id = %created.id,
            delta = delta.is_some(),
            "Recorded snapshot"
        );
        Ok(SnapshotWithDelta {
            snapshot: created,
            delta,
        })
    }

    /// Snapshot nearest `start` plus the day-merged deltas in `[start, end]`.
    ///
    /// Fails with [`HiscoreError::NoBaseline`] when the user has no snapshot.
    /// An empty delta list is not an error.
    pub async fn get_delta_summary(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DeltaSummary> {
        let (start, end) = self.deltas.validate_interval(start, end)?;
        let snapshot = self
            .snapshots
            .find_nearest(user_id, start)
            .await?
            .ok_or_else(|| HiscoreError::NoBaseline {
                user_id: user_id.to_string(),
            })?;
        let deltas = self.deltas.fetch_deltas(user_id, start, end).await?;
        Ok(DeltaSummary { snapshot, deltas })
    }
}

#[cfg(test)]
mod tests;
