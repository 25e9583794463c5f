//! In-memory store backend.
//!
//! Implements every store interface over process-local maps. Transactions
//! are modelled by staging writes per [`TxnId`] and applying them in order
//! on commit, so an aborted unit of work leaves no trace. Failure switches
//! let tests exercise the error paths of the services above.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{HiscoreDelta, HiscoreSnapshot};
use crate::interfaces::{
    DeltaStore, Result, SnapshotStore, StorageError, Transactor, TxContext, TxnId, UserStore,
};

/// A write waiting for its transaction to commit.
#[derive(Debug, Clone)]
enum PendingWrite {
    InsertSnapshot(HiscoreSnapshot),
    DeleteSnapshot(String),
    InsertDelta(HiscoreDelta),
}

/// Committed data, keyed by user id. Each list is kept sorted by timestamp.
#[derive(Default)]
struct Tables {
    snapshots: HashMap<String, Vec<HiscoreSnapshot>>,
    deltas: HashMap<String, Vec<HiscoreDelta>>,
}

impl Tables {
    fn apply(&mut self, write: PendingWrite) -> Result<()> {
        match write {
            PendingWrite::InsertSnapshot(snapshot) => self.insert_snapshot(snapshot),
            PendingWrite::DeleteSnapshot(id) => self.delete_snapshot(&id),
            PendingWrite::InsertDelta(delta) => self.insert_delta(delta),
        }
    }

    fn insert_snapshot(&mut self, snapshot: HiscoreSnapshot) -> Result<()> {
        if self.find_snapshot(&snapshot.id).is_some() {
            return Err(StorageError::Conflict(format!("snapshot {}", snapshot.id)));
        }
        let list = self.snapshots.entry(snapshot.user_id.clone()).or_default();
        let at = list.partition_point(|s| s.timestamp <= snapshot.timestamp);
        list.insert(at, snapshot);
        Ok(())
    }

    fn delete_snapshot(&mut self, id: &str) -> Result<()> {
        for list in self.snapshots.values_mut() {
            if let Some(pos) = list.iter().position(|s| s.id == id) {
                list.remove(pos);
                return Ok(());
            }
        }
        Err(StorageError::not_found("snapshot", id))
    }

    fn insert_delta(&mut self, delta: HiscoreDelta) -> Result<()> {
        if self.find_delta(&delta.id).is_some() {
            return Err(StorageError::Conflict(format!("delta {}", delta.id)));
        }
        let list = self.deltas.entry(delta.user_id.clone()).or_default();
        let at = list.partition_point(|d| d.timestamp <= delta.timestamp);
        list.insert(at, delta);
        Ok(())
    }

    /// Checks that `writes` would all apply in order, without applying any.
    fn check(&self, writes: &[PendingWrite]) -> Result<()> {
        let mut inserted: HashSet<&str> = HashSet::new();
        let mut deleted: HashSet<&str> = HashSet::new();
        let mut deltas: HashSet<&str> = HashSet::new();
        for write in writes {
            match write {
                PendingWrite::InsertSnapshot(snapshot) => {
                    let id = snapshot.id.as_str();
                    let committed = self.find_snapshot(id).is_some() && !deleted.contains(id);
                    if committed || !inserted.insert(id) {
                        return Err(StorageError::Conflict(format!("snapshot {id}")));
                    }
                    deleted.remove(id);
                }
                PendingWrite::DeleteSnapshot(id) => {
                    let id = id.as_str();
                    let committed = self.find_snapshot(id).is_some() && !deleted.contains(id);
                    if !inserted.remove(id) && !committed {
                        return Err(StorageError::not_found("snapshot", id));
                    }
                    deleted.insert(id);
                }
                PendingWrite::InsertDelta(delta) => {
                    let id = delta.id.as_str();
                    if self.find_delta(id).is_some() || !deltas.insert(id) {
                        return Err(StorageError::Conflict(format!("delta {id}")));
                    }
                }
            }
        }
        Ok(())
    }

    fn find_delta(&self, id: &str) -> Option<&HiscoreDelta> {
        self.deltas
            .values()
            .flat_map(|list| list.iter())
            .find(|d| d.id == id)
    }

    fn find_snapshot(&self, id: &str) -> Option<&HiscoreSnapshot> {
        self.snapshots
            .values()
            .flat_map(|list| list.iter())
            .find(|s| s.id == id)
    }

    fn user_snapshots(&self, user_id: &str) -> &[HiscoreSnapshot] {
        self.snapshots
            .get(user_id)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    fn user_deltas(&self, user_id: &str) -> &[HiscoreDelta] {
        self.deltas
            .get(user_id)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }
}

/// In-memory implementation of all store interfaces.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    pending: RwLock<HashMap<TxnId, Vec<PendingWrite>>>,
    tracked_users: RwLock<Vec<String>>,
    next_txn: AtomicU64,
    fail_on_get: RwLock<bool>,
    fail_on_insert_snapshot: RwLock<bool>,
    fail_on_insert_delta: RwLock<bool>,
    fail_on_commit: RwLock<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_get(&self, fail: bool) {
        *self.fail_on_get.write().await = fail;
    }

    pub async fn set_fail_on_insert_snapshot(&self, fail: bool) {
        *self.fail_on_insert_snapshot.write().await = fail;
    }

    pub async fn set_fail_on_insert_delta(&self, fail: bool) {
        *self.fail_on_insert_delta.write().await = fail;
    }

    pub async fn set_fail_on_commit(&self, fail: bool) {
        *self.fail_on_commit.write().await = fail;
    }

    /// Mark a user as tracked so cache priming picks it up.
    pub async fn track_user(&self, user_id: &str) {
        let mut users = self.tracked_users.write().await;
        if !users.iter().any(|u| u == user_id) {
            users.push(user_id.to_string());
        }
    }

    /// Number of transactions begun but not yet committed or aborted.
    pub async fn open_transactions(&self) -> usize {
        self.pending.read().await.len()
    }

    pub async fn snapshot_count(&self, user_id: &str) -> usize {
        self.tables.read().await.user_snapshots(user_id).len()
    }

    async fn check_get(&self) -> Result<()> {
        if *self.fail_on_get.read().await {
            return Err(StorageError::Database("injected read failure".to_string()));
        }
        Ok(())
    }

    /// Applies `write` directly, or stages it under the context's transaction.
    async fn write(&self, ctx: &TxContext, write: PendingWrite) -> Result<()> {
        match ctx.txn() {
            Some(txn) => {
                let mut pending = self.pending.write().await;
                let staged = pending
                    .get_mut(&txn)
                    .ok_or_else(|| StorageError::Transaction(format!("unknown transaction {txn}")))?;
                staged.push(write);
                Ok(())
            }
            None => self.tables.write().await.apply(write),
        }
    }
}

#[async_trait]
impl Transactor for MemoryStore {
    async fn begin(&self) -> Result<TxnId> {
        let txn = self.next_txn.fetch_add(1, Ordering::SeqCst) + 1;
        self.pending.write().await.insert(txn, Vec::new());
        debug!(txn, "Began transaction");
        Ok(txn)
    }

    async fn commit(&self, txn: TxnId) -> Result<()> {
        if *self.fail_on_commit.read().await {
            return Err(StorageError::Transaction("injected commit failure".to_string()));
        }
        let writes = self
            .pending
            .write()
            .await
            .remove(&txn)
            .ok_or_else(|| StorageError::Transaction(format!("unknown transaction {txn}")))?;

        // All or nothing: a batch that fails the check leaves committed data untouched.
        let mut tables = self.tables.write().await;
        tables.check(&writes)?;
        for write in writes {
            tables.apply(write)?;
        }
        debug!(txn, "Committed transaction");
        Ok(())
    }

    async fn abort(&self, txn: TxnId) -> Result<()> {
        self.pending.write().await.remove(&txn);
        debug!(txn, "Aborted transaction");
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn insert_snapshot(
        &self,
        ctx: &TxContext,
        snapshot: HiscoreSnapshot,
    ) -> Result<HiscoreSnapshot> {
        if *self.fail_on_insert_snapshot.read().await {
            return Err(StorageError::Database("injected snapshot insert failure".to_string()));
        }
        self.write(ctx, PendingWrite::InsertSnapshot(snapshot.clone()))
            .await?;
        Ok(snapshot)
    }

    async fn delete_snapshot(&self, ctx: &TxContext, id: &str) -> Result<()> {
        self.write(ctx, PendingWrite::DeleteSnapshot(id.to_string()))
            .await
    }

    async fn get_snapshot_by_id(&self, id: &str) -> Result<HiscoreSnapshot> {
        self.check_get().await?;
        self.tables
            .read()
            .await
            .find_snapshot(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("snapshot", id))
    }

    async fn get_latest_snapshot_for_user(&self, user_id: &str) -> Result<HiscoreSnapshot> {
        self.check_get().await?;
        self.tables
            .read()
            .await
            .user_snapshots(user_id)
            .last()
            .cloned()
            .ok_or_else(|| StorageError::not_found("snapshot", user_id))
    }

    async fn get_oldest_snapshot_for_user(&self, user_id: &str) -> Result<HiscoreSnapshot> {
        self.check_get().await?;
        self.tables
            .read()
            .await
            .user_snapshots(user_id)
            .first()
            .cloned()
            .ok_or_else(|| StorageError::not_found("snapshot", user_id))
    }

    async fn get_snapshots_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HiscoreSnapshot>> {
        self.check_get().await?;
        Ok(self
            .tables
            .read()
            .await
            .user_snapshots(user_id)
            .iter()
            .filter(|s| s.timestamp >= start && s.timestamp <= end)
            .cloned()
            .collect())
    }

    async fn get_snapshot_nearest_less_than(
        &self,
        user_id: &str,
        target: DateTime<Utc>,
    ) -> Result<HiscoreSnapshot> {
        self.check_get().await?;
        self.tables
            .read()
            .await
            .user_snapshots(user_id)
            .iter()
            .rev()
            .find(|s| s.timestamp <= target)
            .cloned()
            .ok_or_else(|| StorageError::not_found("snapshot", user_id))
    }

    async fn get_snapshot_nearest_greater_than(
        &self,
        user_id: &str,
        target: DateTime<Utc>,
    ) -> Result<HiscoreSnapshot> {
        self.check_get().await?;
        self.tables
            .read()
            .await
            .user_snapshots(user_id)
            .iter()
            .find(|s| s.timestamp >= target)
            .cloned()
            .ok_or_else(|| StorageError::not_found("snapshot", user_id))
    }

    async fn get_all_snapshots_for_user(&self, user_id: &str) -> Result<Vec<HiscoreSnapshot>> {
        self.check_get().await?;
        Ok(self.tables.read().await.user_snapshots(user_id).to_vec())
    }
}

#[async_trait]
impl DeltaStore for MemoryStore {
    async fn insert_delta(&self, ctx: &TxContext, delta: HiscoreDelta) -> Result<HiscoreDelta> {
        if *self.fail_on_insert_delta.read().await {
            return Err(StorageError::Database("injected delta insert failure".to_string()));
        }
        self.write(ctx, PendingWrite::InsertDelta(delta.clone()))
            .await?;
        Ok(delta)
    }

    async fn get_delta_by_id(&self, id: &str) -> Result<HiscoreDelta> {
        self.check_get().await?;
        self.tables
            .read()
            .await
            .deltas
            .values()
            .flat_map(|list| list.iter())
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("delta", id))
    }

    async fn get_latest_delta_for_user(&self, user_id: &str) -> Result<HiscoreDelta> {
        self.check_get().await?;
        self.tables
            .read()
            .await
            .user_deltas(user_id)
            .last()
            .cloned()
            .ok_or_else(|| StorageError::not_found("delta", user_id))
    }

    async fn get_deltas_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HiscoreDelta>> {
        self.check_get().await?;
        Ok(self
            .tables
            .read()
            .await
            .user_deltas(user_id)
            .iter()
            .filter(|d| d.timestamp >= start && d.timestamp <= end)
            .cloned()
            .collect())
    }

    async fn get_all_deltas_for_user(&self, user_id: &str) -> Result<Vec<HiscoreDelta>> {
        self.check_get().await?;
        Ok(self.tables.read().await.user_deltas(user_id).to_vec())
    }

    async fn count_deltas_for_user(&self, user_id: &str) -> Result<u64> {
        self.check_get().await?;
        Ok(self.tables.read().await.user_deltas(user_id).len() as u64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_tracked_user_ids(&self) -> Result<Vec<String>> {
        self.check_get().await?;
        Ok(self.tracked_users.read().await.clone())
    }
}

#[cfg(test)]
mod tests;
