use super::*;
use crate::test_utils::{at_hours, snapshot};

fn delta(user_id: &str, id: &str, hours: i64) -> HiscoreDelta {
    HiscoreDelta {
        id: id.to_string(),
        user_id: user_id.to_string(),
        snapshot_id: format!("s-{id}"),
        previous_snapshot_id: format!("p-{id}"),
        timestamp: at_hours(hours),
        skills: vec![],
        bosses: vec![],
        activities: vec![],
        total_experience_gain: 0,
    }
}

#[tokio::test]
async fn test_snapshots_are_kept_in_timestamp_order() {
    let store = MemoryStore::new();
    let ctx = TxContext::none();
    store.insert_snapshot(&ctx, snapshot("u1", "b", at_hours(5), 200, 0)).await.unwrap();
    store.insert_snapshot(&ctx, snapshot("u1", "a", at_hours(1), 100, 0)).await.unwrap();
    store.insert_snapshot(&ctx, snapshot("u1", "c", at_hours(9), 300, 0)).await.unwrap();

    let all = store.get_all_snapshots_for_user("u1").await.unwrap();
    let ids: Vec<_> = all.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(store.get_latest_snapshot_for_user("u1").await.unwrap().id, "c");
    assert_eq!(store.get_oldest_snapshot_for_user("u1").await.unwrap().id, "a");
}

#[tokio::test]
async fn test_range_bounds_are_inclusive() {
    let store = MemoryStore::new();
    let ctx = TxContext::none();
    for (id, h) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
        store.insert_snapshot(&ctx, snapshot("u1", id, at_hours(h), h, 0)).await.unwrap();
    }
    let range = store
        .get_snapshots_in_range("u1", at_hours(2), at_hours(3))
        .await
        .unwrap();
    let ids: Vec<_> = range.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c"]);
}

#[tokio::test]
async fn test_nearest_lookups() {
    let store = MemoryStore::new();
    let ctx = TxContext::none();
    store.insert_snapshot(&ctx, snapshot("u1", "a", at_hours(10), 1, 0)).await.unwrap();
    store.insert_snapshot(&ctx, snapshot("u1", "b", at_hours(20), 2, 0)).await.unwrap();

    let lower = store.get_snapshot_nearest_less_than("u1", at_hours(15)).await.unwrap();
    let upper = store.get_snapshot_nearest_greater_than("u1", at_hours(15)).await.unwrap();
    assert_eq!(lower.id, "a");
    assert_eq!(upper.id, "b");

    let exact = store.get_snapshot_nearest_less_than("u1", at_hours(20)).await.unwrap();
    assert_eq!(exact.id, "b");

    let err = store
        .get_snapshot_nearest_less_than("u1", at_hours(5))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_missing_user_returns_not_found() {
    let store = MemoryStore::new();
    let err = store.get_latest_snapshot_for_user("ghost").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(store.get_all_deltas_for_user("ghost").await.unwrap().is_empty());
    assert_eq!(store.count_deltas_for_user("ghost").await.unwrap(), 0);
}

#[tokio::test]
async fn test_duplicate_snapshot_id_conflicts() {
    let store = MemoryStore::new();
    let ctx = TxContext::none();
    store.insert_snapshot(&ctx, snapshot("u1", "a", at_hours(1), 1, 0)).await.unwrap();
    let err = store
        .insert_snapshot(&ctx, snapshot("u1", "a", at_hours(2), 2, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));
}

#[tokio::test]
async fn test_transaction_writes_are_invisible_until_commit() {
    let store = MemoryStore::new();
    let txn = store.begin().await.unwrap();
    let ctx = TxContext::within(txn);
    store.insert_snapshot(&ctx, snapshot("u1", "a", at_hours(1), 1, 0)).await.unwrap();
    store.insert_delta(&ctx, delta("u1", "d1", 1)).await.unwrap();

    assert_eq!(store.snapshot_count("u1").await, 0);
    assert_eq!(store.count_deltas_for_user("u1").await.unwrap(), 0);

    store.commit(txn).await.unwrap();
    assert_eq!(store.snapshot_count("u1").await, 1);
    assert_eq!(store.count_deltas_for_user("u1").await.unwrap(), 1);
    assert_eq!(store.open_transactions().await, 0);
}

#[tokio::test]
async fn test_abort_discards_staged_writes() {
    let store = MemoryStore::new();
    let txn = store.begin().await.unwrap();
    let ctx = TxContext::within(txn);
    store.insert_snapshot(&ctx, snapshot("u1", "a", at_hours(1), 1, 0)).await.unwrap();
    store.abort(txn).await.unwrap();

    assert_eq!(store.snapshot_count("u1").await, 0);
    assert_eq!(store.open_transactions().await, 0);
}

#[tokio::test]
async fn test_failed_commit_applies_nothing() {
    let store = MemoryStore::new();
    let ctx = TxContext::none();
    store.insert_snapshot(&ctx, snapshot("u1", "a", at_hours(1), 1, 0)).await.unwrap();

    let txn = store.begin().await.unwrap();
    let tx_ctx = TxContext::within(txn);
    store.insert_snapshot(&tx_ctx, snapshot("u1", "b", at_hours(2), 2, 0)).await.unwrap();
    // Duplicate of a committed id, rejected when the commit is applied.
    store.insert_snapshot(&tx_ctx, snapshot("u1", "a", at_hours(3), 3, 0)).await.unwrap();

    let err = store.commit(txn).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));
    assert_eq!(store.snapshot_count("u1").await, 1);
}

#[tokio::test]
async fn test_commit_checks_writes_against_earlier_writes_in_the_batch() {
    let store = MemoryStore::new();
    store
        .insert_snapshot(&TxContext::none(), snapshot("u1", "a", at_hours(1), 1, 0))
        .await
        .unwrap();

    // Deleting and then reinserting a committed id is a valid batch.
    let txn = store.begin().await.unwrap();
    let ctx = TxContext::within(txn);
    store.delete_snapshot(&ctx, "a").await.unwrap();
    store.insert_snapshot(&ctx, snapshot("u1", "a", at_hours(4), 4, 0)).await.unwrap();
    store.commit(txn).await.unwrap();
    assert_eq!(store.get_snapshot_by_id("a").await.unwrap().timestamp, at_hours(4));

    // The same delta twice in one batch conflicts, and nothing lands.
    let txn = store.begin().await.unwrap();
    let ctx = TxContext::within(txn);
    store.insert_snapshot(&ctx, snapshot("u1", "b", at_hours(5), 5, 0)).await.unwrap();
    store.insert_delta(&ctx, delta("u1", "d1", 5)).await.unwrap();
    store.insert_delta(&ctx, delta("u1", "d1", 6)).await.unwrap();
    let err = store.commit(txn).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));
    assert_eq!(store.snapshot_count("u1").await, 1);
    assert_eq!(store.count_deltas_for_user("u1").await.unwrap(), 0);

    // A delete of an unknown id fails the batch before any insert is applied.
    let txn = store.begin().await.unwrap();
    let ctx = TxContext::within(txn);
    store.insert_snapshot(&ctx, snapshot("u1", "c", at_hours(6), 6, 0)).await.unwrap();
    store.delete_snapshot(&ctx, "ghost").await.unwrap();
    assert!(store.commit(txn).await.unwrap_err().is_not_found());
    assert!(store.get_snapshot_by_id("c").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_write_with_unknown_transaction_fails() {
    let store = MemoryStore::new();
    let ctx = TxContext::within(42);
    let err = store
        .insert_snapshot(&ctx, snapshot("u1", "a", at_hours(1), 1, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Transaction(_)));
}

#[tokio::test]
async fn test_delete_snapshot() {
    let store = MemoryStore::new();
    let ctx = TxContext::none();
    store.insert_snapshot(&ctx, snapshot("u1", "a", at_hours(1), 1, 0)).await.unwrap();
    store.delete_snapshot(&ctx, "a").await.unwrap();
    assert!(store.get_snapshot_by_id("a").await.unwrap_err().is_not_found());
    assert!(store.delete_snapshot(&ctx, "a").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_delta_queries() {
    let store = MemoryStore::new();
    let ctx = TxContext::none();
    store.insert_delta(&ctx, delta("u1", "d2", 5)).await.unwrap();
    store.insert_delta(&ctx, delta("u1", "d1", 1)).await.unwrap();
    store.insert_delta(&ctx, delta("u2", "d3", 3)).await.unwrap();

    assert_eq!(store.get_latest_delta_for_user("u1").await.unwrap().id, "d2");
    assert_eq!(store.get_delta_by_id("d3").await.unwrap().user_id, "u2");
    let range = store
        .get_deltas_in_range("u1", at_hours(0), at_hours(2))
        .await
        .unwrap();
    assert_eq!(range.len(), 1);
    assert_eq!(range[0].id, "d1");
}

#[tokio::test]
async fn test_failure_injection() {
    let store = MemoryStore::new();
    let ctx = TxContext::none();

    store.set_fail_on_get(true).await;
    assert!(store.get_all_snapshots_for_user("u1").await.is_err());
    store.set_fail_on_get(false).await;
    assert!(store.get_all_snapshots_for_user("u1").await.is_ok());

    store.set_fail_on_insert_delta(true).await;
    assert!(store.insert_delta(&ctx, delta("u1", "d1", 1)).await.is_err());

    store.set_fail_on_insert_snapshot(true).await;
    assert!(store
        .insert_snapshot(&ctx, snapshot("u1", "a", at_hours(1), 1, 0))
        .await
        .is_err());

    store.set_fail_on_commit(true).await;
    let txn = store.begin().await.unwrap();
    assert!(store.commit(txn).await.is_err());
}

#[tokio::test]
async fn test_tracked_users_are_deduplicated() {
    let store = MemoryStore::new();
    store.track_user("u1").await;
    store.track_user("u2").await;
    store.track_user("u1").await;
    assert_eq!(store.get_tracked_user_ids().await.unwrap(), vec!["u1", "u2"]);
}
