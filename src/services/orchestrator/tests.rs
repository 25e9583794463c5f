use super::*;
use crate::config::{Config, StorageConfig};
use crate::domain::{ActivityType, AggregationWindow};
use crate::interfaces::{DeltaStore, SnapshotStore};
use crate::test_utils::{at_hours, base_time, SnapshotBuilder, TestHarness};
use tokio_util::sync::CancellationToken;

fn live(hours: i64, overall: i64) -> HiscoreSnapshot {
    SnapshotBuilder::new("u1", "", at_hours(hours))
        .overall(overall)
        .build()
}

async fn prime(h: &TestHarness) {
    h.deltas.prime_user("u1").await.unwrap();
    h.snapshots
        .prime_user("u1", chrono::Duration::days(30), &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_first_snapshot_has_no_delta() {
    let h = TestHarness::new();
    let result = h
        .orchestrator
        .create_snapshot_with_delta(live(1, 1000))
        .await
        .unwrap();
    assert!(result.delta.is_none());
    assert_eq!(result.snapshot.overall_experience_change, 0);
    assert_eq!(h.store.snapshot_count("u1").await, 1);
}

#[tokio::test]
async fn test_second_snapshot_records_delta_and_updates_caches() {
    let h = TestHarness::new();
    h.orchestrator
        .create_snapshot_with_delta(live(1, 1000))
        .await
        .unwrap();
    prime(&h).await;

    let second = SnapshotBuilder::new("u1", "", at_hours(2))
        .overall(1400)
        .skill(ActivityType::Attack, 5, 400)
        .boss(ActivityType::Zulrah, 2)
        .build();
    let result = h.orchestrator.create_snapshot_with_delta(second).await.unwrap();

    let delta = result.delta.unwrap();
    assert_eq!(delta.snapshot_id, result.snapshot.id);
    // Overall and Attack both count.
    assert_eq!(delta.total_experience_gain, 800);
    assert_eq!(result.snapshot.overall_experience_change, 400);
    assert_eq!(h.store.count_deltas_for_user("u1").await.unwrap(), 1);

    // Both caches saw the commit.
    assert_eq!(h.deltas.cache().get_latest_delta("u1").unwrap().id, delta.id);
    let interval = h
        .snapshots
        .cache()
        .get_aggregated("u1", base_time(), at_hours(10), AggregationWindow::Daily)
        .unwrap();
    assert_eq!(interval.total_count, 2);
}

#[tokio::test]
async fn test_unchanged_snapshot_has_no_delta() {
    let h = TestHarness::new();
    h.orchestrator
        .create_snapshot_with_delta(live(1, 1000))
        .await
        .unwrap();
    let result = h
        .orchestrator
        .create_snapshot_with_delta(live(2, 1000))
        .await
        .unwrap();
    assert!(result.delta.is_none());
    assert_eq!(h.store.snapshot_count("u1").await, 2);
    assert_eq!(h.store.count_deltas_for_user("u1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_delta_write_rolls_back_snapshot() {
    let h = TestHarness::new();
    h.orchestrator
        .create_snapshot_with_delta(live(1, 1000))
        .await
        .unwrap();
    prime(&h).await;

    h.store.set_fail_on_insert_delta(true).await;
    let err = h
        .orchestrator
        .create_snapshot_with_delta(live(2, 2000))
        .await
        .unwrap_err();
    assert!(matches!(err, HiscoreError::Storage(_)));

    assert_eq!(h.store.snapshot_count("u1").await, 1);
    assert_eq!(h.store.open_transactions().await, 0);
    assert!(h.deltas.cache().get_latest_delta("u1").is_none());
    let interval = h
        .snapshots
        .cache()
        .get_aggregated("u1", base_time(), at_hours(10), AggregationWindow::Daily)
        .unwrap();
    assert_eq!(interval.total_count, 1);
}

#[tokio::test]
async fn test_without_transactions_snapshot_survives_delta_failure() {
    let h = TestHarness::with_config(Config {
        storage: StorageConfig {
            transactions_enabled: false,
        },
        ..Default::default()
    });
    h.orchestrator
        .create_snapshot_with_delta(live(1, 1000))
        .await
        .unwrap();
    h.store.set_fail_on_insert_delta(true).await;
    assert!(h
        .orchestrator
        .create_snapshot_with_delta(live(2, 2000))
        .await
        .is_err());
    assert_eq!(h.store.snapshot_count("u1").await, 2);
}

#[tokio::test]
async fn test_invalid_snapshot_is_rejected_before_write() {
    let h = TestHarness::new();
    let mut bad = live(1, 1000);
    bad.user_id = "  ".to_string();
    let err = h
        .orchestrator
        .create_snapshot_with_delta(bad)
        .await
        .unwrap_err();
    assert!(matches!(err, HiscoreError::Validation(_)));
    assert_eq!(h.store.open_transactions().await, 0);
}

#[tokio::test]
async fn test_delta_summary_without_baseline() {
    let h = TestHarness::new();
    let err = h
        .orchestrator
        .get_delta_summary("u1", base_time(), at_hours(24))
        .await
        .unwrap_err();
    assert!(matches!(err, HiscoreError::NoBaseline { ref user_id } if user_id == "u1"));
}

#[tokio::test]
async fn test_delta_summary_with_baseline_and_no_deltas() {
    let h = TestHarness::new();
    h.store
        .insert_snapshot(&TxContext::none(), crate::test_utils::snapshot("u1", "a", at_hours(3), 10, 0))
        .await
        .unwrap();
    let summary = h
        .orchestrator
        .get_delta_summary("u1", base_time(), at_hours(24))
        .await
        .unwrap();
    assert_eq!(summary.snapshot.id, "a");
    assert!(summary.deltas.is_empty());
}

#[tokio::test]
async fn test_delta_summary_end_to_end() {
    let h = TestHarness::new();
    for (hour, xp) in [(1, 1000), (5, 1100), (30, 1500), (31, 1500)] {
        h.orchestrator
            .create_snapshot_with_delta(live(hour, xp))
            .await
            .unwrap();
    }
    let summary = h
        .orchestrator
        .get_delta_summary("u1", at_hours(2), at_hours(47))
        .await
        .unwrap();
    // Nearest to hour 2 is the hour-1 snapshot.
    assert_eq!(summary.snapshot.timestamp, at_hours(1));
    assert_eq!(summary.deltas.len(), 2);
    assert_eq!(summary.deltas[0].total_experience_gain, 100);
    assert_eq!(summary.deltas[1].total_experience_gain, 400);
}

#[tokio::test]
async fn test_delta_summary_rejects_equal_bounds() {
    let h = TestHarness::new();
    let err = h
        .orchestrator
        .get_delta_summary("u1", at_hours(1), at_hours(1))
        .await
        .unwrap_err();
    assert!(matches!(err, HiscoreError::InvalidInterval(_)));
}
