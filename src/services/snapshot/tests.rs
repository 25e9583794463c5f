use super::*;
use crate::config::{CacheRepresentation, Config};
use crate::interfaces::StorageError;
use crate::storage::MemoryStore;
use crate::test_utils::{at_hours, base_time, snapshot, SnapshotBuilder, TestHarness};

async fn seed(store: &MemoryStore, snapshots: Vec<HiscoreSnapshot>) {
    for s in snapshots {
        store.insert_snapshot(&TxContext::none(), s).await.unwrap();
    }
}

fn ten_day_history(user_id: &str) -> Vec<HiscoreSnapshot> {
    (0..50)
        .map(|i| {
            let hour = i * 24 * 10 / 50;
            let change = match i % 5 {
                0 => 0,
                4 => -3,
                _ => 20 + i,
            };
            snapshot(user_id, &format!("s{i}"), at_hours(hour), 10_000 + i * 37 % 400, change)
        })
        .collect()
}

// --- nearest timestamp ---

#[test]
fn test_pick_nearest_tie_goes_to_lower() {
    let lower = snapshot("u1", "low", at_hours(100), 1, 0);
    let upper = snapshot("u1", "high", at_hours(200), 2, 0);
    let pick = |h| pick_nearest(at_hours(h), Some(lower.clone()), Some(upper.clone())).unwrap().id;
    assert_eq!(pick(130), "low");
    assert_eq!(pick(170), "high");
    for _ in 0..10 {
        assert_eq!(pick(150), "low");
    }
    assert!(pick_nearest(at_hours(1), None, None).is_none());
}

#[tokio::test]
async fn test_nearest_against_store() {
    let h = TestHarness::new();
    seed(
        &h.store,
        vec![
            snapshot("u1", "a", at_hours(100), 1, 0),
            snapshot("u1", "b", at_hours(200), 2, 0),
        ],
    )
    .await;

    let near = |t| h.snapshots.get_snapshot_nearest_timestamp("u1", at_hours(t));
    assert_eq!(near(130).await.unwrap().id, "a");
    assert_eq!(near(170).await.unwrap().id, "b");
    assert_eq!(near(150).await.unwrap().id, "a");
    // Only one side exists.
    assert_eq!(near(10).await.unwrap().id, "a");
    assert_eq!(near(500).await.unwrap().id, "b");

    let missing = h
        .snapshots
        .get_snapshot_nearest_timestamp("ghost", at_hours(1))
        .await;
    assert!(matches!(missing, Err(HiscoreError::SnapshotNotFound)));
}

#[tokio::test]
async fn test_nearest_propagates_real_errors() {
    let h = TestHarness::new();
    h.store.set_fail_on_get(true).await;
    let err = h.snapshots.find_nearest("u1", at_hours(1)).await.unwrap_err();
    assert!(matches!(err, HiscoreError::Storage(StorageError::Database(_))));
}

// --- creation ---

#[tokio::test]
async fn test_create_snapshot_computes_overall_change() {
    let h = TestHarness::new();
    let first = h
        .snapshots
        .create_snapshot(SnapshotBuilder::new("u1", "", at_hours(1)).overall(1000).build())
        .await
        .unwrap();
    assert_eq!(first.overall_experience_change, 0);
    assert!(!first.id.is_empty());

    let second = h
        .snapshots
        .create_snapshot(SnapshotBuilder::new("u1", "", at_hours(2)).overall(1250).build())
        .await
        .unwrap();
    assert_eq!(second.overall_experience_change, 250);
    assert_ne!(first.id, second.id);

    let latest = h.snapshots.get_latest_snapshot_for_user("u1").await.unwrap();
    assert_eq!(latest.id, second.id);
    assert_eq!(h.snapshots.get_snapshot_by_id(&first.id).await.unwrap().id, first.id);
}

#[tokio::test]
async fn test_create_snapshot_rejects_incomplete() {
    let h = TestHarness::new();
    let mut s = SnapshotBuilder::new("u1", "", at_hours(1)).build();
    s.activities.clear();
    let err = h.snapshots.create_snapshot(s).await.unwrap_err();
    assert!(matches!(err, HiscoreError::Validation(_)));
    assert_eq!(h.store.snapshot_count("u1").await, 0);
}

#[tokio::test]
async fn test_absent_overall_gives_zero_change() {
    let h = TestHarness::new();
    h.snapshots
        .create_snapshot(SnapshotBuilder::new("u1", "", at_hours(1)).overall(1000).build())
        .await
        .unwrap();
    let second = h
        .snapshots
        .create_snapshot(
            SnapshotBuilder::new("u1", "", at_hours(2))
                .absent_skill(ActivityType::Overall)
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(second.overall_experience_change, 0);
}

#[tokio::test]
async fn test_lookup_errors() {
    let h = TestHarness::new();
    assert!(matches!(
        h.snapshots.get_snapshot_by_id("nope").await,
        Err(HiscoreError::SnapshotNotFound)
    ));
    assert!(matches!(
        h.snapshots.get_latest_snapshot_for_user("nope").await,
        Err(HiscoreError::SnapshotNotFound)
    ));
    h.store.set_fail_on_get(true).await;
    assert!(matches!(
        h.snapshots.get_snapshot_by_id("nope").await,
        Err(HiscoreError::Storage(_))
    ));
}

// --- interval queries ---

#[tokio::test]
async fn test_interval_rejects_bad_ranges() {
    let h = TestHarness::new();
    let err = h
        .snapshots
        .get_snapshot_interval("u1", at_hours(1), at_hours(1), AggregationWindow::Daily)
        .await
        .unwrap_err();
    assert!(matches!(err, HiscoreError::InvalidInterval(_)));

    let err = h
        .snapshots
        .get_snapshot_interval(
            "u1",
            base_time(),
            base_time() + Duration::days(400),
            AggregationWindow::Daily,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HiscoreError::InvalidAggregationWindow(_)));

    assert!(h
        .snapshots
        .get_snapshot_interval(
            "u1",
            base_time(),
            base_time() + Duration::days(400),
            AggregationWindow::Monthly,
        )
        .await
        .is_ok());
}

async fn warm_and_cold_agree(representation: CacheRepresentation) {
    let config = Config {
        cache: crate::config::CacheConfig {
            representation,
            ..Default::default()
        },
        ..Default::default()
    };
    let warm = TestHarness::with_config(config.clone());
    let cold = TestHarness::with_config(config);
    seed(&warm.store, ten_day_history("u1")).await;
    seed(&cold.store, ten_day_history("u1")).await;

    let cancel = CancellationToken::new();
    warm.snapshots
        .prime_user("u1", Duration::days(3), &cancel)
        .await
        .unwrap();
    assert!(warm.snapshots.cache().is_cached("u1"));
    assert!(!cold.snapshots.cache().is_cached("u1"));

    let (start, end) = (base_time(), base_time() + Duration::days(10));
    for window in AggregationWindow::ALL {
        let from_warm = warm
            .snapshots
            .get_snapshot_interval("u1", start, end, window)
            .await
            .unwrap();
        let from_cold = cold
            .snapshots
            .get_snapshot_interval("u1", start, end, window)
            .await
            .unwrap();
        let from_store = cold
            .snapshots
            .aggregate_from_store("u1", start, end, window)
            .await
            .unwrap();
        assert_eq!(from_warm, from_cold, "{window:?}");
        assert_eq!(from_warm, from_store, "{window:?}");
        assert_eq!(from_warm.total_count, 50);
        assert_eq!(from_warm.gains_count, 30);
    }
    assert!(cold.snapshots.cache().is_cached("u1"));
}

#[tokio::test]
async fn test_warm_and_cold_cache_agree_for_aggregate_representation() {
    warm_and_cold_agree(CacheRepresentation::Aggregate).await;
}

#[tokio::test]
async fn test_warm_and_cold_cache_agree_for_range_representation() {
    warm_and_cold_agree(CacheRepresentation::Range).await;
}

#[tokio::test]
async fn test_interval_sees_snapshots_created_after_priming() {
    let h = TestHarness::new();
    seed(&h.store, vec![snapshot("u1", "a", at_hours(1), 100, 0)]).await;
    h.snapshots
        .prime_user("u1", Duration::days(30), &CancellationToken::new())
        .await
        .unwrap();

    h.snapshots
        .create_snapshot(SnapshotBuilder::new("u1", "", at_hours(5)).overall(300).build())
        .await
        .unwrap();

    let result = h
        .snapshots
        .get_snapshot_interval("u1", base_time(), at_hours(24), AggregationWindow::Daily)
        .await
        .unwrap();
    assert_eq!(result.total_count, 2);
    assert_eq!(result.gains_count, 1);
    assert_eq!(result.snapshots.len(), 1);
    assert_eq!(result.snapshots[0].overall_experience(), 300);
}

#[tokio::test]
async fn test_interval_extends_past_cached_end() {
    let h = TestHarness::new();
    seed(&h.store, vec![snapshot("u1", "a", at_hours(1), 100, 10)]).await;
    h.snapshots
        .get_snapshot_interval("u1", base_time(), at_hours(10), AggregationWindow::Daily)
        .await
        .unwrap();

    // Written behind the cache's back, after the cached window.
    seed(&h.store, vec![snapshot("u1", "b", at_hours(30), 200, 100)]).await;

    let result = h
        .snapshots
        .get_snapshot_interval("u1", base_time(), at_hours(48), AggregationWindow::Daily)
        .await
        .unwrap();
    assert_eq!(result.total_count, 2);
    assert_eq!(result.snapshots.len(), 2);
}

async fn live_write_after_partial_rebuild(representation: CacheRepresentation) {
    let h = TestHarness::with_config(Config {
        cache: crate::config::CacheConfig {
            representation,
            ..Default::default()
        },
        ..Default::default()
    });
    let day = |n: i64| base_time() + Duration::days(n);
    let history = (0..31)
        .map(|n| snapshot("u1", &format!("d{n}"), day(n), 1_000 + n * 10, 10))
        .collect();
    seed(&h.store, history).await;

    // Cold query over the first days only; the cached window ends in the past.
    h.snapshots
        .get_snapshot_interval("u1", day(0), day(5), AggregationWindow::Daily)
        .await
        .unwrap();
    h.orchestrator
        .create_snapshot_with_delta(SnapshotBuilder::new("u1", "", day(40)).overall(5_000).build())
        .await
        .unwrap();

    for window in AggregationWindow::ALL {
        let cached = h
            .snapshots
            .get_snapshot_interval("u1", day(0), day(41), window)
            .await
            .unwrap();
        let stored = h
            .snapshots
            .aggregate_from_store("u1", day(0), day(41), window)
            .await
            .unwrap();
        assert_eq!(cached, stored, "{representation:?} {window:?}");
        assert_eq!(cached.total_count, 32);
    }
}

#[tokio::test]
async fn test_live_write_after_partial_rebuild_keeps_gap_for_aggregate_representation() {
    live_write_after_partial_rebuild(CacheRepresentation::Aggregate).await;
}

#[tokio::test]
async fn test_live_write_after_partial_rebuild_keeps_gap_for_range_representation() {
    live_write_after_partial_rebuild(CacheRepresentation::Range).await;
}

// --- priming ---

#[tokio::test]
async fn test_prime_user_without_history() {
    let h = TestHarness::new();
    let count = h
        .snapshots
        .prime_user("ghost", Duration::days(30), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(count, 0);
    assert!(!h.snapshots.cache().is_cached("ghost"));
}

#[tokio::test]
async fn test_prime_user_deduplicates_batch_boundaries() {
    let h = TestHarness::new();
    // Snapshots exactly on the 1-day batch boundaries.
    seed(
        &h.store,
        (0..5)
            .map(|d| snapshot("u1", &format!("s{d}"), at_hours(d * 24), 100 + d, 1))
            .collect(),
    )
    .await;
    let count = h
        .snapshots
        .prime_user("u1", Duration::days(1), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(count, 5);
    assert_eq!(h.snapshots.cache().user_stats("u1").unwrap().total_snapshots, 5);
}

#[tokio::test]
async fn test_prime_user_honors_cancellation() {
    let h = TestHarness::new();
    seed(&h.store, ten_day_history("u1")).await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = h
        .snapshots
        .prime_user("u1", Duration::days(1), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, HiscoreError::Cancelled));
    assert!(!h.snapshots.cache().is_cached("u1"));
}
