use crate::core::models::group::PeriodMode;
use crate::core::models::transaction::{CreateTransaction, TransactionType};
use crate::infrastructure::cache::Cache;
use crate::infrastructure::cache::in_memory::InMemoryCache;
use crate::tests::{seed_group, start_input, test_service, user};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_put_get_roundtrip() {
    let cache = InMemoryCache::new();
    cache
        .put(
            "k",
            json!({"n": 1}),
            &["group:g1".to_string()],
            Duration::from_secs(60),
        )
        .await
        .unwrap();
    assert_eq!(cache.get("k").await.unwrap(), Some(json!({"n": 1})));
    assert_eq!(cache.get("missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_expired_entries_are_misses() {
    let cache = InMemoryCache::new();
    cache
        .put("k", json!(1), &[], Duration::from_secs(0))
        .await
        .unwrap();
    assert_eq!(cache.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn test_tag_invalidation_is_selective() {
    let cache = InMemoryCache::new();
    cache
        .put(
            "summary",
            json!(1),
            &["group:g1".to_string(), "period:p1".to_string()],
            Duration::from_secs(60),
        )
        .await
        .unwrap();
    cache
        .put(
            "other",
            json!(2),
            &["group:g2".to_string()],
            Duration::from_secs(60),
        )
        .await
        .unwrap();

    cache
        .invalidate_tags(&["period:p1".to_string()])
        .await
        .unwrap();

    // Sharing one affected tag is enough to drop an entry.
    assert_eq!(cache.get("summary").await.unwrap(), None);
    assert_eq!(cache.get("other").await.unwrap(), Some(json!(2)));
}

#[tokio::test]
async fn test_summary_is_memoized_until_a_mutation() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;
    let period = service
        .start_period(&group.id, &alice, start_input("January"))
        .await
        .unwrap();
    storage.add_meal(&group.id, &period.id, &alice.id, 3).await;

    let first = service
        .get_group_balance_summary(&group.id, &alice, true)
        .await
        .unwrap();
    assert_eq!(first.total_meals, 3);

    // A write that bypasses the service leaves the cached figure in place.
    storage.add_meal(&group.id, &period.id, &alice.id, 2).await;
    let second = service
        .get_group_balance_summary(&group.id, &alice, true)
        .await
        .unwrap();
    assert_eq!(second.total_meals, 3);

    // Any service mutation invalidates by tag; the next read is fresh.
    service
        .create_transaction(
            &group.id,
            &alice,
            CreateTransaction {
                to_user_id: alice.id.clone(),
                amount: 100.0,
                kind: TransactionType::Deposit,
                description: None,
                period_id: None,
            },
        )
        .await
        .unwrap();
    let third = service
        .get_group_balance_summary(&group.id, &alice, true)
        .await
        .unwrap();
    assert_eq!(third.total_meals, 5);
    assert_eq!(third.total_balance, 100.0);
}

#[tokio::test]
async fn test_period_mutations_invalidate_period_list() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;

    let period = service
        .start_period(&group.id, &alice, start_input("January"))
        .await
        .unwrap();
    let listed = service.list_periods(&group.id, &alice).await.unwrap();
    assert_eq!(listed.len(), 1);

    service
        .delete_period(&group.id, &alice, &period.id)
        .await
        .unwrap();
    let listed = service.list_periods(&group.id, &alice).await.unwrap();
    assert!(listed.is_empty());
}
