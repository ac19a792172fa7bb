use crate::core::errors::MessmateError;
use crate::core::models::group::PeriodMode;
use crate::core::models::period::{PeriodPatch, PeriodStatus, StartPeriod};
use crate::core::models::transaction::{CreateTransaction, TransactionType};
use crate::infrastructure::storage::Storage;
use crate::tests::{seed_group, start_input, test_service, user};
use chrono::{Datelike, TimeZone, Utc};

fn date(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

#[tokio::test]
async fn test_start_period() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;

    let period = service
        .start_period(&group.id, &alice, start_input("January"))
        .await
        .unwrap();

    assert_eq!(period.name, "January");
    assert_eq!(period.status, PeriodStatus::Active);
    assert_eq!(period.opening_balance, 0.0);
    assert!(period.end_date.is_none());

    let audits = service.get_group_audits(&group.id).await.unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].action, "PERIOD_STARTED");
    assert_eq!(audits[0].user_id.as_deref(), Some(alice.id.as_str()));
    assert!(!service.get_app_logs().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_start_period_rejects_second_active() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;

    service
        .start_period(&group.id, &alice, start_input("January"))
        .await
        .unwrap();
    let result = service
        .start_period(&group.id, &alice, start_input("February"))
        .await;
    assert!(matches!(
        result,
        Err(MessmateError::ActivePeriodExists(name)) if name == "January"
    ));
}

#[tokio::test]
async fn test_start_period_invalid_date_range() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;

    let input = StartPeriod {
        name: "Backwards".to_string(),
        start_date: date(2024, 2, 1),
        end_date: Some(date(2024, 1, 1)),
        opening_balance: None,
        carry_forward: false,
        notes: None,
    };
    let result = service.start_period(&group.id, &alice, input).await;
    assert!(matches!(result, Err(MessmateError::InvalidDateRange)));
}

#[tokio::test]
async fn test_start_period_rejects_overlap() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;

    let first = StartPeriod {
        name: "January".to_string(),
        start_date: date(2024, 1, 1),
        end_date: Some(date(2024, 1, 31)),
        opening_balance: None,
        carry_forward: false,
        notes: None,
    };
    let created = service.start_period(&group.id, &alice, first).await.unwrap();
    service
        .end_period(&group.id, &alice, Some(date(2024, 1, 31)), Some(&created.id))
        .await
        .unwrap();

    let overlapping = StartPeriod {
        name: "Mid January".to_string(),
        start_date: date(2024, 1, 15),
        end_date: Some(date(2024, 2, 15)),
        opening_balance: None,
        carry_forward: false,
        notes: None,
    };
    let result = service.start_period(&group.id, &alice, overlapping).await;
    assert!(matches!(
        result,
        Err(MessmateError::PeriodOverlap { name, .. }) if name == "January"
    ));
}

#[tokio::test]
async fn test_period_name_collision_gets_suffixed() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;

    let p1 = service
        .start_period(&group.id, &alice, start_input("January"))
        .await
        .unwrap();
    service
        .end_period(&group.id, &alice, None, Some(&p1.id))
        .await
        .unwrap();

    let p2 = service
        .start_period(&group.id, &alice, start_input("January"))
        .await
        .unwrap();
    assert_eq!(p2.name, "January (2)");
    service
        .end_period(&group.id, &alice, None, Some(&p2.id))
        .await
        .unwrap();

    let p3 = service
        .start_period(&group.id, &alice, start_input("January"))
        .await
        .unwrap();
    assert_eq!(p3.name, "January (3)");
}

#[tokio::test]
async fn test_end_period_stamps_closing_balance() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;

    let period = service
        .start_period(&group.id, &alice, start_input("January"))
        .await
        .unwrap();
    service
        .create_transaction(
            &group.id,
            &alice,
            CreateTransaction {
                to_user_id: alice.id.clone(),
                amount: 300.0,
                kind: TransactionType::Deposit,
                description: None,
                period_id: None,
            },
        )
        .await
        .unwrap();
    storage.add_expense(&group.id, &period.id, &alice.id, 120.0).await;

    let ended = service
        .end_period(&group.id, &alice, None, None)
        .await
        .unwrap();
    assert_eq!(ended.status, PeriodStatus::Ended);
    assert!(ended.end_date.is_some());
    assert_eq!(ended.closing_balance, Some(180.0));
}

#[tokio::test]
async fn test_end_period_errors() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;

    let result = service.end_period(&group.id, &alice, None, None).await;
    assert!(matches!(result, Err(MessmateError::PeriodNotFound(_))));

    let period = service
        .start_period(&group.id, &alice, start_input("January"))
        .await
        .unwrap();
    service
        .end_period(&group.id, &alice, None, Some(&period.id))
        .await
        .unwrap();

    let result = service
        .end_period(&group.id, &alice, None, Some(&period.id))
        .await;
    assert!(matches!(result, Err(MessmateError::PeriodNotActive(_))));
}

#[tokio::test]
async fn test_explicit_end_takes_manual_control() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Monthly, &[alice.clone()]).await;

    service.ensure_month_period(&group.id).await.unwrap().unwrap();
    service.end_period(&group.id, &alice, None, None).await.unwrap();

    let group = service.get_group(&group.id).await.unwrap().unwrap();
    assert_eq!(group.period_mode, PeriodMode::Custom);
}

#[tokio::test]
async fn test_lock_and_unlock_cycle() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;

    let period = service
        .start_period(&group.id, &alice, start_input("January"))
        .await
        .unwrap();
    service
        .end_period(&group.id, &alice, None, Some(&period.id))
        .await
        .unwrap();

    let locked = service
        .lock_period(&group.id, &alice, &period.id)
        .await
        .unwrap();
    assert!(locked.is_locked);
    assert_eq!(locked.status, PeriodStatus::Locked);

    let result = service.lock_period(&group.id, &alice, &period.id).await;
    assert!(matches!(result, Err(MessmateError::PeriodAlreadyLocked(_))));

    let unlocked = service
        .unlock_period(&group.id, &alice, &period.id, PeriodStatus::Ended)
        .await
        .unwrap();
    assert!(!unlocked.is_locked);
    assert_eq!(unlocked.status, PeriodStatus::Ended);

    let result = service
        .unlock_period(&group.id, &alice, &period.id, PeriodStatus::Ended)
        .await;
    assert!(matches!(result, Err(MessmateError::PeriodNotLocked(_))));
}

#[tokio::test]
async fn test_unlock_cannot_target_active() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;

    let period = service
        .start_period(&group.id, &alice, start_input("January"))
        .await
        .unwrap();
    service
        .lock_period(&group.id, &alice, &period.id)
        .await
        .unwrap();

    let result = service
        .unlock_period(&group.id, &alice, &period.id, PeriodStatus::Active)
        .await;
    assert!(matches!(result, Err(MessmateError::InvalidInput(_, _))));
}

#[tokio::test]
async fn test_archive_active_period_stamps_end() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Monthly, &[alice.clone()]).await;

    let period = service.ensure_month_period(&group.id).await.unwrap().unwrap();
    let archived = service
        .archive_period(&group.id, &alice, &period.id)
        .await
        .unwrap();

    assert_eq!(archived.status, PeriodStatus::Archived);
    assert!(archived.end_date.is_some());
    assert!(archived.closing_balance.is_some());

    let group = service.get_group(&group.id).await.unwrap().unwrap();
    assert_eq!(group.period_mode, PeriodMode::Custom);
}

#[tokio::test]
async fn test_update_period_revalidates_name_and_dates() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;

    let p1 = StartPeriod {
        name: "January".to_string(),
        start_date: date(2024, 1, 1),
        end_date: Some(date(2024, 1, 31)),
        opening_balance: None,
        carry_forward: false,
        notes: None,
    };
    let p1 = service.start_period(&group.id, &alice, p1).await.unwrap();
    service
        .end_period(&group.id, &alice, Some(date(2024, 1, 31)), Some(&p1.id))
        .await
        .unwrap();

    let p2 = StartPeriod {
        name: "February".to_string(),
        start_date: date(2024, 2, 1),
        end_date: Some(date(2024, 2, 28)),
        opening_balance: None,
        carry_forward: false,
        notes: None,
    };
    let p2 = service.start_period(&group.id, &alice, p2).await.unwrap();

    // Renaming to a taken name is suffixed, not rejected.
    let renamed = service
        .update_period(
            &group.id,
            &alice,
            &p2.id,
            PeriodPatch {
                name: Some("January".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "January (2)");

    // Sliding p2 into p1's range is rejected.
    let result = service
        .update_period(
            &group.id,
            &alice,
            &p2.id,
            PeriodPatch {
                start_date: Some(date(2024, 1, 10)),
                end_date: Some(date(2024, 2, 10)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(MessmateError::PeriodOverlap { .. })));
}

#[tokio::test]
async fn test_delete_period_is_soft_and_frees_active_slot() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;

    let period = service
        .start_period(&group.id, &alice, start_input("January"))
        .await
        .unwrap();
    service
        .delete_period(&group.id, &alice, &period.id)
        .await
        .unwrap();

    let listed = service.list_periods(&group.id, &alice).await.unwrap();
    assert!(listed.is_empty());

    // The row survives soft deletion for referential integrity.
    let raw = storage.get_period(&period.id).await.unwrap().unwrap();
    assert!(raw.deleted_at.is_some());

    // And the ACTIVE slot is free again.
    service
        .start_period(&group.id, &alice, start_input("January"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_restart_seeds_opening_from_carry_forward() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;

    let mut input = start_input("January");
    input.carry_forward = true;
    let period = service.start_period(&group.id, &alice, input).await.unwrap();
    service
        .create_transaction(
            &group.id,
            &alice,
            CreateTransaction {
                to_user_id: alice.id.clone(),
                amount: 250.0,
                kind: TransactionType::Deposit,
                description: None,
                period_id: None,
            },
        )
        .await
        .unwrap();
    let ended = service
        .end_period(&group.id, &alice, None, Some(&period.id))
        .await
        .unwrap();
    assert_eq!(ended.closing_balance, Some(250.0));

    let restarted = service
        .restart_period(&group.id, &alice, &ended.id, None, false)
        .await
        .unwrap();
    assert_eq!(restarted.status, PeriodStatus::Active);
    assert_eq!(restarted.opening_balance, 250.0);
    assert_eq!(restarted.name, "January (2)");
}

#[tokio::test]
async fn test_restart_without_carry_forward_opens_at_zero() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;

    let period = service
        .start_period(&group.id, &alice, start_input("January"))
        .await
        .unwrap();
    service
        .create_transaction(
            &group.id,
            &alice,
            CreateTransaction {
                to_user_id: alice.id.clone(),
                amount: 250.0,
                kind: TransactionType::Deposit,
                description: None,
                period_id: None,
            },
        )
        .await
        .unwrap();
    let ended = service
        .end_period(&group.id, &alice, None, Some(&period.id))
        .await
        .unwrap();

    let restarted = service
        .restart_period(&group.id, &alice, &ended.id, Some("Fresh".to_string()), false)
        .await
        .unwrap();
    assert_eq!(restarted.opening_balance, 0.0);
    assert_eq!(restarted.name, "Fresh");
}

#[tokio::test]
async fn test_restart_with_data_moves_records() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;

    let period = service
        .start_period(&group.id, &alice, start_input("January"))
        .await
        .unwrap();
    storage.add_meal(&group.id, &period.id, &alice.id, 7).await;
    storage.add_expense(&group.id, &period.id, &alice.id, 90.0).await;
    service
        .end_period(&group.id, &alice, None, Some(&period.id))
        .await
        .unwrap();

    let restarted = service
        .restart_period(&group.id, &alice, &period.id, None, true)
        .await
        .unwrap();

    // The move is not a copy: the old period is left empty.
    assert_eq!(storage.count_meals(&group.id, &restarted.id).await.unwrap(), 7);
    assert_eq!(storage.count_meals(&group.id, &period.id).await.unwrap(), 0);
    assert_eq!(
        storage.sum_expenses(&group.id, &restarted.id).await.unwrap(),
        90.0
    );
    assert_eq!(storage.sum_expenses(&group.id, &period.id).await.unwrap(), 0.0);
}

#[tokio::test]
async fn test_concurrent_starts_admit_exactly_one() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;

    let attempts: Vec<_> = (0..8)
        .map(|i| service.start_period(&group.id, &alice, start_input(&format!("Race {}", i))))
        .collect();
    let results = futures::future::join_all(attempts).await;

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(matches!(
            result,
            Err(MessmateError::ActivePeriodExists(_))
        ));
    }

    let active = storage.find_active_period(&group.id).await.unwrap();
    assert!(active.is_some());
}

#[tokio::test]
async fn test_ensure_month_period_rolls_over_stale_month() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Monthly, &[alice.clone()]).await;

    let now = Utc::now();
    let (prev_year, prev_month) = if now.month() == 1 {
        (now.year() - 1, 12)
    } else {
        (now.year(), now.month() - 1)
    };
    let stale_start = date(prev_year, prev_month, 1);

    let stale = crate::core::models::period::Period {
        id: "stale".to_string(),
        group_id: group.id.clone(),
        name: "Old Month".to_string(),
        start_date: stale_start,
        end_date: None,
        status: PeriodStatus::Active,
        is_locked: false,
        opening_balance: 0.0,
        closing_balance: None,
        carry_forward: true,
        notes: None,
        created_at: stale_start,
        updated_at: stale_start,
        deleted_at: None,
    };
    storage.insert_period(stale).await.unwrap();
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

    let created = service.ensure_month_period(&group.id).await.unwrap().unwrap();
    assert_eq!(created.name, now.format("%B %Y").to_string());
    assert_eq!(created.status, PeriodStatus::Active);
    // Carried forward from the auto-closed month.
    assert_eq!(created.opening_balance, 100.0);

    let old = storage.get_period("stale").await.unwrap().unwrap();
    assert_eq!(old.status, PeriodStatus::Ended);
    let end = old.end_date.unwrap();
    assert_eq!(end.year(), prev_year);
    assert_eq!(end.month(), prev_month);
    assert_eq!(old.closing_balance, Some(100.0));

    // The rollover itself never hands control to the caller.
    let group = service.get_group(&group.id).await.unwrap().unwrap();
    assert_eq!(group.period_mode, PeriodMode::Monthly);

    // Idempotent on re-run.
    assert!(service.ensure_month_period(&group.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_ensure_month_period_noop_for_custom_groups() {
    let (service, storage) = test_service();
    let alice = user("Alice");
    let group = seed_group(&storage, PeriodMode::Custom, &[alice.clone()]).await;

    assert!(service.ensure_month_period(&group.id).await.unwrap().is_none());
    assert!(storage.find_active_period(&group.id).await.unwrap().is_none());
}
