use bson::oid::ObjectId;

use super::*;
use crate::database::models::{PoolEvent, SettlementStatus};
use crate::database::{NotificationStore, PoolStore};
use crate::services::validation::MAX_WAGER_AMOUNT;
use crate::services::{ConflictReason, PoolError, SettlementReport, WagerState};

#[tokio::test]
async fn test_create_pool_makes_creator_only_member() {
    let (service, store) = service();

    let pool = service.create_pool("  friday bets ", A).await.unwrap();

    assert_eq!(pool.name, "friday bets");
    assert_eq!(pool.users, vec![A]);
    assert!(pool.wagers.is_empty());

    drain_notifications().await;
    let notifications = store.notifications_for(A);
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].event, PoolEvent::PoolCreated);
}

#[tokio::test]
async fn test_create_pool_validates_input() {
    let (service, _) = service();

    let err = service.create_pool("   ", A).await.unwrap_err();
    assert_eq!(err.kind(), "VALIDATION_ERROR");

    let err = service.create_pool("pool", "not-an-email").await.unwrap_err();
    assert_eq!(err.kind(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_add_user_is_a_set_add() {
    let (service, _) = service();
    let pool_id = abc_pool(&service).await;

    let pool = service.add_user(&pool_id, B).await.unwrap();
    assert_eq!(pool.users, vec![A, B, C]);

    let err = service.add_user(&ObjectId::new(), B).await.unwrap_err();
    assert_eq!(err.kind(), "NOT_FOUND_ERROR");
}

#[tokio::test]
async fn test_wager_walkthrough() {
    let (service, store) = service();
    let pool_id = abc_pool(&service).await;

    let wager = service
        .propose_wager(&pool_id, proposal(A, 10, &[A, B]))
        .await
        .unwrap();
    assert_eq!(wager.state(), WagerState::Proposed);
    assert_eq!(wager.users, vec![A, B]);
    assert_eq!(wager.active_users, vec![A]);

    let wager = service.accept_wager(&pool_id, &wager.id, B).await.unwrap();
    assert!(wager.is_active);
    assert_eq!(wager.active_users, vec![A, B]);

    // c was not invited but may still join
    let wager = service.accept_wager(&pool_id, &wager.id, C).await.unwrap();
    assert_eq!(wager.active_users, vec![A, B, C]);

    let completed = service
        .complete_wager(&pool_id, &wager.id, A, &emails(&[B]))
        .await
        .unwrap();
    assert!(completed.wager.is_complete);
    assert_eq!(completed.wager.winners, vec![B]);
    assert_eq!(completed.wager.completed_by.as_deref(), Some(A));
    assert_eq!(
        completed.wager.settlement_status,
        Some(SettlementStatus::Applied)
    );
    match completed.settlement {
        SettlementReport::Applied { deltas } => {
            assert_eq!(deltas.iter().map(|d| d.points).sum::<i64>(), 0);
            assert_eq!(deltas.len(), 3);
        }
        other => panic!("unexpected settlement: {:?}", other),
    }

    let balances = service.get_balances(&pool_id).await.unwrap();
    assert_eq!(balances[B], 10);
    assert_eq!(balances[A], -5);
    assert_eq!(balances[C], -5);

    drain_notifications().await;
    let for_b: Vec<PoolEvent> = store.notifications_for(B).iter().map(|n| n.event).collect();
    assert_eq!(
        for_b,
        vec![
            PoolEvent::WagerProposed,
            PoolEvent::WagerAccepted,
            PoolEvent::WagerCompleted
        ]
    );
    // c was not invited, so it only hears about the completion
    let for_c: Vec<PoolEvent> = store.notifications_for(C).iter().map(|n| n.event).collect();
    assert_eq!(for_c, vec![PoolEvent::WagerCompleted]);
}

#[tokio::test]
async fn test_zero_amount_is_rejected_without_appending() {
    let (service, store) = service();
    let pool_id = abc_pool(&service).await;

    let err = service
        .propose_wager(&pool_id, proposal(A, 0, &[A, B]))
        .await
        .unwrap_err();

    assert!(matches!(err, PoolError::Validation(_)));
    let pool = store.get_by_id(&pool_id).await.unwrap().unwrap();
    assert!(pool.wagers.is_empty());
}

#[tokio::test]
async fn test_oversized_amount_is_rejected_and_balances_stay_summable() {
    let (service, store) = service();
    let pool_id = abc_pool(&service).await;

    let err = service
        .propose_wager(&pool_id, proposal(A, i64::MAX, &[B]))
        .await
        .unwrap_err();
    assert!(matches!(err, PoolError::Validation(_)));
    let pool = store.get_by_id(&pool_id).await.unwrap().unwrap();
    assert!(pool.wagers.is_empty());

    for _ in 0..2 {
        let wager = service
            .propose_wager(&pool_id, proposal(A, MAX_WAGER_AMOUNT, &[B]))
            .await
            .unwrap();
        service.accept_wager(&pool_id, &wager.id, B).await.unwrap();
        service
            .complete_wager(&pool_id, &wager.id, A, &emails(&[B]))
            .await
            .unwrap();
    }

    let balances = service.get_balances(&pool_id).await.unwrap();
    assert_eq!(balances[B], 2 * MAX_WAGER_AMOUNT);
    assert_eq!(balances[A], -2 * MAX_WAGER_AMOUNT);
}

#[tokio::test]
async fn test_propose_requires_pool_membership() {
    let (service, store) = service();
    let pool = service.create_pool("pool", A).await.unwrap();
    let pool_id = pool.id.unwrap();

    let err = service
        .propose_wager(&pool_id, proposal(A, 5, &[B, "z@x.io"]))
        .await
        .unwrap_err();
    match err {
        PoolError::Membership { users, .. } => assert_eq!(users, vec![B, "z@x.io"]),
        other => panic!("unexpected error: {other}"),
    }

    let err = service
        .propose_wager(&pool_id, proposal(B, 5, &[A]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "MEMBERSHIP_ERROR");

    let pool = store.get_by_id(&pool_id).await.unwrap().unwrap();
    assert!(pool.wagers.is_empty());
}

#[tokio::test]
async fn test_remove_missing_wager_is_not_found() {
    let (service, store) = service();
    let pool_id = abc_pool(&service).await;
    let kept = service
        .propose_wager(&pool_id, proposal(A, 5, &[B]))
        .await
        .unwrap();

    let err = service
        .remove_wager(&pool_id, &ObjectId::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PoolError::NotFound { entity: "wager", .. }));
    let pool = store.get_by_id(&pool_id).await.unwrap().unwrap();
    assert_eq!(pool.wagers.len(), 1);
    assert_eq!(pool.wagers[0].id, kept.id);
}

#[tokio::test]
async fn test_remove_open_and_settled_wagers() {
    let (service, store) = service();
    let pool_id = abc_pool(&service).await;
    let open = service
        .propose_wager(&pool_id, proposal(A, 5, &[B]))
        .await
        .unwrap();
    let settled = service
        .propose_wager(&pool_id, proposal(A, 5, &[B]))
        .await
        .unwrap();
    service
        .complete_wager(&pool_id, &settled.id, A, &emails(&[A]))
        .await
        .unwrap();

    let removed = service.remove_wager(&pool_id, &open.id).await.unwrap();
    assert_eq!(removed.id, open.id);

    let err = service
        .remove_wager(&pool_id, &settled.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PoolError::Conflict(ConflictReason::AlreadySettled { .. })
    ));

    let pool = store.get_by_id(&pool_id).await.unwrap().unwrap();
    assert_eq!(pool.wagers.len(), 1);
    assert_eq!(pool.wagers[0].id, settled.id);
}

#[tokio::test]
async fn test_complete_twice_conflicts() {
    let (service, _) = service();
    let pool_id = abc_pool(&service).await;
    let wager = service
        .propose_wager(&pool_id, proposal(A, 10, &[B]))
        .await
        .unwrap();
    service.accept_wager(&pool_id, &wager.id, B).await.unwrap();
    service
        .complete_wager(&pool_id, &wager.id, A, &emails(&[B]))
        .await
        .unwrap();

    let err = service
        .complete_wager(&pool_id, &wager.id, B, &emails(&[A]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "CONFLICT_ERROR");

    let err = service.accept_wager(&pool_id, &wager.id, C).await.unwrap_err();
    assert_eq!(err.kind(), "CONFLICT_ERROR");

    // Winners are not rewritten by the refused completion
    let pool = service.get_pool_by_id(&pool_id).await.unwrap();
    assert_eq!(pool.find_wager(&wager.id).unwrap().winners, vec![B]);
}

#[tokio::test]
async fn test_repeated_accept_changes_nothing() {
    let (service, store) = service();
    let pool_id = abc_pool(&service).await;
    let wager = service
        .propose_wager(&pool_id, proposal(A, 10, &[B]))
        .await
        .unwrap();

    let first = service.accept_wager(&pool_id, &wager.id, B).await.unwrap();
    let second = service.accept_wager(&pool_id, &wager.id, B).await.unwrap();

    assert_eq!(first.revision, second.revision);
    assert_eq!(second.active_users, vec![A, B]);

    drain_notifications().await;
    let accepted_for_a = store
        .notifications_for(A)
        .into_iter()
        .filter(|n| n.event == PoolEvent::WagerAccepted)
        .count();
    assert_eq!(accepted_for_a, 1);
}

#[tokio::test]
async fn test_closed_acceptance_requires_invitation() {
    let mut config = wager_config(3);
    config.open_acceptance = false;
    let (service, _) = service_with(&config);
    let pool_id = abc_pool(&service).await;
    let wager = service
        .propose_wager(&pool_id, proposal(A, 10, &[B]))
        .await
        .unwrap();

    let err = service.accept_wager(&pool_id, &wager.id, C).await.unwrap_err();
    assert_eq!(err.kind(), "MEMBERSHIP_ERROR");
    assert!(service.accept_wager(&pool_id, &wager.id, B).await.is_ok());
}

#[tokio::test]
async fn test_user_pools_are_paginated_newest_first() {
    let (service, _) = service();
    for name in ["one", "two", "three"] {
        service.create_pool(name, A).await.unwrap();
    }
    service.create_pool("other", B).await.unwrap();

    let page = service.get_user_pools(1, 2, A).await.unwrap();
    assert_eq!(page.total_items, 3);
    assert_eq!(page.total_pages, 2);
    let names: Vec<&str> = page.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["three", "two"]);

    let page = service.get_user_pools(2, 2, A).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "one");

    assert!(service.get_user_pools(0, 2, A).await.is_err());
}

#[tokio::test]
async fn test_delete_pool() {
    let (service, _) = service();
    let pool_id = abc_pool(&service).await;

    service.delete_pool(&pool_id).await.unwrap();

    assert_eq!(
        service.get_pool_by_id(&pool_id).await.unwrap_err().kind(),
        "NOT_FOUND_ERROR"
    );
    assert_eq!(
        service.delete_pool(&pool_id).await.unwrap_err().kind(),
        "NOT_FOUND_ERROR"
    );
}

#[tokio::test]
async fn test_notifications_can_be_read_and_dismissed() {
    let (service, store) = service();
    let pool_id = abc_pool(&service).await;
    service
        .propose_wager(&pool_id, proposal(A, 10, &[B, C]))
        .await
        .unwrap();
    service
        .propose_wager(&pool_id, proposal(A, 20, &[B]))
        .await
        .unwrap();
    drain_notifications().await;

    let page = store.find_for_user(1, 10, B).await.unwrap();
    assert_eq!(page.total_items, 2);
    assert!(page.items[0].message.contains("20 point"));

    let first = page.items[0].id.unwrap();
    assert!(store.dismiss(&first).await.unwrap());
    assert_eq!(store.find_for_user(1, 10, B).await.unwrap().total_items, 1);

    assert_eq!(store.mark_all_read(B).await.unwrap(), 1);
    assert!(store
        .find_for_user(1, 10, B)
        .await
        .unwrap()
        .items
        .iter()
        .all(|n| n.is_read));
}
