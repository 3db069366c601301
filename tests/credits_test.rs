mod common;

use billing_sync::domain::error::BillingError;
use billing_sync::infra::postgres::credits_repo;
use common::*;
use sqlx::PgPool;

async fn add(pool: &PgPool, user_id: &str, amount: i64) -> Result<i64, BillingError> {
    let mut tx = pool.begin().await.unwrap();
    let balance = credits_repo::add_credits(&mut tx, user_id, amount, None, Some("test grant")).await?;
    tx.commit().await.unwrap();
    Ok(balance)
}

async fn spend(pool: &PgPool, user_id: &str, amount: i64) -> Result<i64, BillingError> {
    let mut tx = pool.begin().await.unwrap();
    let balance = credits_repo::use_credits(&mut tx, user_id, amount, "test spend").await?;
    tx.commit().await.unwrap();
    Ok(balance)
}

// ── 14. add_credits_bumps_balance_and_ledger ───────────────────────────────

#[tokio::test]
async fn add_credits_bumps_balance_and_ledger() {
    let pool = setup_pool("billing_sync_test_credits").await;
    seed_user(&pool, "c1", 0).await;

    assert_eq!(add(&pool, "c1", 100).await.unwrap(), 100);
    assert_eq!(add(&pool, "c1", 50).await.unwrap(), 150);

    let user = get_user(&pool, "c1").await;
    assert_eq!(user.credits, 150);
    let entries = get_credit_entries(&pool, "c1").await;
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.direction == "add"));
}

// ── 15. use_credits_decrements ─────────────────────────────────────────────

#[tokio::test]
async fn use_credits_decrements() {
    let pool = setup_pool("billing_sync_test_credits").await;
    seed_user(&pool, "c2", 200).await;

    assert_eq!(spend(&pool, "c2", 80).await.unwrap(), 120);

    let entries = get_credit_entries(&pool, "c2").await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].direction, "subtract");
    assert_eq!(entries[0].amount, 80);
}

// ── 16. insufficient_credits_writes_nothing ────────────────────────────────
// The failure happens before any write: balance and ledger are untouched.

#[tokio::test]
async fn insufficient_credits_writes_nothing() {
    let pool = setup_pool("billing_sync_test_credits").await;
    seed_user(&pool, "c3", 30).await;

    let err = spend(&pool, "c3", 100).await.unwrap_err();
    match err {
        BillingError::InsufficientCredits { available, requested } => {
            assert_eq!(available, 30);
            assert_eq!(requested, 100);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let user = get_user(&pool, "c3").await;
    assert_eq!(user.credits, 30);
    assert!(get_credit_entries(&pool, "c3").await.is_empty());
}

// ── 17. exact_balance_spend_allowed ────────────────────────────────────────

#[tokio::test]
async fn exact_balance_spend_allowed() {
    let pool = setup_pool("billing_sync_test_credits").await;
    seed_user(&pool, "c4", 75).await;

    assert_eq!(spend(&pool, "c4", 75).await.unwrap(), 0);
    assert_eq!(get_user(&pool, "c4").await.credits, 0);
}

// ── 18. non_positive_amounts_rejected ──────────────────────────────────────

#[tokio::test]
async fn non_positive_amounts_rejected() {
    let pool = setup_pool("billing_sync_test_credits").await;
    seed_user(&pool, "c5", 10).await;

    assert!(matches!(add(&pool, "c5", 0).await, Err(BillingError::InvalidInput(_))));
    assert!(matches!(add(&pool, "c5", -5).await, Err(BillingError::InvalidInput(_))));
    assert!(matches!(spend(&pool, "c5", 0).await, Err(BillingError::InvalidInput(_))));
    assert_eq!(get_user(&pool, "c5").await.credits, 10);
}

// ── 19. unknown_user_is_an_error ───────────────────────────────────────────

#[tokio::test]
async fn unknown_user_is_an_error() {
    let pool = setup_pool("billing_sync_test_credits").await;

    assert!(matches!(
        add(&pool, "c_nobody", 10).await,
        Err(BillingError::UserNotFound(_))
    ));
}

// ── 20. ledger_sum_matches_balance ─────────────────────────────────────────
// After a mixed history the signed ledger sum must equal the stored balance.

#[tokio::test]
async fn ledger_sum_matches_balance() {
    let pool = setup_pool("billing_sync_test_credits").await;
    seed_user(&pool, "c6", 0).await;

    add(&pool, "c6", 300).await.unwrap();
    spend(&pool, "c6", 120).await.unwrap();
    add(&pool, "c6", 40).await.unwrap();
    spend(&pool, "c6", 220).await.unwrap();
    spend(&pool, "c6", 1).await.unwrap_err(); // bounces, leaves no row

    let user = get_user(&pool, "c6").await;
    assert_eq!(user.credits, 0);
    assert_eq!(ledger_sum(&pool, "c6").await, user.credits);
}

// ── 21. concurrent_spends_never_go_negative ────────────────────────────────
// 10 tasks each try to spend 30 from a balance of 100. FOR UPDATE
// serializes them: exactly 3 succeed.

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_spends_never_go_negative() {
    let pool = setup_pool("billing_sync_test_credits").await;
    seed_user(&pool, "c7", 100).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move { spend(&pool, "c7", 30).await }));
    }

    let mut ok = 0;
    let mut bounced = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => ok += 1,
            Err(BillingError::InsufficientCredits { .. }) => bounced += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(ok, 3, "exactly 3 spends fit in the balance");
    assert_eq!(bounced, 7);

    let user = get_user(&pool, "c7").await;
    assert_eq!(user.credits, 10);
    // Seeded 100 plus the signed ledger history must land on the balance.
    assert_eq!(100 + ledger_sum(&pool, "c7").await, user.credits);
}
