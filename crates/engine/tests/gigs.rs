mod common;

use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{EngineError, EscrowStatus, GigStatus, Principal, Role};

use common::{fund, harness, naira, seed_bid, seed_gig};

async fn bid_status(db: &DatabaseConnection, bid_id: Uuid) -> String {
    db.query_one(Statement::from_sql_and_values(
        db.get_database_backend(),
        "SELECT status FROM bids WHERE id = ?",
        vec![bid_id.to_string().into()],
    ))
    .await
    .unwrap()
    .unwrap()
    .try_get_by_index::<String>(0)
    .unwrap()
}

#[tokio::test]
async fn accepted_bid_is_escrowed_then_released_to_freelancer() {
    let h = harness().await;
    fund(&h.engine, "client", naira(20_000)).await;
    let gig = seed_gig(&h.db, "client", naira(8_000)).await;
    let chosen = seed_bid(&h.db, gig, "freelancer", naira(5_000)).await;
    let other = seed_bid(&h.db, gig, "rival", naira(6_000)).await;
    let client = Principal::student("client");

    let accepted = h.engine.accept_bid(&client, chosen).await.unwrap();
    assert_eq!(accepted.status, GigStatus::InProgress);
    assert_eq!(accepted.escrow_status, EscrowStatus::InEscrow);
    assert_eq!(accepted.agreed_amount, Some(naira(5_000)));
    assert_eq!(accepted.freelancer_id.as_deref(), Some("freelancer"));
    assert_eq!(bid_status(&h.db, chosen).await, "accepted");
    assert_eq!(bid_status(&h.db, other).await, "rejected");

    let client_wallet = h.engine.get_wallet("client").await.unwrap();
    assert_eq!(
        client_wallet.balance,
        naira(20_000) - naira(5_000) - accepted.platform_fee
    );
    let freelancer = h.engine.get_wallet("freelancer").await.unwrap();
    assert_eq!(freelancer.pending_balance, naira(5_000));

    let done = h.engine.complete_gig(&client, gig).await.unwrap();
    assert_eq!(done.status, GigStatus::Completed);
    assert_eq!(done.escrow_status, EscrowStatus::Released);
    let freelancer = h.engine.get_wallet("freelancer").await.unwrap();
    assert_eq!(freelancer.balance, naira(5_000));
    assert_eq!(freelancer.pending_balance, 0);
    assert_eq!(freelancer.total_earned, naira(5_000));

    assert!(matches!(
        h.engine.complete_gig(&client, gig).await.unwrap_err(),
        EngineError::InvalidStateTransition(_)
    ));
}

#[tokio::test]
async fn cancelling_gig_in_progress_refunds_client() {
    let h = harness().await;
    fund(&h.engine, "client", naira(20_000)).await;
    let gig = seed_gig(&h.db, "client", naira(8_000)).await;
    let bid = seed_bid(&h.db, gig, "freelancer", naira(5_000)).await;
    h.engine
        .accept_bid(&Principal::student("client"), bid)
        .await
        .unwrap();

    let cancelled = h
        .engine
        .cancel_gig(&Principal::student("freelancer"), gig)
        .await
        .unwrap();
    assert_eq!(cancelled.status, GigStatus::Cancelled);
    assert_eq!(cancelled.escrow_status, EscrowStatus::Refunded);
    assert_eq!(bid_status(&h.db, bid).await, "withdrawn");

    let client = h.engine.get_wallet("client").await.unwrap();
    assert_eq!(client.balance, naira(20_000));
    assert_eq!(client.pending_balance, 0);
    let freelancer = h.engine.get_wallet("freelancer").await.unwrap();
    assert_eq!(freelancer.pending_balance, 0);
    assert_eq!(freelancer.balance, 0);
}

#[tokio::test]
async fn open_gig_cancels_without_moving_money() {
    let h = harness().await;
    let gig = seed_gig(&h.db, "client", naira(8_000)).await;
    let bid = seed_bid(&h.db, gig, "freelancer", naira(5_000)).await;

    let cancelled = h
        .engine
        .cancel_gig(&Principal::new("ops", Role::Admin, None), gig)
        .await
        .unwrap();
    assert_eq!(cancelled.status, GigStatus::Cancelled);
    assert_eq!(cancelled.escrow_status, EscrowStatus::None);
    assert_eq!(bid_status(&h.db, bid).await, "rejected");
}

#[tokio::test]
async fn only_owner_with_funds_can_accept() {
    let h = harness().await;
    fund(&h.engine, "client", naira(1_000)).await;
    let gig = seed_gig(&h.db, "client", naira(8_000)).await;
    let bid = seed_bid(&h.db, gig, "freelancer", naira(5_000)).await;

    assert!(matches!(
        h.engine
            .accept_bid(&Principal::student("freelancer"), bid)
            .await
            .unwrap_err(),
        EngineError::Unauthorized(_)
    ));
    assert!(matches!(
        h.engine
            .accept_bid(&Principal::student("client"), bid)
            .await
            .unwrap_err(),
        EngineError::InsufficientFunds { .. }
    ));
    assert_eq!(bid_status(&h.db, bid).await, "pending");

    fund(&h.engine, "client", naira(10_000)).await;
    h.engine
        .accept_bid(&Principal::student("client"), bid)
        .await
        .unwrap();
    assert!(matches!(
        h.engine
            .accept_bid(&Principal::student("client"), bid)
            .await
            .unwrap_err(),
        EngineError::InvalidStateTransition(_)
    ));
}

#[tokio::test]
async fn bid_too_large_to_add_fee_is_rejected() {
    let h = harness().await;
    fund(&h.engine, "client", naira(10_000)).await;
    let gig = seed_gig(&h.db, "client", naira(8_000)).await;
    let bid = seed_bid(&h.db, gig, "freelancer", i64::MAX).await;

    let err = h
        .engine
        .accept_bid(&Principal::student("client"), bid)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Validation("amount too large".to_string()));
    assert_eq!(bid_status(&h.db, bid).await, "pending");
    assert_eq!(
        h.engine.get_wallet("client").await.unwrap().balance,
        naira(10_000)
    );
}
