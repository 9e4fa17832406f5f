mod common;

use rand::{Rng, SeedableRng, rngs::StdRng};
use uuid::Uuid;

use engine::{
    BankDetails, Direction, EngineError, NewTransaction, OrderStatus, Principal,
    TransactionFilter, TransactionKind, TransactionStatus, WebhookData, WebhookEvent,
    WebhookOutcome,
};

use common::{count, exec, fund, harness, naira, pickup, seed_product};

#[tokio::test]
async fn wallet_is_created_on_first_use() {
    let h = harness().await;
    let first = h.engine.get_wallet("ada").await.unwrap();
    let second = h.engine.get_wallet("ada").await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.balance, 0);
    assert_eq!(first.currency, "NGN");
}

#[tokio::test]
async fn failed_wallet_write_leaves_no_transaction_behind() {
    let h = harness().await;
    let wallet = h.engine.get_wallet("ada").await.unwrap();
    exec(
        &h.db,
        "CREATE TRIGGER freeze_wallets BEFORE UPDATE ON wallets \
         BEGIN SELECT RAISE(ABORT, 'wallets frozen'); END",
        vec![],
    )
    .await;

    let err = h
        .engine
        .apply_transaction(
            wallet.id,
            NewTransaction::new("ada", TransactionKind::Deposit, naira(100)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Database(_)), "{err:?}");
    assert_eq!(
        count(&h.db, "SELECT COUNT(*) FROM transactions", vec![]).await,
        0
    );

    exec(&h.db, "DROP TRIGGER freeze_wallets", vec![]).await;
    assert_eq!(h.engine.get_wallet("ada").await.unwrap().balance, 0);
}

#[tokio::test]
async fn debit_beyond_balance_is_rejected() {
    let h = harness().await;
    let wallet = fund(&h.engine, "ada", naira(100)).await;
    let err = h
        .engine
        .apply_transaction(
            wallet.id,
            NewTransaction::new("ada", TransactionKind::Withdrawal, naira(101)),
        )
        .await
        .unwrap_err();
    match err {
        EngineError::InsufficientFunds { shortfall, .. } => assert_eq!(shortfall.minor(), 100),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(h.engine.get_wallet("ada").await.unwrap().balance, naira(100));
}

#[tokio::test]
async fn credit_overflowing_the_balance_is_rejected() {
    let h = harness().await;
    let wallet = fund(&h.engine, "ada", i64::MAX - 10).await;
    let err = h
        .engine
        .apply_transaction(
            wallet.id,
            NewTransaction::new("ada", TransactionKind::Deposit, naira(1)),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Validation("amount too large".to_string()));
    assert_eq!(
        h.engine.get_wallet("ada").await.unwrap().balance,
        i64::MAX - 10
    );
    assert_eq!(
        count(&h.db, "SELECT COUNT(*) FROM transactions", vec![]).await,
        1
    );
}

#[tokio::test]
async fn transaction_on_foreign_wallet_is_unauthorized() {
    let h = harness().await;
    let wallet = h.engine.get_wallet("ada").await.unwrap();
    let err = h
        .engine
        .apply_transaction(
            wallet.id,
            NewTransaction::new("mallory", TransactionKind::Deposit, naira(100)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));
}

#[tokio::test]
async fn references_are_unique() {
    let h = harness().await;
    let wallet = h.engine.get_wallet("ada").await.unwrap();
    let new = NewTransaction::new("ada", TransactionKind::Deposit, naira(100)).reference("DEP-1");
    h.engine
        .apply_transaction(wallet.id, new.clone())
        .await
        .unwrap();
    let err = h.engine.apply_transaction(wallet.id, new).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(h.engine.get_wallet("ada").await.unwrap().balance, naira(100));
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let h = harness().await;
    let wallet = h.engine.get_wallet("ada").await.unwrap();
    for amount in [0, -5] {
        let err = h
            .engine
            .apply_transaction(
                wallet.id,
                NewTransaction::new("ada", TransactionKind::Deposit, amount),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
    let err = h
        .engine
        .apply_transaction(
            wallet.id,
            NewTransaction::new("ada", TransactionKind::Deposit, naira(1))
                .direction(Direction::Debit),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn history_filters_and_pages_newest_first() {
    let h = harness().await;
    for _ in 0..5 {
        fund(&h.engine, "ada", naira(100)).await;
    }
    let wallet = h.engine.get_wallet("ada").await.unwrap();
    h.engine
        .apply_transaction(
            wallet.id,
            NewTransaction::new("ada", TransactionKind::Withdrawal, naira(50)),
        )
        .await
        .unwrap();

    let page = h
        .engine
        .transaction_history(
            "ada",
            TransactionFilter {
                limit: Some(2),
                offset: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 6);
    assert_eq!(page.transactions.len(), 2);
    assert_eq!(page.transactions[0].kind, TransactionKind::Withdrawal);

    let deposits = h
        .engine
        .transaction_history(
            "ada",
            TransactionFilter {
                kind: Some(TransactionKind::Deposit),
                status: Some(TransactionStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(deposits.total, 5);

    let summary = h.engine.wallet_summary("ada").await.unwrap();
    assert_eq!(summary.transaction_count, 6);
    assert_eq!(summary.recent_transactions.len(), 5);
}

fn payout_account() -> BankDetails {
    BankDetails {
        account_number: "0123456789".to_string(),
        bank_code: "058".to_string(),
        account_name: "Campus Payout".to_string(),
    }
}

fn settlement(event: &str, reference: &str, amount: Option<i64>) -> WebhookEvent {
    WebhookEvent {
        event: event.to_string(),
        data: WebhookData {
            reference: reference.to_string(),
            amount,
            status: Some("success".to_string()),
        },
    }
}

/// Random traffic of deposits, checkouts, confirmations, cancellations and
/// withdrawals must keep every kobo accounted for.
#[tokio::test]
async fn random_ledger_traffic_conserves_money() {
    let h = harness().await;
    let mut rng = StdRng::seed_from_u64(0x5eed);

    let buyers = ["buyer-1", "buyer-2", "buyer-3"];
    let sellers = ["seller-1", "seller-2"];
    let everyone: Vec<&str> = buyers.iter().chain(sellers.iter()).copied().collect();
    let mut deposited = 0;
    for buyer in buyers {
        let amount = naira(rng.gen_range(2_000..20_000));
        fund(&h.engine, buyer, amount).await;
        deposited += amount;
    }
    for seller in sellers {
        h.engine.get_wallet(seller).await.unwrap();
    }
    let mut products = Vec::new();
    for seller in sellers {
        for _ in 0..3 {
            let price = naira(rng.gen_range(100..4_000));
            products.push(seed_product(&h.db, seller, price).await);
        }
    }

    let mut fees_retained = 0;
    let mut withdrawn = 0;
    let mut open: Vec<(Principal, Uuid, i64)> = Vec::new();
    let mut payouts: Vec<(String, i64)> = Vec::new();
    for _ in 0..80 {
        match rng.gen_range(0..10) {
            0..=3 => {
                let buyer = Principal::student(buyers[rng.gen_range(0..buyers.len())]);
                let product = products[rng.gen_range(0..products.len())];
                let quantity = rng.gen_range(1..3);
                match h.engine.buy_now(&buyer, product, quantity, pickup()).await {
                    Ok(order) => {
                        fees_retained += order.platform_fee;
                        open.push((buyer, order.id, order.platform_fee));
                    }
                    Err(EngineError::InsufficientFunds { .. }) => {}
                    Err(other) => panic!("unexpected error: {other:?}"),
                }
            }
            4..=5 if !open.is_empty() => {
                let (owner, order_id, fee) = open.swap_remove(rng.gen_range(0..open.len()));
                if rng.gen_bool(0.5) {
                    let order = h.engine.cancel_order(&owner, order_id, None).await.unwrap();
                    assert_eq!(order.status, OrderStatus::Cancelled);
                    fees_retained -= fee;
                } else {
                    let admin = Principal::new("ops", engine::Role::Admin, None);
                    let order = h.engine.confirm_delivery(&admin, order_id).await.unwrap();
                    assert_eq!(order.status, OrderStatus::Completed);
                }
            }
            6 => {
                let user = buyers[rng.gen_range(0..buyers.len())];
                let amount = naira(rng.gen_range(100..5_000));
                let session = h
                    .engine
                    .initialize_deposit(user, "student@uni.test", amount)
                    .await
                    .unwrap();
                let outcome = h
                    .engine
                    .process_webhook(&settlement("charge.success", &session.reference, Some(amount)))
                    .await
                    .unwrap();
                assert_eq!(outcome, WebhookOutcome::Applied);
                deposited += amount;
            }
            7..=8 => {
                let user = everyone[rng.gen_range(0..everyone.len())];
                let amount = naira(rng.gen_range(1_000..6_000));
                match h.engine.withdraw(user, amount, payout_account()).await {
                    Ok(receipt) => {
                        withdrawn += receipt.amount + receipt.fee;
                        payouts.push((receipt.reference, receipt.amount + receipt.fee));
                    }
                    Err(EngineError::InsufficientFunds { .. }) => {}
                    Err(other) => panic!("unexpected error: {other:?}"),
                }
            }
            _ if !payouts.is_empty() => {
                let (reference, total) = payouts.swap_remove(rng.gen_range(0..payouts.len()));
                let event = if rng.gen_bool(0.7) {
                    "transfer.success"
                } else {
                    withdrawn -= total;
                    "transfer.failed"
                };
                let outcome = h
                    .engine
                    .process_webhook(&settlement(event, &reference, None))
                    .await
                    .unwrap();
                assert_eq!(outcome, WebhookOutcome::Applied);
            }
            _ => {}
        }
    }

    let mut held_by_buyers = 0;
    let mut spendable = 0;
    for buyer in buyers {
        let wallet = h.engine.get_wallet(buyer).await.unwrap();
        assert!(wallet.balance >= 0);
        held_by_buyers += wallet.pending_balance;
        spendable += wallet.balance;
    }
    let mut held_for_sellers = 0;
    for seller in sellers {
        let wallet = h.engine.get_wallet(seller).await.unwrap();
        assert!(wallet.balance >= 0);
        held_for_sellers += wallet.pending_balance;
        spendable += wallet.balance;
    }
    assert_eq!(held_by_buyers, held_for_sellers);
    assert_eq!(
        spendable + held_for_sellers + fees_retained + withdrawn,
        deposited
    );

    for report in h.engine.reconcile_all().await.unwrap() {
        assert_eq!(report.discrepancy.balance, 0, "{}", report.user_id);
        assert_eq!(report.discrepancy.pending_balance, 0, "{}", report.user_id);
        assert!(!report.corrected);
    }
}
