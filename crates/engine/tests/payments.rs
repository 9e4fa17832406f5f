mod common;

use std::sync::Arc;

use engine::{
    AuditEvent, BankDetails, EngineError, TransactionKind, TransactionStatus, WebhookData,
    WebhookEvent, WebhookOutcome,
};

use common::{MockGateway, file_harness, fund, harness, harness_with, connect, naira};

fn bank() -> BankDetails {
    BankDetails {
        account_number: "0123456789".to_string(),
        bank_code: "058".to_string(),
        account_name: "Ada Obi".to_string(),
    }
}

fn webhook(event: &str, reference: &str, amount: Option<i64>) -> WebhookEvent {
    WebhookEvent {
        event: event.to_string(),
        data: WebhookData {
            reference: reference.to_string(),
            amount,
            status: Some("success".to_string()),
        },
    }
}

#[tokio::test]
async fn deposit_starts_pending_and_charge_webhook_completes_it_once() {
    let h = harness().await;
    let session = h
        .engine
        .initialize_deposit("ada", "ada@uni.test", naira(2_000))
        .await
        .unwrap();
    assert!(session.reference.starts_with("DEP-"));
    assert!(session.authorization_url.ends_with(&session.reference));

    let wallet = h.engine.get_wallet("ada").await.unwrap();
    assert_eq!(wallet.balance, 0);
    assert_eq!(wallet.pending_balance, naira(2_000));

    let event = webhook("charge.success", &session.reference, Some(naira(2_000)));
    assert_eq!(
        h.engine.process_webhook(&event).await.unwrap(),
        WebhookOutcome::Applied
    );
    assert_eq!(
        h.engine.process_webhook(&event).await.unwrap(),
        WebhookOutcome::AlreadyProcessed
    );

    let wallet = h.engine.get_wallet("ada").await.unwrap();
    assert_eq!(wallet.balance, naira(2_000));
    assert_eq!(wallet.pending_balance, 0);
    assert!(wallet.last_balance_verification.is_some());
}

#[tokio::test]
async fn verify_deposit_completes_once_gateway_collected() {
    let h = harness().await;
    let session = h
        .engine
        .initialize_deposit("ada", "ada@uni.test", naira(500))
        .await
        .unwrap();

    let err = h
        .engine
        .verify_deposit("ada", &session.reference)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Gateway(_)));
    assert_eq!(
        h.engine.get_wallet("ada").await.unwrap().pending_balance,
        naira(500)
    );

    h.gateway.collect(&session.reference, naira(500));
    let tx = h
        .engine
        .verify_deposit("ada", &session.reference)
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Completed);
    let again = h
        .engine
        .verify_deposit("ada", &session.reference)
        .await
        .unwrap();
    assert_eq!(again.id, tx.id);
    assert_eq!(h.engine.get_wallet("ada").await.unwrap().balance, naira(500));

    assert!(matches!(
        h.engine
            .verify_deposit("mallory", &session.reference)
            .await
            .unwrap_err(),
        EngineError::Unauthorized(_)
    ));
}

#[tokio::test]
async fn mismatched_charge_amount_fails_the_deposit() {
    let h = harness().await;
    let session = h
        .engine
        .initialize_deposit("ada", "ada@uni.test", naira(2_000))
        .await
        .unwrap();

    let outcome = h
        .engine
        .process_webhook(&webhook("charge.success", &session.reference, Some(naira(20))))
        .await
        .unwrap();
    assert!(matches!(outcome, WebhookOutcome::Ignored(_)));

    let wallet = h.engine.get_wallet("ada").await.unwrap();
    assert_eq!(wallet.balance, 0);
    assert_eq!(wallet.pending_balance, 0);
    let history = h
        .engine
        .transaction_history("ada", Default::default())
        .await
        .unwrap();
    assert_eq!(history.transactions[0].status, TransactionStatus::Failed);
}

#[tokio::test]
async fn unknown_references_and_events_are_acknowledged() {
    let h = harness().await;
    assert!(matches!(
        h.engine
            .process_webhook(&webhook("charge.success", "DEP-missing", Some(100)))
            .await
            .unwrap(),
        WebhookOutcome::Ignored(_)
    ));
    assert!(matches!(
        h.engine
            .process_webhook(&webhook("subscription.create", "SUB-1", None))
            .await
            .unwrap(),
        WebhookOutcome::Ignored(_)
    ));
}

#[tokio::test]
async fn deposit_below_minimum_is_rejected() {
    let h = harness().await;
    let err = h
        .engine
        .initialize_deposit("ada", "ada@uni.test", naira(50))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn withdrawal_holds_amount_and_fee_until_transfer_settles() {
    let h = harness().await;
    fund(&h.engine, "ada", naira(10_000)).await;

    let receipt = h.engine.withdraw("ada", naira(4_000), bank()).await.unwrap();
    assert_eq!(receipt.fee, naira(50));
    assert_eq!(receipt.withdrawal.status, TransactionStatus::Pending);
    assert_eq!(h.gateway.transfers.lock().unwrap().len(), 1);

    let wallet = h.engine.get_wallet("ada").await.unwrap();
    assert_eq!(wallet.balance, naira(10_000 - 4_050));
    let summary = h.engine.wallet_summary("ada").await.unwrap();
    assert_eq!(summary.pending_withdrawals, naira(4_050));

    let outcome = h
        .engine
        .process_webhook(&webhook("transfer.success", &receipt.reference, None))
        .await
        .unwrap();
    assert_eq!(outcome, WebhookOutcome::Applied);
    let summary = h.engine.wallet_summary("ada").await.unwrap();
    assert_eq!(summary.pending_withdrawals, 0);
    assert_eq!(summary.wallet.balance, naira(10_000 - 4_050));
}

#[tokio::test]
async fn failed_transfer_restores_balance() {
    let h = harness().await;
    fund(&h.engine, "ada", naira(10_000)).await;
    let receipt = h.engine.withdraw("ada", naira(4_000), bank()).await.unwrap();

    let event = webhook("transfer.failed", &receipt.reference, None);
    assert_eq!(
        h.engine.process_webhook(&event).await.unwrap(),
        WebhookOutcome::Applied
    );
    assert_eq!(
        h.engine.process_webhook(&event).await.unwrap(),
        WebhookOutcome::AlreadyProcessed
    );
    assert_eq!(
        h.engine.get_wallet("ada").await.unwrap().balance,
        naira(10_000)
    );
}

#[tokio::test]
async fn rejected_transfer_fails_withdrawal_immediately() {
    let h = harness_with(connect("sqlite::memory:").await, MockGateway::failing_transfers()).await;
    fund(&h.engine, "ada", naira(10_000)).await;

    let err = h
        .engine
        .withdraw("ada", naira(4_000), bank())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Gateway(_)));
    assert_eq!(
        h.engine.get_wallet("ada").await.unwrap().balance,
        naira(10_000)
    );
    let history = h
        .engine
        .transaction_history("ada", Default::default())
        .await
        .unwrap();
    assert!(
        history
            .transactions
            .iter()
            .filter(|tx| tx.kind != TransactionKind::Deposit)
            .all(|tx| tx.status == TransactionStatus::Failed)
    );
}

#[tokio::test]
async fn withdrawal_requires_amount_plus_fee() {
    let h = harness().await;
    fund(&h.engine, "ada", naira(1_020)).await;
    let err = h
        .engine
        .withdraw("ada", naira(1_000), bank())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds { .. }));

    let mut bad = bank();
    bad.account_number = "12".to_string();
    assert!(matches!(
        h.engine.withdraw("ada", naira(1_000), bad).await.unwrap_err(),
        EngineError::Validation(_)
    ));
}

#[tokio::test]
async fn withdrawal_too_large_to_add_fee_is_rejected() {
    let h = harness().await;
    fund(&h.engine, "ada", naira(10_000)).await;

    let err = h
        .engine
        .withdraw("ada", i64::MAX, bank())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Validation("amount too large".to_string()));
    assert_eq!(
        h.engine.get_wallet("ada").await.unwrap().balance,
        naira(10_000)
    );
    assert!(h.gateway.transfers.lock().unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_withdrawals_never_overdraw() {
    let (h, path) = file_harness(MockGateway::default()).await;
    fund(&h.engine, "ada", naira(10_000)).await;
    let engine = Arc::new(h.engine);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.withdraw("ada", naira(3_000), bank()).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(EngineError::InsufficientFunds { .. } | EngineError::Concurrency(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    let wallet = engine.get_wallet("ada").await.unwrap();
    assert!(succeeded <= 3);
    assert!(wallet.balance >= 0);
    assert_eq!(wallet.balance, naira(10_000) - succeeded * naira(3_050));

    let report = engine.verify_balance("ada").await.unwrap();
    assert!(!report.corrected);
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn deposit_settlement_is_audited() {
    let h = harness().await;
    let session = h
        .engine
        .initialize_deposit("ada", "ada@uni.test", naira(300))
        .await
        .unwrap();
    h.engine
        .process_webhook(&webhook("charge.success", &session.reference, Some(naira(300))))
        .await
        .unwrap();

    let records = h.audit.records();
    assert!(records.iter().any(|r| matches!(
        r.event,
        AuditEvent::StatusChanged {
            to: TransactionStatus::Completed,
            ..
        }
    )));
}
