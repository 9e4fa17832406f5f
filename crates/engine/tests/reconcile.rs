mod common;

use engine::{AuditEvent, BALANCE_TOLERANCE_MINOR};

use common::{exec, fund, harness, naira};

#[tokio::test]
async fn drift_is_detected_and_corrected() {
    let h = harness().await;
    fund(&h.engine, "ada", naira(1_000)).await;
    exec(
        &h.db,
        "UPDATE wallets SET balance = balance + ?, pending_balance = 7 WHERE user_id = ?",
        vec![naira(5).into(), "ada".into()],
    )
    .await;

    let report = h.engine.verify_balance("ada").await.unwrap();
    assert!(report.corrected);
    assert_eq!(report.db_balance, naira(1_005));
    assert_eq!(report.calculated_balance, naira(1_000));
    assert_eq!(report.discrepancy.balance, naira(5));
    assert_eq!(report.discrepancy.pending_balance, 7);

    let wallet = h.engine.get_wallet("ada").await.unwrap();
    assert_eq!(wallet.balance, naira(1_000));
    assert_eq!(wallet.pending_balance, 0);
    assert!(wallet.last_balance_verification.is_some());

    let corrections: Vec<_> = h
        .audit
        .records()
        .into_iter()
        .filter(|r| matches!(r.event, AuditEvent::BalanceCorrection { .. }))
        .collect();
    assert_eq!(corrections.len(), 1);
    match &corrections[0].event {
        AuditEvent::BalanceCorrection {
            balance_before,
            balance_after,
            ..
        } => {
            assert_eq!(*balance_before, naira(1_005));
            assert_eq!(*balance_after, naira(1_000));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let again = h.engine.verify_balance("ada").await.unwrap();
    assert!(!again.corrected);
}

#[tokio::test]
async fn drift_within_tolerance_is_left_alone() {
    let h = harness().await;
    fund(&h.engine, "ada", naira(1_000)).await;
    exec(
        &h.db,
        "UPDATE wallets SET balance = balance + ? WHERE user_id = ?",
        vec![BALANCE_TOLERANCE_MINOR.into(), "ada".into()],
    )
    .await;

    let report = h.engine.verify_balance("ada").await.unwrap();
    assert!(!report.corrected);
    assert_eq!(report.discrepancy.balance, BALANCE_TOLERANCE_MINOR);
    assert_eq!(
        h.engine.get_wallet("ada").await.unwrap().balance,
        naira(1_000) + BALANCE_TOLERANCE_MINOR
    );
}

#[tokio::test]
async fn reconcile_all_visits_every_wallet() {
    let h = harness().await;
    fund(&h.engine, "ada", naira(100)).await;
    fund(&h.engine, "bola", naira(200)).await;
    exec(
        &h.db,
        "UPDATE wallets SET balance = 0 WHERE user_id = ?",
        vec!["bola".into()],
    )
    .await;

    let reports = h.engine.reconcile_all().await.unwrap();
    assert_eq!(reports.len(), 2);
    let corrected: Vec<_> = reports
        .iter()
        .filter(|r| r.corrected)
        .map(|r| r.user_id.as_str())
        .collect();
    assert_eq!(corrected, vec!["bola"]);
    assert_eq!(h.engine.get_wallet("bola").await.unwrap().balance, naira(200));
}
