//! Balance reconciler.
//!
//! Replays a wallet's history through the same delta rule the engine applies
//! and compares the result with the stored balances. Drift beyond the
//! tolerance is corrected in place, logged at `warn` and written to the audit
//! trail as a `balance_correction`.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    AuditEvent, Effect, ResultEngine, Transaction, Wallet, transactions, util::require_user_id,
    wallets,
};

use super::{
    Engine, Journal,
    ledger::lock_wallet,
    with_tx,
};

/// Largest stored-vs-replayed difference, in kobo, treated as consistent.
pub const BALANCE_TOLERANCE_MINOR: i64 = 1;

/// `stored - calculated` for each balance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Drift {
    pub balance: i64,
    pub pending_balance: i64,
}

impl Drift {
    pub fn exceeds_tolerance(&self) -> bool {
        self.balance.abs() > BALANCE_TOLERANCE_MINOR
            || self.pending_balance.abs() > BALANCE_TOLERANCE_MINOR
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub wallet_id: Uuid,
    pub user_id: String,
    pub calculated_balance: i64,
    pub calculated_pending_balance: i64,
    /// Stored values as found, before any correction.
    pub db_balance: i64,
    pub db_pending_balance: i64,
    pub discrepancy: Drift,
    pub corrected: bool,
    pub verified_at: DateTime<Utc>,
}

/// Sum of the effects of `history` on its wallet.
pub(crate) fn replay(history: &[Transaction]) -> Effect {
    let mut total = Effect::NONE;
    for tx in history {
        total += tx.effect();
    }
    total
}

impl Engine {
    /// Verifies (and if needed corrects) the wallet of `user_id`.
    pub async fn verify_balance(&self, user_id: &str) -> ResultEngine<VerificationReport> {
        require_user_id(user_id)?;
        let mut journal = Journal::default();
        let report = with_tx!(self, |db_tx| {
            let mut wallet = lock_wallet(&db_tx, user_id).await?;
            self.verify_locked(&db_tx, &mut wallet, &mut journal).await
        })?;
        self.flush(journal);
        Ok(report)
    }

    /// Runs [`verify_balance`](Self::verify_balance) over every wallet, one
    /// unit per wallet, and returns the reports in wallet id order.
    pub async fn reconcile_all(&self) -> ResultEngine<Vec<VerificationReport>> {
        let models = wallets::Entity::find()
            .order_by_asc(wallets::Column::Id)
            .all(&self.database)
            .await?;

        let mut reports = Vec::with_capacity(models.len());
        for model in models {
            let wallet = Wallet::try_from(model)?;
            let mut journal = Journal::default();
            let report = with_tx!(self, |db_tx| {
                let mut wallet = lock_wallet(&db_tx, &wallet.user_id).await?;
                self.verify_locked(&db_tx, &mut wallet, &mut journal).await
            })?;
            self.flush(journal);
            reports.push(report);
        }

        let drifted = reports.iter().filter(|r| r.corrected).count();
        tracing::info!(wallets = reports.len(), drifted, "reconciliation pass finished");
        Ok(reports)
    }

    pub(super) async fn verify_locked(
        &self,
        db_tx: &DatabaseTransaction,
        wallet: &mut Wallet,
        journal: &mut Journal,
    ) -> ResultEngine<VerificationReport> {
        let history: Vec<Transaction> = transactions::Entity::find()
            .filter(transactions::Column::WalletId.eq(wallet.id.to_string()))
            .order_by_asc(transactions::Column::CreatedAt)
            .order_by_asc(transactions::Column::Id)
            .all(db_tx)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect::<ResultEngine<_>>()?;

        let calculated = replay(&history);
        let now = Utc::now();
        let drift = Drift {
            balance: wallet.balance - calculated.balance,
            pending_balance: wallet.pending_balance - calculated.pending,
        };
        let report = VerificationReport {
            wallet_id: wallet.id,
            user_id: wallet.user_id.clone(),
            calculated_balance: calculated.balance,
            calculated_pending_balance: calculated.pending,
            db_balance: wallet.balance,
            db_pending_balance: wallet.pending_balance,
            discrepancy: drift,
            corrected: drift.exceeds_tolerance(),
            verified_at: now,
        };

        let mut update = wallets::ActiveModel {
            id: ActiveValue::Set(wallet.id.to_string()),
            last_balance_verification: ActiveValue::Set(Some(now)),
            ..Default::default()
        };
        if report.corrected {
            tracing::warn!(
                wallet_id = %wallet.id,
                user_id = %wallet.user_id,
                stored_balance = wallet.balance,
                calculated_balance = calculated.balance,
                stored_pending = wallet.pending_balance,
                calculated_pending = calculated.pending,
                "balance drift detected, correcting"
            );
            journal.audit(AuditEvent::BalanceCorrection {
                wallet_id: wallet.id,
                user_id: wallet.user_id.clone(),
                balance_before: wallet.balance,
                balance_after: calculated.balance,
                pending_before: wallet.pending_balance,
                pending_after: calculated.pending,
                balance_discrepancy: drift.balance,
                pending_discrepancy: drift.pending_balance,
            });
            wallet.balance = calculated.balance;
            wallet.pending_balance = calculated.pending;
            update.balance = ActiveValue::Set(calculated.balance);
            update.pending_balance = ActiveValue::Set(calculated.pending);
        }
        wallet.last_balance_verification = Some(now);
        update.update(db_tx).await?;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, NewTransaction, TransactionKind, TransactionStatus};

    fn row(
        kind: TransactionKind,
        direction: Direction,
        status: TransactionStatus,
        amount: i64,
    ) -> Transaction {
        let new = NewTransaction::new("ada", kind, amount)
            .direction(direction)
            .status(status);
        Transaction::from_new(Uuid::nil(), new, Utc::now()).unwrap()
    }

    #[test]
    fn replay_counts_pending_and_completed_rows() {
        use crate::Direction::{Credit, Debit};
        use crate::TransactionKind as K;
        use crate::TransactionStatus::{Completed, Failed, Pending};

        let history = vec![
            row(K::Deposit, Credit, Completed, 5_000),
            row(K::Deposit, Credit, Pending, 700),
            row(K::Escrow, Debit, Completed, 1_000),
            row(K::Fee, Debit, Completed, 1_000),
            row(K::Withdrawal, Debit, Failed, 2_000),
            row(K::Release, Debit, Completed, 1_000),
        ];
        assert_eq!(
            replay(&history),
            Effect {
                balance: 3_000,
                pending: 700
            }
        );
    }

    #[test]
    fn tolerance_is_one_kobo() {
        assert!(
            !Drift {
                balance: 1,
                pending_balance: -1
            }
            .exceeds_tolerance()
        );
        assert!(
            Drift {
                balance: 0,
                pending_balance: 2
            }
            .exceeds_tolerance()
        );
    }
}
