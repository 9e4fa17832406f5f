use sea_orm::TransactionTrait;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    DepositInit, EngineError, NewTransaction, ResultEngine, Transaction, TransactionKind,
    TransactionStatus, util::require_user_id,
};

use super::{
    Engine, Journal,
    ledger::{find_by_reference, lock_by_reference, lock_wallet},
    with_tx,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DepositSession {
    pub reference: String,
    pub authorization_url: String,
    pub access_code: Option<String>,
    pub amount: i64,
    pub transaction_id: Uuid,
}

/// Result of applying a gateway confirmation to a pending deposit.
pub(super) enum Settlement {
    Completed(Transaction),
    /// The row had already reached a final status; nothing changed.
    AlreadyFinal(Transaction),
    /// The gateway collected a different amount; the row was failed.
    AmountMismatch {
        expected: i64,
        received: i64,
    },
}

impl Engine {
    /// Opens a deposit with the gateway, then records it as a `pending`
    /// deposit on the user's wallet.
    ///
    /// A gateway failure is returned before anything is written.
    pub async fn initialize_deposit(
        &self,
        user_id: &str,
        email: &str,
        amount: i64,
    ) -> ResultEngine<DepositSession> {
        require_user_id(user_id)?;
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(EngineError::Validation("a valid email is required".to_string()));
        }
        if amount < self.config.min_deposit_minor() {
            return Err(EngineError::Validation(format!(
                "minimum deposit is {}",
                crate::Money::new(self.config.min_deposit_minor())
            )));
        }

        let reference = format!("DEP-{}", Uuid::new_v4());
        let authorization = self
            .gateway
            .initialize_deposit(DepositInit {
                reference: reference.clone(),
                email: email.to_string(),
                amount,
            })
            .await?;

        let mut journal = Journal::default();
        let tx = with_tx!(self, |db_tx| {
            let mut wallet = lock_wallet(&db_tx, user_id).await?;
            let new = NewTransaction::new(user_id, TransactionKind::Deposit, amount)
                .status(TransactionStatus::Pending)
                .reference(reference.clone())
                .description("Wallet deposit")
                .metadata(json!({ "email": email, "gateway": "paystack" }));
            self.post(&db_tx, &mut wallet, new, &mut journal).await
        })?;
        self.flush(journal);

        Ok(DepositSession {
            reference,
            authorization_url: authorization.authorization_url,
            access_code: authorization.access_code,
            amount,
            transaction_id: tx.id,
        })
    }

    /// Confirms a deposit with the gateway and completes it.
    ///
    /// Safe to call repeatedly: a deposit already completed is returned as
    /// is. A payment the gateway does not report as successful leaves the
    /// row pending and returns [`EngineError::Gateway`].
    pub async fn verify_deposit(&self, user_id: &str, reference: &str) -> ResultEngine<Transaction> {
        let tx = find_by_reference(&self.database, reference)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("deposit {reference}")))?;
        if tx.kind != TransactionKind::Deposit {
            return Err(EngineError::Validation(format!(
                "{reference} is not a deposit"
            )));
        }
        if tx.user_id != user_id {
            return Err(EngineError::Unauthorized(
                "deposit belongs to another user".to_string(),
            ));
        }
        if tx.status != TransactionStatus::Pending {
            return Ok(tx);
        }

        let verification = self.gateway.verify_transaction(reference).await?;
        if !verification.success {
            return Err(EngineError::Gateway(format!(
                "payment {reference} has not succeeded"
            )));
        }

        match self.settle_deposit(reference, verification.amount).await? {
            Settlement::Completed(tx) | Settlement::AlreadyFinal(tx) => Ok(tx),
            Settlement::AmountMismatch { expected, received } => Err(EngineError::Gateway(
                format!("amount mismatch for {reference}: expected {expected}, received {received}"),
            )),
        }
    }

    /// Completes the pending deposit `reference` for `received` kobo.
    ///
    /// The wallet is reconciled before and after the credit, inside the same
    /// unit.
    pub(super) async fn settle_deposit(
        &self,
        reference: &str,
        received: i64,
    ) -> ResultEngine<Settlement> {
        let mut journal = Journal::default();
        let settlement = with_tx!(self, |db_tx| {
            let (mut wallet, tx) = lock_by_reference(&db_tx, reference)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("deposit {reference}")))?;
            if tx.kind != TransactionKind::Deposit {
                return Err(EngineError::Validation(format!(
                    "{reference} is not a deposit"
                )));
            }
            if tx.status != TransactionStatus::Pending {
                tracing::info!(reference, status = tx.status.as_str(), "deposit already settled");
                Ok(Settlement::AlreadyFinal(tx))
            } else if tx.amount != received {
                tracing::warn!(
                    reference,
                    expected = tx.amount,
                    received,
                    "deposit amount mismatch, failing deposit"
                );
                let expected = tx.amount;
                self.transition(&db_tx, &mut wallet, tx, TransactionStatus::Failed, &mut journal)
                    .await?;
                Ok(Settlement::AmountMismatch { expected, received })
            } else {
                self.verify_locked(&db_tx, &mut wallet, &mut journal).await?;
                let tx = self
                    .transition(&db_tx, &mut wallet, tx, TransactionStatus::Completed, &mut journal)
                    .await?;
                self.verify_locked(&db_tx, &mut wallet, &mut journal).await?;
                journal.deposit_succeeded(&tx.user_id, tx.amount, reference);
                Ok(Settlement::Completed(tx))
            }
        })?;
        self.flush(journal);
        Ok(settlement)
    }
}
