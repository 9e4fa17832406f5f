use sea_orm::TransactionTrait;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    BankDetails, EngineError, Money, NewTransaction, ResultEngine, Transaction, TransactionKind,
    TransactionStatus, TransferRequest, util::require_user_id,
};

use super::{
    Engine, Journal,
    ledger::{find_by_reference, lock_by_reference, lock_wallet},
    with_tx,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WithdrawalReceipt {
    pub reference: String,
    pub amount: i64,
    pub fee: i64,
    pub withdrawal: Transaction,
    /// `None` when the withdrawal fee is configured to zero.
    pub fee_transaction: Option<Transaction>,
}

/// Reference of the fee row paired with withdrawal `reference`.
pub(super) fn fee_reference(reference: &str) -> String {
    format!("{reference}-fee")
}

impl Engine {
    /// Debits `amount` plus the fixed withdrawal fee and asks the gateway to
    /// pay `amount` out to `bank`.
    ///
    /// Both rows stay `pending` until the payout callback settles them. If
    /// the gateway refuses the transfer, both rows are failed (restoring the
    /// balance) and the gateway error is returned.
    pub async fn withdraw(
        &self,
        user_id: &str,
        amount: i64,
        bank: BankDetails,
    ) -> ResultEngine<WithdrawalReceipt> {
        require_user_id(user_id)?;
        bank.validate()?;
        let minimum = self.config.min_withdrawal_minor();
        if amount < minimum {
            return Err(EngineError::Validation(format!(
                "minimum withdrawal is {}",
                Money::new(minimum)
            )));
        }
        let fee = self.config.withdrawal_fee_minor();
        let reference = format!("WD-{}", Uuid::new_v4());

        let mut journal = Journal::default();
        let (withdrawal, fee_transaction) = with_tx!(self, |db_tx| {
            let mut wallet = lock_wallet(&db_tx, user_id).await?;
            let required = amount
                .checked_add(fee)
                .ok_or_else(|| EngineError::Validation("amount too large".to_string()))?;
            if wallet.balance < required {
                return Err(EngineError::insufficient(required, wallet.balance));
            }
            let metadata = json!({ "bank": &bank });

            let withdrawal = NewTransaction::new(user_id, TransactionKind::Withdrawal, amount)
                .status(TransactionStatus::Pending)
                .reference(reference.clone())
                .description("Withdrawal to bank account")
                .metadata(metadata.clone());
            let withdrawal = self.post(&db_tx, &mut wallet, withdrawal, &mut journal).await?;

            let mut fee_transaction = None;
            if fee > 0 {
                let new = NewTransaction::new(user_id, TransactionKind::WithdrawalFee, fee)
                    .status(TransactionStatus::Pending)
                    .reference(fee_reference(&reference))
                    .description("Withdrawal fee")
                    .metadata(metadata);
                fee_transaction = Some(self.post(&db_tx, &mut wallet, new, &mut journal).await?);
            }
            Ok((withdrawal, fee_transaction))
        })?;
        self.flush(journal);

        let transfer = TransferRequest {
            reference: reference.clone(),
            amount,
            bank,
            reason: "Campus wallet withdrawal".to_string(),
        };
        if let Err(err) = self.gateway.initiate_transfer(transfer).await {
            tracing::error!(reference, "transfer initiation failed: {err}");
            self.settle_withdrawal(&reference, false).await?;
            return Err(err);
        }

        Ok(WithdrawalReceipt {
            reference,
            amount,
            fee,
            withdrawal,
            fee_transaction,
        })
    }

    /// Settles the withdrawal `reference` and its fee row: `completed` on
    /// success, `failed` (funds restored) otherwise.
    ///
    /// Returns `false` when the rows were already final.
    pub(super) async fn settle_withdrawal(
        &self,
        reference: &str,
        success: bool,
    ) -> ResultEngine<bool> {
        let to = if success {
            TransactionStatus::Completed
        } else {
            TransactionStatus::Failed
        };

        let mut journal = Journal::default();
        let settled = with_tx!(self, |db_tx| {
            let (mut wallet, tx) = lock_by_reference(&db_tx, reference)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("withdrawal {reference}")))?;
            if tx.kind != TransactionKind::Withdrawal {
                return Err(EngineError::Validation(format!(
                    "{reference} is not a withdrawal"
                )));
            }
            if tx.status != TransactionStatus::Pending {
                tracing::info!(reference, status = tx.status.as_str(), "withdrawal already settled");
                Ok(false)
            } else {
                let user_id = tx.user_id.clone();
                let amount = tx.amount;
                self.transition(&db_tx, &mut wallet, tx, to, &mut journal).await?;
                if let Some(fee_tx) = find_by_reference(&db_tx, &fee_reference(reference)).await?
                    && fee_tx.status == TransactionStatus::Pending
                {
                    self.transition(&db_tx, &mut wallet, fee_tx, to, &mut journal)
                        .await?;
                }
                journal.withdrawal_settled(&user_id, amount, reference, success);
                Ok(true)
            }
        })?;
        self.flush(journal);
        Ok(settled)
    }
}
