use chrono::{DateTime, Utc};
use sea_orm::{
    Condition, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Transaction, TransactionKind, TransactionStatus, Wallet,
    transactions,
};

use super::{Engine, ledger::ensure_wallet, with_tx};

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;
const RECENT_TRANSACTIONS: u64 = 5;

/// Filters for [`Engine::transaction_history`]. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub order_id: Option<Uuid>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl TransactionFilter {
    fn condition(&self, wallet_id: Uuid) -> ResultEngine<Condition> {
        if let (Some(from), Some(to)) = (self.from, self.to)
            && from > to
        {
            return Err(EngineError::Validation(
                "`from` must not be after `to`".to_string(),
            ));
        }

        let mut condition =
            Condition::all().add(transactions::Column::WalletId.eq(wallet_id.to_string()));
        if let Some(kind) = self.kind {
            condition = condition.add(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(status) = self.status {
            condition = condition.add(transactions::Column::Status.eq(status.as_str()));
        }
        if let Some(from) = self.from {
            condition = condition.add(transactions::Column::CreatedAt.gte(from));
        }
        if let Some(to) = self.to {
            condition = condition.add(transactions::Column::CreatedAt.lte(to));
        }
        if let Some(order_id) = self.order_id {
            condition = condition.add(transactions::Column::OrderId.eq(order_id.to_string()));
        }
        Ok(condition)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WalletSummary {
    pub wallet: Wallet,
    pub transaction_count: u64,
    /// Withdrawals (and their fees) still awaiting the payout callback.
    pub pending_withdrawals: i64,
    pub recent_transactions: Vec<Transaction>,
}

impl Engine {
    pub async fn wallet_summary(&self, user_id: &str) -> ResultEngine<WalletSummary> {
        with_tx!(self, |db_tx| {
            let wallet = ensure_wallet(&db_tx, user_id).await?;
            let by_wallet = transactions::Column::WalletId.eq(wallet.id.to_string());

            let transaction_count = transactions::Entity::find()
                .filter(by_wallet.clone())
                .count(&db_tx)
                .await?;

            let pending_withdrawals: i64 = transactions::Entity::find()
                .filter(by_wallet.clone())
                .filter(transactions::Column::Status.eq(TransactionStatus::Pending.as_str()))
                .filter(transactions::Column::Kind.is_in([
                    TransactionKind::Withdrawal.as_str(),
                    TransactionKind::WithdrawalFee.as_str(),
                ]))
                .all(&db_tx)
                .await?
                .iter()
                .map(|m| m.amount)
                .sum();

            let recent_transactions = transactions::Entity::find()
                .filter(by_wallet)
                .order_by_desc(transactions::Column::CreatedAt)
                .order_by_desc(transactions::Column::Id)
                .limit(RECENT_TRANSACTIONS)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Transaction::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            Ok(WalletSummary {
                wallet,
                transaction_count,
                pending_withdrawals,
                recent_transactions,
            })
        })
    }

    /// Newest-first page of the wallet's transactions.
    pub async fn transaction_history(
        &self,
        user_id: &str,
        filter: TransactionFilter,
    ) -> ResultEngine<TransactionPage> {
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = filter.offset.unwrap_or(0);

        with_tx!(self, |db_tx| {
            let wallet = ensure_wallet(&db_tx, user_id).await?;
            let condition = filter.condition(wallet.id)?;

            let total = transactions::Entity::find()
                .filter(condition.clone())
                .count(&db_tx)
                .await?;
            let transactions = transactions::Entity::find()
                .filter(condition)
                .order_by_desc(transactions::Column::CreatedAt)
                .order_by_desc(transactions::Column::Id)
                .limit(limit)
                .offset(offset)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Transaction::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            Ok(TransactionPage {
                transactions,
                total,
                limit,
                offset,
            })
        })
    }
}
