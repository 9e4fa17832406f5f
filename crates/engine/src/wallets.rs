//! The module contains `Wallet` struct and its storage model.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, money::CURRENCY_CODE, transactions::Effect, util::parse_uuid};

/// A user's wallet.
///
/// One per user, created lazily on the first wallet-touching action. Holds the
/// spendable `balance` and the `pending_balance` sitting in escrow or awaiting
/// gateway confirmation. Both are derived state: replaying the wallet's
/// transactions must reproduce them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: String,
    pub balance: i64,
    pub pending_balance: i64,
    pub total_earned: i64,
    pub total_spent: i64,
    pub currency: String,
    pub last_transaction_at: Option<DateTime<Utc>>,
    pub last_balance_verification: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            balance: 0,
            pending_balance: 0,
            total_earned: 0,
            total_spent: 0,
            currency: CURRENCY_CODE.to_string(),
            last_transaction_at: None,
            last_balance_verification: None,
            created_at: now,
        }
    }

    /// Applies `effect`, rejecting it when either balance would go negative.
    ///
    /// `required` is the amount reported as needed when the spendable balance
    /// falls short.
    pub(crate) fn apply(&mut self, effect: Effect, required: i64) -> ResultEngine<()> {
        let too_large = || EngineError::Validation("amount too large".to_string());
        let balance = self
            .balance
            .checked_add(effect.balance)
            .ok_or_else(too_large)?;
        let pending = self
            .pending_balance
            .checked_add(effect.pending)
            .ok_or_else(too_large)?;
        if balance < 0 {
            return Err(EngineError::insufficient(required, self.balance));
        }
        if pending < 0 {
            return Err(EngineError::insufficient(
                -effect.pending,
                self.pending_balance,
            ));
        }
        self.balance = balance;
        self.pending_balance = pending;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub user_id: String,
    pub balance: i64,
    pub pending_balance: i64,
    pub total_earned: i64,
    pub total_spent: i64,
    pub currency: String,
    pub last_transaction_at: Option<DateTimeUtc>,
    pub last_balance_verification: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Wallet> for ActiveModel {
    fn from(value: &Wallet) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            user_id: ActiveValue::Set(value.user_id.clone()),
            balance: ActiveValue::Set(value.balance),
            pending_balance: ActiveValue::Set(value.pending_balance),
            total_earned: ActiveValue::Set(value.total_earned),
            total_spent: ActiveValue::Set(value.total_spent),
            currency: ActiveValue::Set(value.currency.clone()),
            last_transaction_at: ActiveValue::Set(value.last_transaction_at),
            last_balance_verification: ActiveValue::Set(value.last_balance_verification),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Wallet {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "wallet")?,
            user_id: model.user_id,
            balance: model.balance,
            pending_balance: model.pending_balance,
            total_earned: model.total_earned,
            total_spent: model.total_spent,
            currency: model.currency,
            last_transaction_at: model.last_transaction_at,
            last_balance_verification: model.last_balance_verification,
            created_at: model.created_at,
        })
    }
}
