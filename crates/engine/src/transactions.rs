//! Transaction primitives.
//!
//! A `Transaction` is the append-only record of one balance-affecting event on
//! one wallet. Only `status` and `metadata` ever change after insert, and the
//! effect of a row on its wallet is a pure function of `(kind, direction,
//! status, amount)`: see [`Transaction::effect`].

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Escrow,
    Release,
    Refund,
    Fee,
    WithdrawalFee,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Escrow => "escrow",
            Self::Release => "release",
            Self::Refund => "refund",
            Self::Fee => "fee",
            Self::WithdrawalFee => "withdrawal_fee",
        }
    }

    /// Directions a row of this kind may carry.
    fn allows(self, direction: Direction) -> bool {
        match self {
            Self::Deposit | Self::Refund => direction == Direction::Credit,
            Self::Withdrawal | Self::WithdrawalFee | Self::Release => {
                direction == Direction::Debit
            }
            Self::Escrow | Self::Fee => true,
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            "escrow" => Ok(Self::Escrow),
            "release" => Ok(Self::Release),
            "refund" => Ok(Self::Refund),
            "fee" => Ok(Self::Fee),
            "withdrawal_fee" => Ok(Self::WithdrawalFee),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// Which side of a money movement a row records.
///
/// Escrow and fees are recorded on both sides: the payer's `debit` and the
/// payee's `credit` (or, for fees, the reversal credited back on
/// cancellation).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl TryFrom<&str> for Direction {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            other => Err(EngineError::Validation(format!(
                "invalid transaction direction: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// `pending` is the only non-final status.
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        self == Self::Pending && next != Self::Pending
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::Validation(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

/// Signed change to a wallet's `(balance, pending_balance)`, in kobo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Effect {
    pub balance: i64,
    pub pending: i64,
}

impl Effect {
    pub const NONE: Effect = Effect {
        balance: 0,
        pending: 0,
    };

    const fn new(balance: i64, pending: i64) -> Self {
        Self { balance, pending }
    }

    /// Change needed to go from `self` to `other`.
    pub fn delta_to(self, other: Effect) -> Effect {
        Effect::new(other.balance - self.balance, other.pending - self.pending)
    }
}

impl core::ops::AddAssign for Effect {
    fn add_assign(&mut self, rhs: Effect) {
        self.balance += rhs.balance;
        self.pending += rhs.pending;
    }
}

/// Delta rule shared by the transaction engine and the reconciler.
pub fn effect_of(
    kind: TransactionKind,
    direction: Direction,
    status: TransactionStatus,
    amount: i64,
) -> Effect {
    use crate::transactions::Direction::{Credit, Debit};
    use crate::transactions::TransactionKind as K;
    use crate::transactions::TransactionStatus::{Cancelled, Completed, Failed, Pending};

    match (kind, direction, status) {
        (_, _, Failed | Cancelled) => Effect::NONE,
        (K::Deposit, _, Pending) => Effect::new(0, amount),
        (K::Deposit, _, Completed) => Effect::new(amount, 0),
        (K::Withdrawal | K::WithdrawalFee, _, _) => Effect::new(-amount, 0),
        (K::Fee, Debit, _) => Effect::new(-amount, 0),
        (K::Fee, Credit, Pending) => Effect::NONE,
        (K::Fee, Credit, Completed) => Effect::new(amount, 0),
        (K::Escrow, Debit, _) => Effect::new(-amount, amount),
        (K::Escrow, Credit, Pending) => Effect::new(0, amount),
        (K::Escrow, Credit, Completed) => Effect::new(amount, 0),
        (K::Release, _, Pending) => Effect::NONE,
        (K::Release, _, Completed) => Effect::new(0, -amount),
        (K::Refund, _, Pending) => Effect::NONE,
        (K::Refund, _, Completed) => Effect::new(amount, -amount),
    }
}

/// The escrow subject a transaction belongs to.
///
/// Orders and gigs are separate originating entities of the same escrow state
/// machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscrowSubject {
    Order(Uuid),
    Gig { gig_id: Uuid, bid_id: Uuid },
}

impl EscrowSubject {
    pub(crate) fn order_id(self) -> Option<Uuid> {
        match self {
            Self::Order(id) => Some(id),
            Self::Gig { .. } => None,
        }
    }

    pub(crate) fn gig_id(self) -> Option<Uuid> {
        match self {
            Self::Order(_) => None,
            Self::Gig { gig_id, .. } => Some(gig_id),
        }
    }

    pub(crate) fn bid_id(self) -> Option<Uuid> {
        match self {
            Self::Order(_) => None,
            Self::Gig { bid_id, .. } => Some(bid_id),
        }
    }
}

/// Input of [`Engine::apply_transaction`](crate::Engine::apply_transaction).
#[derive(Clone, Debug, PartialEq)]
pub struct NewTransaction {
    pub user_id: String,
    pub kind: TransactionKind,
    pub direction: Direction,
    pub amount: i64,
    pub fee: i64,
    pub status: TransactionStatus,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub subject: Option<EscrowSubject>,
    pub metadata: Option<serde_json::Value>,
}

impl NewTransaction {
    /// A completed row with the default direction for `kind`.
    pub fn new(user_id: &str, kind: TransactionKind, amount: i64) -> Self {
        let direction = match kind {
            TransactionKind::Deposit | TransactionKind::Refund => Direction::Credit,
            _ => Direction::Debit,
        };
        Self {
            user_id: user_id.to_string(),
            kind,
            direction,
            amount,
            fee: 0,
            status: TransactionStatus::Completed,
            reference: None,
            description: None,
            subject: None,
            metadata: None,
        }
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn subject(mut self, subject: EscrowSubject) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub(crate) fn validate(&self) -> ResultEngine<()> {
        if self.user_id.trim().is_empty() {
            return Err(EngineError::Validation("user_id is required".to_string()));
        }
        if self.amount <= 0 {
            return Err(EngineError::Validation("amount must be > 0".to_string()));
        }
        if self.fee < 0 {
            return Err(EngineError::Validation("fee must be >= 0".to_string()));
        }
        if !self.kind.allows(self.direction) {
            return Err(EngineError::Validation(format!(
                "{} cannot be a {} transaction",
                self.kind.as_str(),
                self.direction.as_str()
            )));
        }
        if let Some(reference) = &self.reference
            && reference.trim().is_empty()
        {
            return Err(EngineError::Validation(
                "reference must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub user_id: String,
    pub kind: TransactionKind,
    pub direction: Direction,
    pub amount: i64,
    pub fee: i64,
    pub status: TransactionStatus,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub order_id: Option<Uuid>,
    pub gig_id: Option<Uuid>,
    pub bid_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub(crate) fn from_new(
        wallet_id: Uuid,
        new: NewTransaction,
        now: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        new.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            wallet_id,
            user_id: new.user_id,
            kind: new.kind,
            direction: new.direction,
            amount: new.amount,
            fee: new.fee,
            status: new.status,
            reference: new.reference,
            description: new.description,
            order_id: new.subject.and_then(EscrowSubject::order_id),
            gig_id: new.subject.and_then(EscrowSubject::gig_id),
            bid_id: new.subject.and_then(EscrowSubject::bid_id),
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        })
    }

    /// Effect of this row, in its current status, on its wallet.
    pub fn effect(&self) -> Effect {
        effect_of(self.kind, self.direction, self.status, self.amount)
    }

    /// Effect of this row if it were moved to `status`.
    pub fn effect_with(&self, status: TransactionStatus) -> Effect {
        effect_of(self.kind, self.direction, status, self.amount)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub wallet_id: String,
    pub user_id: String,
    pub kind: String,
    pub direction: String,
    pub amount: i64,
    pub fee: i64,
    pub status: String,
    #[sea_orm(unique)]
    pub reference: Option<String>,
    pub description: Option<String>,
    pub order_id: Option<String>,
    pub gig_id: Option<String>,
    pub bid_id: Option<String>,
    pub metadata: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::WalletId",
        to = "super::wallets::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Wallets,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            wallet_id: ActiveValue::Set(tx.wallet_id.to_string()),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            direction: ActiveValue::Set(tx.direction.as_str().to_string()),
            amount: ActiveValue::Set(tx.amount),
            fee: ActiveValue::Set(tx.fee),
            status: ActiveValue::Set(tx.status.as_str().to_string()),
            reference: ActiveValue::Set(tx.reference.clone()),
            description: ActiveValue::Set(tx.description.clone()),
            order_id: ActiveValue::Set(tx.order_id.map(|id| id.to_string())),
            gig_id: ActiveValue::Set(tx.gig_id.map(|id| id.to_string())),
            bid_id: ActiveValue::Set(tx.bid_id.map(|id| id.to_string())),
            metadata: ActiveValue::Set(tx.metadata.as_ref().map(|m| m.to_string())),
            created_at: ActiveValue::Set(tx.created_at),
            updated_at: ActiveValue::Set(tx.updated_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let optional_uuid = |value: Option<String>, label: &str| -> ResultEngine<Option<Uuid>> {
            value.as_deref().map(|v| parse_uuid(v, label)).transpose()
        };
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            wallet_id: parse_uuid(&model.wallet_id, "wallet")?,
            user_id: model.user_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            direction: Direction::try_from(model.direction.as_str())?,
            amount: model.amount,
            fee: model.fee,
            status: TransactionStatus::try_from(model.status.as_str())?,
            reference: model.reference,
            description: model.description,
            order_id: optional_uuid(model.order_id, "order")?,
            gig_id: optional_uuid(model.gig_id, "gig")?,
            bid_id: optional_uuid(model.bid_id, "bid")?,
            metadata: model
                .metadata
                .as_deref()
                .map(serde_json::from_str::<serde_json::Value>)
                .transpose()
                .map_err(|err| {
                    EngineError::Validation(format!("invalid transaction metadata: {err}"))
                })?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use super::Direction::{Credit, Debit};
    use super::TransactionKind as K;
    use super::TransactionStatus::{Cancelled, Completed, Failed, Pending};

    #[test]
    fn deposit_moves_from_pending_to_balance_on_completion() {
        let pending = effect_of(K::Deposit, Credit, Pending, 500);
        let completed = effect_of(K::Deposit, Credit, Completed, 500);
        assert_eq!(pending, Effect { balance: 0, pending: 500 });
        assert_eq!(completed, Effect { balance: 500, pending: 0 });
        assert_eq!(
            pending.delta_to(completed),
            Effect { balance: 500, pending: -500 }
        );
    }

    #[test]
    fn debits_reduce_spendable_balance() {
        for kind in [K::Withdrawal, K::WithdrawalFee, K::Fee] {
            assert_eq!(
                effect_of(kind, Debit, Completed, 70),
                Effect { balance: -70, pending: 0 }
            );
        }
    }

    #[test]
    fn escrow_sides_mirror_each_other() {
        assert_eq!(
            effect_of(K::Escrow, Debit, Completed, 100),
            Effect { balance: -100, pending: 100 }
        );
        assert_eq!(
            effect_of(K::Escrow, Credit, Pending, 100),
            Effect { balance: 0, pending: 100 }
        );
        assert_eq!(
            effect_of(K::Escrow, Credit, Completed, 100),
            Effect { balance: 100, pending: 0 }
        );
    }

    #[test]
    fn release_and_refund_drain_pending() {
        assert_eq!(
            effect_of(K::Release, Debit, Completed, 40),
            Effect { balance: 0, pending: -40 }
        );
        assert_eq!(
            effect_of(K::Refund, Credit, Completed, 40),
            Effect { balance: 40, pending: -40 }
        );
    }

    #[test]
    fn failed_and_cancelled_rows_have_no_effect() {
        for status in [Failed, Cancelled] {
            assert_eq!(effect_of(K::Withdrawal, Debit, status, 10), Effect::NONE);
            assert_eq!(effect_of(K::Escrow, Credit, status, 10), Effect::NONE);
        }
    }

    #[test]
    fn only_pending_rows_transition() {
        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Failed.can_transition_to(Completed));
    }

    #[test]
    fn direction_must_match_kind() {
        let bad = NewTransaction::new("u1", K::Withdrawal, 10).direction(Credit);
        assert!(bad.validate().is_err());
        let zero = NewTransaction::new("u1", K::Deposit, 0);
        assert!(zero.validate().is_err());
        let ok = NewTransaction::new("u1", K::Escrow, 10).direction(Credit);
        assert!(ok.validate().is_ok());
    }

    fn stored(metadata: Option<&str>) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4().to_string(),
            wallet_id: Uuid::new_v4().to_string(),
            user_id: "u1".to_string(),
            kind: "withdrawal".to_string(),
            direction: "debit".to_string(),
            amount: 100_000,
            fee: 0,
            status: "pending".to_string(),
            reference: Some("WD-1".to_string()),
            description: None,
            order_id: None,
            gig_id: None,
            bid_id: None,
            metadata: metadata.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn stored_metadata_is_decoded() {
        let tx = Transaction::try_from(stored(Some(r#"{"bank":{"bank_code":"058"}}"#))).unwrap();
        assert_eq!(tx.metadata.unwrap()["bank"]["bank_code"], "058");
        assert!(Transaction::try_from(stored(None)).unwrap().metadata.is_none());
    }

    #[test]
    fn corrupt_metadata_is_an_error() {
        let err = Transaction::try_from(stored(Some("{not json"))).unwrap_err();
        assert!(matches!(err, EngineError::Validation(msg) if msg.starts_with("invalid transaction metadata")));
    }
}
