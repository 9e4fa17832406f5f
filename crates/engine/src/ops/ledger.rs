//! The single choke point for balance mutation.
//!
//! Every change to a wallet's `balance` or `pending_balance` goes through
//! [`Engine::post`] (insert a new row) or [`Engine::transition`] (move a
//! pending row to its final status), both running inside a unit that holds
//! the wallet's row lock.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, QuerySelect,
    TransactionTrait, prelude::*, sea_query::OnConflict,
};
use uuid::Uuid;

use crate::{
    AuditEvent, Direction, EngineError, NewTransaction, ResultEngine, Transaction,
    TransactionKind, TransactionStatus, Wallet, transactions, util::require_user_id, wallets,
};

use super::{Engine, Journal, with_tx};

impl Engine {
    /// Applies one transaction to `wallet_id` as a single atomic unit and
    /// returns the stored row.
    ///
    /// The wallet row is locked for the whole unit. The new row is inserted
    /// before the wallet is written back, and both commit together.
    pub async fn apply_transaction(
        &self,
        wallet_id: Uuid,
        new: NewTransaction,
    ) -> ResultEngine<Transaction> {
        new.validate()?;
        let mut journal = Journal::default();
        let tx = with_tx!(self, |db_tx| {
            let mut wallet = lock_wallet_by_id(&db_tx, wallet_id).await?;
            if wallet.user_id != new.user_id {
                return Err(EngineError::Unauthorized(
                    "wallet belongs to another user".to_string(),
                ));
            }
            self.post(&db_tx, &mut wallet, new, &mut journal).await
        })?;
        self.flush(journal);
        Ok(tx)
    }

    /// Inserts `new` against the locked `wallet` and writes the wallet back.
    pub(super) async fn post(
        &self,
        db_tx: &DatabaseTransaction,
        wallet: &mut Wallet,
        new: NewTransaction,
        journal: &mut Journal,
    ) -> ResultEngine<Transaction> {
        let now = Utc::now();
        let tx = Transaction::from_new(wallet.id, new, now)?;
        if let Some(reference) = tx.reference.as_deref()
            && find_by_reference(db_tx, reference).await?.is_some()
        {
            return Err(EngineError::Validation(format!(
                "duplicate reference: {reference}"
            )));
        }

        wallet.apply(tx.effect(), tx.amount)?;
        if tx.status == TransactionStatus::Completed {
            bump_counters(wallet, &tx);
        }
        wallet.last_transaction_at = Some(now);

        transactions::ActiveModel::from(&tx).insert(db_tx).await?;
        save_wallet(db_tx, wallet).await?;

        tracing::info!(
            transaction_id = %tx.id,
            wallet_id = %wallet.id,
            kind = tx.kind.as_str(),
            direction = tx.direction.as_str(),
            status = tx.status.as_str(),
            amount = tx.amount,
            "transaction applied"
        );
        journal.audit(AuditEvent::TransactionApplied {
            transaction_id: tx.id,
            wallet_id: wallet.id,
            user_id: wallet.user_id.clone(),
            kind: tx.kind,
            direction: tx.direction,
            status: tx.status,
            amount: tx.amount,
            balance: wallet.balance,
            pending_balance: wallet.pending_balance,
        });
        Ok(tx)
    }

    /// Moves a pending row to `to`, applying the difference between its old
    /// and new effect to the locked `wallet`.
    pub(super) async fn transition(
        &self,
        db_tx: &DatabaseTransaction,
        wallet: &mut Wallet,
        mut tx: Transaction,
        to: TransactionStatus,
        journal: &mut Journal,
    ) -> ResultEngine<Transaction> {
        if tx.wallet_id != wallet.id {
            return Err(EngineError::Validation(
                "transaction belongs to another wallet".to_string(),
            ));
        }
        let from = tx.status;
        if !from.can_transition_to(to) {
            return Err(EngineError::InvalidStateTransition(format!(
                "transaction {} is {} and cannot become {}",
                tx.id,
                from.as_str(),
                to.as_str()
            )));
        }

        let now = Utc::now();
        wallet.apply(tx.effect().delta_to(tx.effect_with(to)), tx.amount)?;
        tx.status = to;
        tx.updated_at = now;
        if to == TransactionStatus::Completed {
            bump_counters(wallet, &tx);
        }
        wallet.last_transaction_at = Some(now);

        transactions::ActiveModel {
            id: ActiveValue::Set(tx.id.to_string()),
            status: ActiveValue::Set(to.as_str().to_string()),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        }
        .update(db_tx)
        .await?;
        save_wallet(db_tx, wallet).await?;

        tracing::info!(
            transaction_id = %tx.id,
            wallet_id = %wallet.id,
            from = from.as_str(),
            to = to.as_str(),
            "transaction status changed"
        );
        journal.audit(AuditEvent::StatusChanged {
            transaction_id: tx.id,
            wallet_id: wallet.id,
            kind: tx.kind,
            from,
            to,
            amount: tx.amount,
            balance: wallet.balance,
            pending_balance: wallet.pending_balance,
        });
        Ok(tx)
    }

    /// Wallet of `user_id`, created on first use.
    pub async fn get_wallet(&self, user_id: &str) -> ResultEngine<Wallet> {
        with_tx!(self, |db_tx| ensure_wallet(&db_tx, user_id).await)
    }
}

/// Lifetime counters only ever grow.
fn bump_counters(wallet: &mut Wallet, tx: &Transaction) {
    match (tx.kind, tx.direction) {
        (TransactionKind::Escrow | TransactionKind::Fee, Direction::Debit) => {
            wallet.total_spent = wallet.total_spent.saturating_add(tx.amount);
        }
        (TransactionKind::Escrow, Direction::Credit) => {
            wallet.total_earned = wallet.total_earned.saturating_add(tx.amount);
        }
        _ => {}
    }
}

async fn save_wallet(db_tx: &DatabaseTransaction, wallet: &Wallet) -> ResultEngine<()> {
    wallets::ActiveModel::from(wallet).update(db_tx).await?;
    Ok(())
}

pub(super) async fn find_wallet<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> ResultEngine<Option<Wallet>> {
    wallets::Entity::find()
        .filter(wallets::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .map(Wallet::try_from)
        .transpose()
}

/// Returns the wallet of `user_id`, inserting an empty one if absent.
///
/// Concurrent first calls race on the unique `user_id`; the loser's insert is
/// a no-op and both read the same row.
pub(super) async fn ensure_wallet<C: ConnectionTrait>(db: &C, user_id: &str) -> ResultEngine<Wallet> {
    require_user_id(user_id)?;
    if let Some(wallet) = find_wallet(db, user_id).await? {
        return Ok(wallet);
    }

    let wallet = Wallet::new(user_id, Utc::now());
    let inserted = wallets::Entity::insert(wallets::ActiveModel::from(&wallet))
        .on_conflict(
            OnConflict::column(wallets::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    if inserted > 0 {
        tracing::info!(user_id, wallet_id = %wallet.id, "wallet created");
    }

    find_wallet(db, user_id)
        .await?
        .ok_or_else(|| EngineError::NotFound("wallet".to_string()))
}

async fn lock_wallet_by_id(db_tx: &DatabaseTransaction, wallet_id: Uuid) -> ResultEngine<Wallet> {
    let model = wallets::Entity::find_by_id(wallet_id.to_string())
        .lock_exclusive()
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::NotFound("wallet".to_string()))?;
    Wallet::try_from(model)
}

/// Locks the wallet of `user_id` for the rest of the unit, creating it first
/// if needed.
pub(super) async fn lock_wallet(db_tx: &DatabaseTransaction, user_id: &str) -> ResultEngine<Wallet> {
    let wallet = ensure_wallet(db_tx, user_id).await?;
    lock_wallet_by_id(db_tx, wallet.id).await
}

/// Locks every wallet in `wallets` in ascending wallet id order and returns
/// them keyed by user id.
///
/// A fixed acquisition order keeps two units touching overlapping wallets
/// from deadlocking.
pub(super) async fn lock_in_order(
    db_tx: &DatabaseTransaction,
    wallets: Vec<Wallet>,
) -> ResultEngine<HashMap<String, Wallet>> {
    let mut ids: Vec<Uuid> = wallets.iter().map(|w| w.id).collect();
    ids.sort();
    ids.dedup();

    let mut locked = HashMap::with_capacity(ids.len());
    for id in ids {
        let wallet = lock_wallet_by_id(db_tx, id).await?;
        locked.insert(wallet.user_id.clone(), wallet);
    }
    Ok(locked)
}

/// Locks the wallets of a payer and a payee, creating them if needed.
pub(super) async fn lock_pair(
    db_tx: &DatabaseTransaction,
    payer_id: &str,
    payee_id: &str,
) -> ResultEngine<(Wallet, Wallet)> {
    let payer = ensure_wallet(db_tx, payer_id).await?;
    let payee = ensure_wallet(db_tx, payee_id).await?;
    let mut locked = lock_in_order(db_tx, vec![payer, payee]).await?;
    Ok((
        take_wallet(&mut locked, payer_id)?,
        take_wallet(&mut locked, payee_id)?,
    ))
}

/// Removes `user_id`'s wallet from a [`lock_in_order`] result.
pub(super) fn take_wallet(
    locked: &mut HashMap<String, Wallet>,
    user_id: &str,
) -> ResultEngine<Wallet> {
    locked
        .remove(user_id)
        .ok_or_else(|| EngineError::NotFound(format!("wallet of {user_id}")))
}

pub(super) async fn find_by_reference<C: ConnectionTrait>(
    db: &C,
    reference: &str,
) -> ResultEngine<Option<Transaction>> {
    transactions::Entity::find()
        .filter(transactions::Column::Reference.eq(reference))
        .one(db)
        .await?
        .map(Transaction::try_from)
        .transpose()
}

/// Re-reads a transaction by reference once its wallet is locked, so the
/// status seen is the one the unit will change.
pub(super) async fn lock_by_reference(
    db_tx: &DatabaseTransaction,
    reference: &str,
) -> ResultEngine<Option<(Wallet, Transaction)>> {
    let Some(found) = find_by_reference(db_tx, reference).await? else {
        return Ok(None);
    };
    let wallet = lock_wallet_by_id(db_tx, found.wallet_id).await?;
    let tx = find_by_reference(db_tx, reference)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("transaction {reference}")))?;
    Ok(Some((wallet, tx)))
}
