//! Escrow primitives shared by product orders and gigs.
//!
//! Holding debits the payer's spendable balance (plus the platform fee) and
//! mirrors the held amount as a `pending` escrow credit on the payee. Release
//! drains the payer's held amount and completes the payee's credit. Refund
//! returns the held amount and the fee to the payer and cancels the payee's
//! credit. Callers hold the locks of both wallets.

use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};

use crate::{
    Direction, EngineError, EscrowSubject, NewTransaction, ResultEngine, Transaction,
    TransactionKind, TransactionStatus, Wallet, transactions,
};

use super::{Engine, Journal};

fn describe(subject: EscrowSubject) -> String {
    match subject {
        EscrowSubject::Order(id) => format!("order {id}"),
        EscrowSubject::Gig { gig_id, .. } => format!("gig {gig_id}"),
    }
}

impl Engine {
    pub(super) async fn hold(
        &self,
        db_tx: &DatabaseTransaction,
        subject: EscrowSubject,
        payer: &mut Wallet,
        payee: &mut Wallet,
        amount: i64,
        fee: i64,
        journal: &mut Journal,
    ) -> ResultEngine<()> {
        let label = describe(subject);

        let escrow = NewTransaction::new(&payer.user_id, TransactionKind::Escrow, amount)
            .direction(Direction::Debit)
            .subject(subject)
            .description(format!("Escrow payment for {label}"));
        self.post(db_tx, payer, escrow, journal).await?;

        if fee > 0 {
            let fee_row = NewTransaction::new(&payer.user_id, TransactionKind::Fee, fee)
                .direction(Direction::Debit)
                .subject(subject)
                .description(format!("Platform fee for {label}"));
            self.post(db_tx, payer, fee_row, journal).await?;
        }

        let mirror = NewTransaction::new(&payee.user_id, TransactionKind::Escrow, amount)
            .direction(Direction::Credit)
            .status(TransactionStatus::Pending)
            .subject(subject)
            .description(format!("Escrow held for {label}"));
        self.post(db_tx, payee, mirror, journal).await?;
        Ok(())
    }

    pub(super) async fn release(
        &self,
        db_tx: &DatabaseTransaction,
        subject: EscrowSubject,
        payer: &mut Wallet,
        payee: &mut Wallet,
        journal: &mut Journal,
    ) -> ResultEngine<()> {
        let held = held_credit(db_tx, subject, payee).await?;
        let release = NewTransaction::new(&payer.user_id, TransactionKind::Release, held.amount)
            .subject(subject)
            .description(format!("Escrow released for {}", describe(subject)));
        self.post(db_tx, payer, release, journal).await?;
        self.transition(db_tx, payee, held, TransactionStatus::Completed, journal)
            .await?;
        Ok(())
    }

    pub(super) async fn refund(
        &self,
        db_tx: &DatabaseTransaction,
        subject: EscrowSubject,
        payer: &mut Wallet,
        payee: &mut Wallet,
        fee: i64,
        journal: &mut Journal,
    ) -> ResultEngine<()> {
        let label = describe(subject);
        let held = held_credit(db_tx, subject, payee).await?;

        let refund = NewTransaction::new(&payer.user_id, TransactionKind::Refund, held.amount)
            .subject(subject)
            .description(format!("Refund for {label}"));
        self.post(db_tx, payer, refund, journal).await?;

        if fee > 0 {
            let reversal = NewTransaction::new(&payer.user_id, TransactionKind::Fee, fee)
                .direction(Direction::Credit)
                .subject(subject)
                .description(format!("Platform fee refunded for {label}"));
            self.post(db_tx, payer, reversal, journal).await?;
        }

        self.transition(db_tx, payee, held, TransactionStatus::Cancelled, journal)
            .await?;
        Ok(())
    }
}

/// The payee's pending escrow credit for `subject`.
async fn held_credit(
    db_tx: &DatabaseTransaction,
    subject: EscrowSubject,
    payee: &Wallet,
) -> ResultEngine<Transaction> {
    let query = transactions::Entity::find()
        .filter(transactions::Column::WalletId.eq(payee.id.to_string()))
        .filter(transactions::Column::Kind.eq(TransactionKind::Escrow.as_str()))
        .filter(transactions::Column::Direction.eq(Direction::Credit.as_str()))
        .filter(transactions::Column::Status.eq(TransactionStatus::Pending.as_str()));
    let query = match subject {
        EscrowSubject::Order(id) => query.filter(transactions::Column::OrderId.eq(id.to_string())),
        EscrowSubject::Gig { gig_id, .. } => {
            query.filter(transactions::Column::GigId.eq(gig_id.to_string()))
        }
    };
    let model = query.one(db_tx).await?.ok_or_else(|| {
        EngineError::InvalidStateTransition(format!(
            "no funds held in escrow for {}",
            describe(subject)
        ))
    })?;
    Transaction::try_from(model)
}
