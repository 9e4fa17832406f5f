//! Gig escrow: the client pays the accepted bid into escrow for the
//! freelancer, through the same hold/release/refund steps as product orders.

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QuerySelect, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Bid, BidStatus, EngineError, EscrowStatus, EscrowSubject, Gig, GigStatus, Principal,
    ResultEngine, bids, calculate_fee, gigs,
};

use super::{
    Engine, Journal,
    ledger::lock_pair,
    with_tx,
};

impl Engine {
    /// Accepts `bid_id` on behalf of the gig's client and escrows the bid
    /// amount plus the platform fee.
    pub async fn accept_bid(&self, principal: &Principal, bid_id: Uuid) -> ResultEngine<Gig> {
        let mut journal = Journal::default();
        let gig = with_tx!(self, |db_tx| {
            let bid = load_bid(&db_tx, bid_id).await?;
            let mut gig = lock_gig(&db_tx, bid.gig_id).await?;
            if gig.client_id != principal.user_id {
                return Err(EngineError::Unauthorized(
                    "only the gig owner can accept bids".to_string(),
                ));
            }
            if bid.status != BidStatus::Pending {
                return Err(EngineError::InvalidStateTransition(format!(
                    "bid is {}",
                    bid.status.as_str()
                )));
            }
            if gig.status != GigStatus::Open {
                return Err(EngineError::InvalidStateTransition(format!(
                    "gig is {}",
                    gig.status.as_str()
                )));
            }
            if bid.freelancer_id == gig.client_id {
                return Err(EngineError::Validation(
                    "cannot accept your own bid".to_string(),
                ));
            }

            let fee = calculate_fee(bid.amount, principal.campus.as_deref(), &self.config.fees);
            let (mut client, mut freelancer) =
                lock_pair(&db_tx, &gig.client_id, &bid.freelancer_id).await?;

            let required = bid
                .amount
                .checked_add(fee)
                .ok_or_else(|| EngineError::Validation("amount too large".to_string()))?;
            if client.balance < required {
                return Err(EngineError::insufficient(required, client.balance));
            }
            self.hold(
                &db_tx,
                EscrowSubject::Gig {
                    gig_id: gig.id,
                    bid_id: bid.id,
                },
                &mut client,
                &mut freelancer,
                bid.amount,
                fee,
                &mut journal,
            )
            .await?;

            set_bid_status(&db_tx, bid.id, BidStatus::Accepted).await?;
            bids::Entity::update_many()
                .col_expr(bids::Column::Status, Expr::value(BidStatus::Rejected.as_str()))
                .filter(bids::Column::GigId.eq(gig.id.to_string()))
                .filter(bids::Column::Status.eq(BidStatus::Pending.as_str()))
                .exec(&db_tx)
                .await?;

            gig.status = GigStatus::InProgress;
            gig.freelancer_id = Some(bid.freelancer_id.clone());
            gig.accepted_bid_id = Some(bid.id);
            gig.agreed_amount = Some(bid.amount);
            gig.platform_fee = fee;
            gig.escrow_status = EscrowStatus::InEscrow;
            save_gig(&db_tx, &mut gig).await?;
            tracing::info!(gig_id = %gig.id, bid_id = %bid.id, amount = bid.amount, fee, "bid accepted");
            Ok(gig)
        })?;
        self.flush(journal);
        Ok(gig)
    }

    /// Releases the escrow to the freelancer. Client or admin only.
    pub async fn complete_gig(&self, principal: &Principal, gig_id: Uuid) -> ResultEngine<Gig> {
        let mut journal = Journal::default();
        let gig = with_tx!(self, |db_tx| {
            let mut gig = lock_gig(&db_tx, gig_id).await?;
            if gig.client_id != principal.user_id && !principal.is_admin() {
                return Err(EngineError::Unauthorized(
                    "only the client can complete a gig".to_string(),
                ));
            }
            let (subject, freelancer_id) = escrowed(&gig)?;

            let (mut client, mut freelancer) =
                lock_pair(&db_tx, &gig.client_id, &freelancer_id).await?;
            self.release(&db_tx, subject, &mut client, &mut freelancer, &mut journal)
                .await?;

            gig.status = GigStatus::Completed;
            gig.escrow_status = EscrowStatus::Released;
            save_gig(&db_tx, &mut gig).await?;
            tracing::info!(gig_id = %gig.id, "gig completed");
            Ok(gig)
        })?;
        self.flush(journal);
        Ok(gig)
    }

    /// Cancels a gig.
    ///
    /// An open gig is simply closed and its pending bids rejected. A gig in
    /// progress refunds the client the agreed amount and the fee; the client,
    /// the freelancer or an admin may do this.
    pub async fn cancel_gig(&self, principal: &Principal, gig_id: Uuid) -> ResultEngine<Gig> {
        let mut journal = Journal::default();
        let gig = with_tx!(self, |db_tx| {
            let mut gig = lock_gig(&db_tx, gig_id).await?;
            let is_client = gig.client_id == principal.user_id;
            let is_freelancer = gig.freelancer_id.as_deref() == Some(principal.user_id.as_str());
            if !is_client && !is_freelancer && !principal.is_admin() {
                return Err(EngineError::Unauthorized(
                    "not a party to this gig".to_string(),
                ));
            }

            if gig.status == GigStatus::Open {
                bids::Entity::update_many()
                    .col_expr(bids::Column::Status, Expr::value(BidStatus::Rejected.as_str()))
                    .filter(bids::Column::GigId.eq(gig.id.to_string()))
                    .filter(bids::Column::Status.eq(BidStatus::Pending.as_str()))
                    .exec(&db_tx)
                    .await?;
            } else {
                let (subject, freelancer_id) = escrowed(&gig)?;
                let (mut client, mut freelancer) =
                    lock_pair(&db_tx, &gig.client_id, &freelancer_id).await?;
                self.refund(
                    &db_tx,
                    subject,
                    &mut client,
                    &mut freelancer,
                    gig.platform_fee,
                    &mut journal,
                )
                .await?;
                if let Some(bid_id) = gig.accepted_bid_id {
                    set_bid_status(&db_tx, bid_id, BidStatus::Withdrawn).await?;
                }
                gig.escrow_status = EscrowStatus::Refunded;
            }

            gig.status = GigStatus::Cancelled;
            save_gig(&db_tx, &mut gig).await?;
            tracing::info!(gig_id = %gig.id, "gig cancelled");
            Ok(gig)
        })?;
        self.flush(journal);
        Ok(gig)
    }
}

/// Escrow subject and freelancer of a gig whose funds are held.
fn escrowed(gig: &Gig) -> ResultEngine<(EscrowSubject, String)> {
    match (gig.status, gig.escrow_status, gig.accepted_bid_id, &gig.freelancer_id) {
        (GigStatus::InProgress, EscrowStatus::InEscrow, Some(bid_id), Some(freelancer)) => Ok((
            EscrowSubject::Gig {
                gig_id: gig.id,
                bid_id,
            },
            freelancer.clone(),
        )),
        _ => Err(EngineError::InvalidStateTransition(format!(
            "gig is {} with escrow {}",
            gig.status.as_str(),
            gig.escrow_status.as_str()
        ))),
    }
}

async fn load_bid(db_tx: &DatabaseTransaction, bid_id: Uuid) -> ResultEngine<Bid> {
    let model = bids::Entity::find_by_id(bid_id.to_string())
        .lock_exclusive()
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("bid {bid_id}")))?;
    Bid::try_from(model)
}

async fn lock_gig(db_tx: &DatabaseTransaction, gig_id: Uuid) -> ResultEngine<Gig> {
    let model = gigs::Entity::find_by_id(gig_id.to_string())
        .lock_exclusive()
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("gig {gig_id}")))?;
    Gig::try_from(model)
}

async fn set_bid_status(
    db_tx: &DatabaseTransaction,
    bid_id: Uuid,
    status: BidStatus,
) -> ResultEngine<()> {
    bids::ActiveModel {
        id: ActiveValue::Set(bid_id.to_string()),
        status: ActiveValue::Set(status.as_str().to_string()),
        ..Default::default()
    }
    .update(db_tx)
    .await?;
    Ok(())
}

async fn save_gig(db_tx: &DatabaseTransaction, gig: &mut Gig) -> ResultEngine<()> {
    gig.updated_at = Utc::now();
    gigs::ActiveModel::from(&*gig).update(db_tx).await?;
    Ok(())
}
