//! Gig escrow endpoints.

use api_types::gig::{EscrowStatus as ApiEscrow, GigStatus as ApiStatus, GigView};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::{EscrowStatus, Gig, GigStatus, Principal};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn gig_view(gig: Gig) -> GigView {
    GigView {
        id: gig.id,
        client_id: gig.client_id,
        title: gig.title,
        budget_minor: gig.budget,
        status: match gig.status {
            GigStatus::Open => ApiStatus::Open,
            GigStatus::InProgress => ApiStatus::InProgress,
            GigStatus::Completed => ApiStatus::Completed,
            GigStatus::Cancelled => ApiStatus::Cancelled,
        },
        freelancer_id: gig.freelancer_id,
        accepted_bid_id: gig.accepted_bid_id,
        agreed_amount_minor: gig.agreed_amount,
        platform_fee_minor: gig.platform_fee,
        escrow_status: match gig.escrow_status {
            EscrowStatus::None => ApiEscrow::None,
            EscrowStatus::InEscrow => ApiEscrow::InEscrow,
            EscrowStatus::Released => ApiEscrow::Released,
            EscrowStatus::Refunded => ApiEscrow::Refunded,
        },
        updated_at: gig.updated_at,
    }
}

pub async fn accept_bid(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GigView>, ServerError> {
    let gig = state.engine.accept_bid(&principal, id).await?;
    Ok(Json(gig_view(gig)))
}

pub async fn complete(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GigView>, ServerError> {
    let gig = state.engine.complete_gig(&principal, id).await?;
    Ok(Json(gig_view(gig)))
}

pub async fn cancel(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GigView>, ServerError> {
    let gig = state.engine.cancel_gig(&principal, id).await?;
    Ok(Json(gig_view(gig)))
}
