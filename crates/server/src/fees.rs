//! Fee preview endpoint.

use api_types::fees::{FeeQuote, FeeQuoteQuery};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use engine::Principal;

use crate::{ServerError, server::ServerState};

/// Quotes the platform fee for an amount. The campus defaults to the
/// caller's.
pub async fn quote(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Query(query): Query<FeeQuoteQuery>,
) -> Result<Json<FeeQuote>, ServerError> {
    let campus = query.campus.or(principal.campus);
    let quote = state
        .engine
        .quote_fee(query.amount_minor, campus.as_deref())?;

    Ok(Json(FeeQuote {
        amount_minor: quote.amount,
        fee_minor: quote.fee,
        total_minor: quote.total,
    }))
}
