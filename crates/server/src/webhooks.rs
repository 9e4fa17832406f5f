//! Payment provider callbacks.
//!
//! The route sits outside the principal middleware: the caller is the
//! provider, authenticated by the HMAC signature of the raw body.

use api_types::webhook::WebhookAck;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use engine::{EngineError, SIGNATURE_HEADER, WebhookEvent, WebhookOutcome, verify_signature};

use crate::{ServerError, server::ServerState};

/// Answers `200` only once the event is committed (or known to need no
/// change). Signature and payload problems are `400`; anything else is a
/// `500` so the provider redelivers.
pub async fn paystack(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ServerError> {
    let Some(secret) = state.webhook_secret.as_deref() else {
        tracing::error!("webhook received but no webhook secret is configured");
        return Err(ServerError::Internal("webhook secret missing".to_string()));
    };
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ServerError::Generic("missing webhook signature".to_string()))?;
    if verify_signature(secret, &body, signature).is_err() {
        tracing::warn!("rejected webhook with invalid signature");
        return Err(ServerError::Generic("invalid webhook signature".to_string()));
    }

    let event = WebhookEvent::parse(&body).map_err(|err| ServerError::Generic(err.to_string()))?;
    let outcome = match state.engine.process_webhook(&event).await {
        Ok(outcome) => outcome,
        Err(EngineError::Validation(message)) => return Err(ServerError::Generic(message)),
        Err(err) => {
            tracing::error!(event = %event.event, reference = %event.data.reference, "webhook processing failed: {err}");
            return Err(ServerError::Internal(err.to_string()));
        }
    };

    let (outcome, detail) = match outcome {
        WebhookOutcome::Applied => ("applied", None),
        WebhookOutcome::AlreadyProcessed => ("already_processed", None),
        WebhookOutcome::Ignored(detail) => ("ignored", Some(detail)),
    };
    Ok(Json(WebhookAck {
        outcome: outcome.to_string(),
        detail,
    }))
}
