use serde::Serialize;

use crate::{EngineError, ResultEngine, WebhookEvent, WebhookKind};

use super::{Engine, deposits::Settlement, ledger::find_by_reference};

/// What a processed callback did to the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "detail")]
pub enum WebhookOutcome {
    Applied,
    /// The reference was already final; redelivery changed nothing.
    AlreadyProcessed,
    /// Acknowledged without effect: unknown event or reference, or a payload
    /// the ledger refused (the refusal itself is committed).
    Ignored(String),
}

impl Engine {
    /// Applies a signature-verified gateway callback.
    ///
    /// Errors are only returned when nothing was committed, so the caller can
    /// ask the gateway to retry.
    pub async fn process_webhook(&self, event: &WebhookEvent) -> ResultEngine<WebhookOutcome> {
        let reference = event.data.reference.as_str();
        if reference.trim().is_empty() {
            return Err(EngineError::Validation(
                "webhook reference is required".to_string(),
            ));
        }

        let kind = event.kind();
        if let WebhookKind::Other(name) = &kind {
            tracing::debug!(event = %name, reference, "ignoring webhook event");
            return Ok(WebhookOutcome::Ignored(format!("unhandled event {name}")));
        }
        if find_by_reference(&self.database, reference).await?.is_none() {
            tracing::warn!(event = %event.event, reference, "webhook for unknown reference");
            return Ok(WebhookOutcome::Ignored(format!("unknown reference {reference}")));
        }

        match kind {
            WebhookKind::ChargeSuccess => {
                let amount = event.data.amount.ok_or_else(|| {
                    EngineError::Validation("charge.success without amount".to_string())
                })?;
                Ok(match self.settle_deposit(reference, amount).await? {
                    Settlement::Completed(_) => WebhookOutcome::Applied,
                    Settlement::AlreadyFinal(_) => WebhookOutcome::AlreadyProcessed,
                    Settlement::AmountMismatch { expected, received } => {
                        WebhookOutcome::Ignored(format!(
                            "amount mismatch: expected {expected}, received {received}"
                        ))
                    }
                })
            }
            WebhookKind::TransferSuccess => self.settle_transfer(reference, true).await,
            WebhookKind::TransferFailed | WebhookKind::TransferReversed => {
                self.settle_transfer(reference, false).await
            }
            WebhookKind::Other(_) => Ok(WebhookOutcome::Ignored(event.event.clone())),
        }
    }

    async fn settle_transfer(&self, reference: &str, success: bool) -> ResultEngine<WebhookOutcome> {
        Ok(if self.settle_withdrawal(reference, success).await? {
            WebhookOutcome::Applied
        } else {
            WebhookOutcome::AlreadyProcessed
        })
    }
}
