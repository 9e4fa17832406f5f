//! Payment gateway bridge.
//!
//! The ledger never talks to a payment provider directly. It goes through
//! [`PaymentGateway`] for the three outbound calls it needs and receives the
//! provider's callbacks as [`WebhookEvent`]s whose signature has been checked
//! with [`verify_signature`].

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha512;

use crate::{EngineError, ResultEngine};

/// Header carrying the hex HMAC-SHA512 of the raw webhook body.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositInit {
    pub reference: String,
    pub email: String,
    /// Amount in kobo.
    pub amount: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositAuthorization {
    pub authorization_url: String,
    pub access_code: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayVerification {
    pub success: bool,
    /// Amount the provider actually collected, in kobo.
    pub amount: i64,
    pub gateway_reference: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub account_number: String,
    pub bank_code: String,
    pub account_name: String,
}

impl BankDetails {
    pub(crate) fn validate(&self) -> ResultEngine<()> {
        let account = self.account_number.trim();
        if account.len() != 10 || !account.chars().all(|c| c.is_ascii_digit()) {
            return Err(EngineError::Validation(
                "account_number must be 10 digits".to_string(),
            ));
        }
        if self.bank_code.trim().is_empty() {
            return Err(EngineError::Validation("bank_code is required".to_string()));
        }
        if self.account_name.trim().is_empty() {
            return Err(EngineError::Validation(
                "account_name is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    pub reference: String,
    /// Amount paid out to the bank account, in kobo. Excludes the fee.
    pub amount: i64,
    pub bank: BankDetails,
    pub reason: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize_deposit(&self, request: DepositInit) -> ResultEngine<DepositAuthorization>;

    async fn verify_transaction(&self, reference: &str) -> ResultEngine<GatewayVerification>;

    /// Asks the provider to start a bank payout. Completion arrives later as a
    /// `transfer.*` webhook.
    async fn initiate_transfer(&self, request: TransferRequest) -> ResultEngine<()>;
}

/// Gateway used when no provider is configured: every call fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledGateway;

#[async_trait]
impl PaymentGateway for DisabledGateway {
    async fn initialize_deposit(&self, _request: DepositInit) -> ResultEngine<DepositAuthorization> {
        Err(disabled())
    }

    async fn verify_transaction(&self, _reference: &str) -> ResultEngine<GatewayVerification> {
        Err(disabled())
    }

    async fn initiate_transfer(&self, _request: TransferRequest) -> ResultEngine<()> {
        Err(disabled())
    }
}

fn disabled() -> EngineError {
    EngineError::Gateway("payment gateway is not configured".to_string())
}

/// Callback kinds the ledger reacts to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookKind {
    ChargeSuccess,
    TransferSuccess,
    TransferFailed,
    TransferReversed,
    Other(String),
}

impl From<&str> for WebhookKind {
    fn from(value: &str) -> Self {
        match value {
            "charge.success" => Self::ChargeSuccess,
            "transfer.success" => Self::TransferSuccess,
            "transfer.failed" => Self::TransferFailed,
            "transfer.reversed" => Self::TransferReversed,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookData {
    pub reference: String,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A provider callback, as posted to the webhook endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: WebhookData,
}

impl WebhookEvent {
    pub fn parse(body: &[u8]) -> ResultEngine<Self> {
        serde_json::from_slice(body)
            .map_err(|err| EngineError::Validation(format!("invalid webhook payload: {err}")))
    }

    pub fn kind(&self) -> WebhookKind {
        WebhookKind::from(self.event.as_str())
    }
}

/// Checks `signature_hex` against HMAC-SHA512(`secret`, `body`) in constant
/// time.
pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> ResultEngine<()> {
    let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes())
        .map_err(|_| EngineError::Gateway("invalid webhook secret".to_string()))?;
    mac.update(body);
    let signature = hex::decode(signature_hex.trim())
        .map_err(|_| EngineError::Gateway("invalid signature encoding".to_string()))?;
    mac.verify_slice(&signature)
        .map_err(|_| EngineError::Gateway("webhook signature mismatch".to_string()))
}

/// Hex HMAC-SHA512 of `body`, as the provider computes it.
pub fn sign(secret: &str, body: &[u8]) -> ResultEngine<String> {
    let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes())
        .map_err(|_| EngineError::Gateway("invalid webhook secret".to_string()))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
