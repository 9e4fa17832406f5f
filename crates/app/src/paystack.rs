//! Paystack implementation of [`PaymentGateway`].

use async_trait::async_trait;
use engine::{
    CURRENCY_CODE, DepositAuthorization, DepositInit, EngineError, GatewayVerification,
    PaymentGateway, TransferRequest,
};
use reqwest::{Client, header};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;

use crate::settings;

#[derive(Clone, Debug)]
pub struct Paystack {
    client: Client,
    base_url: String,
    callback_url: Option<String>,
}

/// Every Paystack response is wrapped in this envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Initialized {
    authorization_url: String,
    access_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Verified {
    status: String,
    amount: i64,
    id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Recipient {
    recipient_code: String,
}

#[derive(Debug, Deserialize)]
struct Transfer {
    transfer_code: Option<String>,
}

impl Paystack {
    pub fn new(settings: &settings::Paystack) -> Result<Self, String> {
        let mut auth = header::HeaderValue::try_from(format!("Bearer {}", settings.secret_key))
            .map_err(|err| format!("invalid paystack secret key: {err}"))?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| format!("failed to build http client: {err}"))?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            callback_url: settings.callback_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, EngineError> {
        let response = self.client.get(self.url(path)).send().await.map_err(network)?;
        unwrap_envelope(path, response).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, EngineError> {
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .map_err(network)?;
        unwrap_envelope(path, response).await
    }
}

fn network(err: reqwest::Error) -> EngineError {
    EngineError::Gateway(format!("paystack unreachable: {err}"))
}

async fn unwrap_envelope<T: DeserializeOwned>(
    path: &str,
    response: reqwest::Response,
) -> Result<T, EngineError> {
    let status = response.status();
    let envelope = response
        .json::<Envelope<T>>()
        .await
        .map_err(|err| EngineError::Gateway(format!("paystack {path}: bad response: {err}")))?;

    if !status.is_success() || !envelope.status {
        tracing::warn!(%status, path, message = %envelope.message, "paystack call rejected");
        return Err(EngineError::Gateway(envelope.message));
    }
    envelope
        .data
        .ok_or_else(|| EngineError::Gateway(format!("paystack {path}: missing data")))
}

#[async_trait]
impl PaymentGateway for Paystack {
    async fn initialize_deposit(
        &self,
        request: DepositInit,
    ) -> Result<DepositAuthorization, EngineError> {
        let mut body = json!({
            "email": request.email,
            "amount": request.amount,
            "reference": request.reference,
            "currency": CURRENCY_CODE,
        });
        if let Some(callback) = &self.callback_url {
            body["callback_url"] = json!(callback);
        }

        let data: Initialized = self.post("transaction/initialize", body).await?;
        Ok(DepositAuthorization {
            authorization_url: data.authorization_url,
            access_code: data.access_code,
        })
    }

    async fn verify_transaction(&self, reference: &str) -> Result<GatewayVerification, EngineError> {
        let data: Verified = self
            .get(&format!("transaction/verify/{reference}"))
            .await?;
        Ok(GatewayVerification {
            success: data.status == "success",
            amount: data.amount,
            gateway_reference: data.id.map(|id| id.to_string()),
        })
    }

    async fn initiate_transfer(&self, request: TransferRequest) -> Result<(), EngineError> {
        let recipient: Recipient = self
            .post(
                "transferrecipient",
                json!({
                    "type": "nuban",
                    "name": request.bank.account_name,
                    "account_number": request.bank.account_number,
                    "bank_code": request.bank.bank_code,
                    "currency": CURRENCY_CODE,
                }),
            )
            .await?;

        let transfer: Transfer = self
            .post(
                "transfer",
                json!({
                    "source": "balance",
                    "amount": request.amount,
                    "recipient": recipient.recipient_code,
                    "reason": request.reason,
                    "reference": request.reference,
                }),
            )
            .await?;
        tracing::info!(
            reference = %request.reference,
            transfer_code = ?transfer.transfer_code,
            "paystack transfer queued"
        );
        Ok(())
    }
}
