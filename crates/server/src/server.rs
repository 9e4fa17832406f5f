use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

use std::sync::Arc;

use crate::{fees, gigs, orders, principal, wallet, webhooks};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    /// Secret the payment provider signs webhooks with. Webhooks are refused
    /// while it is unset.
    pub webhook_secret: Option<Arc<str>>,
}

impl ServerState {
    pub fn new(engine: Engine, webhook_secret: Option<String>) -> Self {
        Self {
            engine: Arc::new(engine),
            webhook_secret: webhook_secret.map(Arc::from),
        }
    }
}

pub fn router(state: ServerState) -> Router {
    let authenticated = Router::new()
        .route("/wallet", get(wallet::get))
        .route("/wallet/summary", get(wallet::summary))
        .route("/wallet/transactions", get(wallet::history))
        .route("/wallet/deposit", post(wallet::deposit))
        .route(
            "/wallet/deposit/{reference}/verify",
            get(wallet::verify_deposit),
        )
        .route("/wallet/withdraw", post(wallet::withdraw))
        .route("/wallet/verify-balance", post(wallet::verify_balance))
        .route("/fees/quote", get(fees::quote))
        .route("/orders", post(orders::create))
        .route("/orders/buy-now", post(orders::buy_now))
        .route("/orders/{id}", get(orders::get))
        .route("/orders/{id}/status", patch(orders::update_status))
        .route("/orders/{id}/confirm-delivery", post(orders::confirm_delivery))
        .route("/orders/{id}/cancel", post(orders::cancel))
        .route("/orders/{id}/delivery", patch(orders::update_delivery))
        .route("/bids/{id}/accept", post(gigs::accept_bid))
        .route("/gigs/{id}/complete", post(gigs::complete))
        .route("/gigs/{id}/cancel", post(gigs::cancel))
        .route_layer(middleware::from_fn(principal::auth));

    Router::new()
        .merge(authenticated)
        .route("/webhooks/paystack", post(webhooks::paystack))
        .with_state(state)
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
