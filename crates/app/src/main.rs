use std::sync::Arc;

use engine::{DisabledGateway, PaymentGateway};
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod paystack;
mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "campus_ledger={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let Some(server) = settings.server else {
        tracing::warn!("no [server] section configured, nothing to run");
        return Ok(());
    };

    tracing::info!("Found server settings...");
    let db = parse_database(&server.database).await?;

    let (gateway, webhook_secret) = match &settings.paystack {
        Some(config) => (
            Arc::new(paystack::Paystack::new(config)?) as Arc<dyn PaymentGateway>,
            Some(config.secret_key.clone()),
        ),
        None => {
            tracing::warn!(
                "paystack is not configured: deposits, withdrawals and webhooks are disabled"
            );
            (Arc::new(DisabledGateway) as Arc<dyn PaymentGateway>, None)
        }
    };

    let engine = engine::Engine::builder()
        .database(db)
        .config(settings.ledger)
        .gateway(gateway)
        .build()
        .await?;

    let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(server::ServerState::new(engine, webhook_secret), listener).await?;

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
