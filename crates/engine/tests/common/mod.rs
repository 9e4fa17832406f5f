#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    AuditLog, CheckoutRequest, DeliveryMethod, DepositAuthorization, DepositInit, Engine,
    EngineError, GatewayVerification, Money, NewTransaction, PaymentGateway, TransactionKind,
    TransferRequest, Wallet,
};
use migration::MigratorTrait;

pub fn naira(amount: i64) -> i64 {
    Money::from_major(amount).minor()
}

pub fn pickup() -> CheckoutRequest {
    CheckoutRequest {
        delivery_method: DeliveryMethod::Pickup,
        notes: None,
    }
}

/// Gateway double: deposits always open, verification answers from the
/// `collected` table, transfers succeed unless `fail_transfers` is set.
#[derive(Default)]
pub struct MockGateway {
    pub collected: Mutex<HashMap<String, i64>>,
    pub transfers: Mutex<Vec<TransferRequest>>,
    pub fail_transfers: bool,
}

impl MockGateway {
    pub fn failing_transfers() -> Self {
        Self {
            fail_transfers: true,
            ..Default::default()
        }
    }

    pub fn collect(&self, reference: &str, amount: i64) {
        self.collected
            .lock()
            .unwrap()
            .insert(reference.to_string(), amount);
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn initialize_deposit(
        &self,
        request: DepositInit,
    ) -> Result<DepositAuthorization, EngineError> {
        Ok(DepositAuthorization {
            authorization_url: format!("https://checkout.test/{}", request.reference),
            access_code: Some("access".to_string()),
        })
    }

    async fn verify_transaction(&self, reference: &str) -> Result<GatewayVerification, EngineError> {
        let collected = self.collected.lock().unwrap().get(reference).copied();
        Ok(GatewayVerification {
            success: collected.is_some(),
            amount: collected.unwrap_or_default(),
            gateway_reference: collected.map(|_| format!("gw-{reference}")),
        })
    }

    async fn initiate_transfer(&self, request: TransferRequest) -> Result<(), EngineError> {
        if self.fail_transfers {
            return Err(EngineError::Gateway("transfer rejected".to_string()));
        }
        self.transfers.lock().unwrap().push(request);
        Ok(())
    }
}

pub struct Harness {
    pub engine: Engine,
    pub db: DatabaseConnection,
    pub gateway: Arc<MockGateway>,
    pub audit: AuditLog,
}

pub async fn connect(url: &str) -> DatabaseConnection {
    let db = Database::connect(url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn harness_with(db: DatabaseConnection, gateway: MockGateway) -> Harness {
    let gateway = Arc::new(gateway);
    let audit = AuditLog::memory();
    let engine = Engine::builder()
        .database(db.clone())
        .audit_log(audit.clone())
        .gateway(gateway.clone())
        .build()
        .await
        .unwrap();
    Harness {
        engine,
        db,
        gateway,
        audit,
    }
}

pub async fn harness() -> Harness {
    harness_with(connect("sqlite::memory:").await, MockGateway::default()).await
}

/// File-backed database, for tests that need several pooled connections.
pub async fn file_harness(gateway: MockGateway) -> (Harness, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();
    let path = root.join(format!("ledger_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());
    (harness_with(connect(&url).await, gateway).await, path)
}

/// Credits `amount` kobo to `user_id` as a completed deposit.
pub async fn fund(engine: &Engine, user_id: &str, amount: i64) -> Wallet {
    let wallet = engine.get_wallet(user_id).await.unwrap();
    engine
        .apply_transaction(
            wallet.id,
            NewTransaction::new(user_id, TransactionKind::Deposit, amount)
                .reference(format!("seed-{}", Uuid::new_v4())),
        )
        .await
        .unwrap();
    engine.get_wallet(user_id).await.unwrap()
}

pub async fn exec(db: &DatabaseConnection, sql: &str, values: Vec<sea_orm::Value>) {
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        sql,
        values,
    ))
    .await
    .unwrap();
}

pub async fn count(db: &DatabaseConnection, sql: &str, values: Vec<sea_orm::Value>) -> i64 {
    let row = db
        .query_one(Statement::from_sql_and_values(
            db.get_database_backend(),
            sql,
            values,
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get_by_index::<i64>(0).unwrap()
}

pub async fn seed_product(db: &DatabaseConnection, seller_id: &str, price: i64) -> Uuid {
    let id = Uuid::new_v4();
    exec(
        db,
        "INSERT INTO products (id, seller_id, title, price, category, images, is_active, platform_purchase_enabled, campus) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            id.to_string().into(),
            seller_id.into(),
            format!("Item of {seller_id}").into(),
            price.into(),
            "books".into(),
            r#"["https://img.test/1.png"]"#.into(),
            true.into(),
            true.into(),
            "unilag".into(),
        ],
    )
    .await;
    id
}

pub async fn add_to_cart(db: &DatabaseConnection, user_id: &str, product_id: Uuid, quantity: i32) {
    exec(
        db,
        "INSERT INTO cart_items (id, user_id, product_id, quantity) VALUES (?, ?, ?, ?)",
        vec![
            Uuid::new_v4().to_string().into(),
            user_id.into(),
            product_id.to_string().into(),
            quantity.into(),
        ],
    )
    .await;
}

pub async fn seed_gig(db: &DatabaseConnection, client_id: &str, budget: i64) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    exec(
        db,
        "INSERT INTO gigs (id, client_id, title, budget, status, platform_fee, escrow_status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 'open', 0, 'none', ?, ?)",
        vec![
            id.to_string().into(),
            client_id.into(),
            "Design a logo".into(),
            budget.into(),
            now.into(),
            now.into(),
        ],
    )
    .await;
    id
}

pub async fn seed_bid(db: &DatabaseConnection, gig_id: Uuid, freelancer_id: &str, amount: i64) -> Uuid {
    let id = Uuid::new_v4();
    exec(
        db,
        "INSERT INTO bids (id, gig_id, freelancer_id, amount, status, created_at) \
         VALUES (?, ?, ?, ?, 'pending', ?)",
        vec![
            id.to_string().into(),
            gig_id.to_string().into(),
            freelancer_id.into(),
            amount.into(),
            Utc::now().into(),
        ],
    )
    .await;
    id
}
