use std::{fmt, sync::Arc};

use sea_orm::DatabaseConnection;

use crate::{
    AuditEvent, AuditLog, DisabledGateway, LedgerConfig, LogNotifier, Notifier, Order,
    PaymentGateway, ResultEngine,
};

mod checkout;
mod deposits;
mod escrow;
mod gigs;
mod ledger;
mod orders;
mod reconcile;
mod wallets;
mod webhooks;
mod withdrawals;

pub use checkout::CheckoutRequest;
pub use deposits::DepositSession;
pub use reconcile::{BALANCE_TOLERANCE_MINOR, Drift, VerificationReport};
pub use wallets::{TransactionFilter, TransactionPage, WalletSummary};
pub use webhooks::WebhookOutcome;
pub use withdrawals::WithdrawalReceipt;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Side effects collected while a unit of work runs and emitted only once it
/// has committed.
#[derive(Default)]
pub(crate) struct Journal {
    audit: Vec<AuditEvent>,
    notices: Vec<Notice>,
}

enum Notice {
    OrderStatus(Box<Order>),
    DepositSucceeded {
        user_id: String,
        amount: i64,
        reference: String,
    },
    WithdrawalSettled {
        user_id: String,
        amount: i64,
        reference: String,
        success: bool,
    },
}

impl Journal {
    pub(crate) fn audit(&mut self, event: AuditEvent) {
        self.audit.push(event);
    }

    pub(crate) fn order_status(&mut self, order: &Order) {
        self.notices.push(Notice::OrderStatus(Box::new(order.clone())));
    }

    pub(crate) fn deposit_succeeded(&mut self, user_id: &str, amount: i64, reference: &str) {
        self.notices.push(Notice::DepositSucceeded {
            user_id: user_id.to_string(),
            amount,
            reference: reference.to_string(),
        });
    }

    pub(crate) fn withdrawal_settled(
        &mut self,
        user_id: &str,
        amount: i64,
        reference: &str,
        success: bool,
    ) {
        self.notices.push(Notice::WithdrawalSettled {
            user_id: user_id.to_string(),
            amount,
            reference: reference.to_string(),
            success,
        });
    }
}

pub struct Engine {
    database: DatabaseConnection,
    config: LedgerConfig,
    audit: AuditLog,
    notifier: Arc<dyn Notifier>,
    gateway: Arc<dyn PaymentGateway>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .field("config", &self.config)
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Emits what a committed unit collected: audit records first, then
    /// notifications.
    fn flush(&self, journal: Journal) {
        for event in journal.audit {
            self.audit.record(event);
        }
        for notice in journal.notices {
            match notice {
                Notice::OrderStatus(order) => {
                    self.notifier.order_status_changed(&order, order.status)
                }
                Notice::DepositSucceeded {
                    user_id,
                    amount,
                    reference,
                } => self.notifier.deposit_succeeded(&user_id, amount, &reference),
                Notice::WithdrawalSettled {
                    user_id,
                    amount,
                    reference,
                    success,
                } => self
                    .notifier
                    .withdrawal_settled(&user_id, amount, &reference, success),
            }
        }
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    config: LedgerConfig,
    audit: Option<AuditLog>,
    notifier: Option<Arc<dyn Notifier>>,
    gateway: Option<Arc<dyn PaymentGateway>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    pub fn config(mut self, config: LedgerConfig) -> EngineBuilder {
        self.config = config;
        self
    }

    /// Overrides the audit sink opened from `config.audit_log`.
    pub fn audit_log(mut self, audit: AuditLog) -> EngineBuilder {
        self.audit = Some(audit);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> EngineBuilder {
        self.notifier = Some(notifier);
        self
    }

    pub fn gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> EngineBuilder {
        self.gateway = Some(gateway);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let audit = match (self.audit, &self.config.audit_log) {
            (Some(audit), _) => audit,
            (None, Some(path)) => AuditLog::open(path).map_err(|err| {
                crate::EngineError::Validation(format!(
                    "cannot open audit log {}: {err}",
                    path.display()
                ))
            })?,
            (None, None) => AuditLog::disabled(),
        };
        Ok(Engine {
            database: self.database,
            config: self.config,
            audit,
            notifier: self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
            gateway: self.gateway.unwrap_or_else(|| Arc::new(DisabledGateway)),
        })
    }
}
