//! Wallet and escrow ledger of the campus marketplace.
//!
//! The [`Engine`] owns every balance mutation: each one is a [`Transaction`]
//! row and a [`Wallet`] update committed together under the wallet's row
//! lock. Checkout, delivery confirmation, cancellation, gig escrow, deposits
//! and withdrawals are built on top of it, and the reconciler replays the
//! transaction history to detect and repair drift.

pub use audit::{AuditEvent, AuditLog, AuditRecord};
pub use bids::{Bid, BidStatus};
pub use config::{FeeSchedule, FeeTier, LedgerConfig};
pub use error::EngineError;
pub use fees::{FeeQuote, calculate_fee};
pub use gateway::{
    BankDetails, DepositAuthorization, DepositInit, DisabledGateway, GatewayVerification,
    PaymentGateway, SIGNATURE_HEADER, TransferRequest, WebhookData, WebhookEvent, WebhookKind,
    sign as sign_webhook, verify_signature,
};
pub use gigs::{EscrowStatus, Gig, GigStatus};
pub use money::{CURRENCY_CODE, MINOR_PER_MAJOR, Money};
pub use notifier::{LogNotifier, Notifier};
pub use ops::{
    BALANCE_TOLERANCE_MINOR, CheckoutRequest, DepositSession, Drift, Engine, EngineBuilder,
    TransactionFilter, TransactionPage, VerificationReport, WalletSummary, WebhookOutcome,
    WithdrawalReceipt,
};
pub use order_items::OrderItem;
pub use orders::{DeliveryMethod, DeliveryStatus, Order, OrderStatus};
pub use principal::{Principal, Role};
pub use transactions::{
    Direction, Effect, EscrowSubject, NewTransaction, Transaction, TransactionKind,
    TransactionStatus, effect_of,
};
pub use wallets::Wallet;

mod audit;
mod bids;
mod cart_items;
mod config;
mod error;
mod fees;
mod gateway;
mod gigs;
mod money;
mod notifier;
mod ops;
mod order_items;
mod orders;
mod principal;
mod products;
mod transactions;
mod util;
mod wallets;

type ResultEngine<T> = Result<T, EngineError>;
