use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Body of a `402 Payment Required`.
#[derive(Debug, Serialize, Deserialize)]
pub struct InsufficientFundsBody {
    pub error: String,
    pub required_minor: i64,
    pub available_minor: i64,
    pub shortfall_minor: i64,
}

pub mod wallet {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Deposit,
        Withdrawal,
        Escrow,
        Release,
        Refund,
        Fee,
        WithdrawalFee,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Direction {
        Debit,
        Credit,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionStatus {
        Pending,
        Completed,
        Failed,
        Cancelled,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletView {
        pub id: Uuid,
        pub user_id: String,
        pub balance_minor: i64,
        pub pending_balance_minor: i64,
        pub total_earned_minor: i64,
        pub total_spent_minor: i64,
        pub currency: String,
        pub last_transaction_at: Option<DateTime<Utc>>,
        pub last_balance_verification: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub kind: TransactionKind,
        pub direction: Direction,
        pub status: TransactionStatus,
        pub amount_minor: i64,
        pub fee_minor: i64,
        pub reference: Option<String>,
        pub description: Option<String>,
        pub order_id: Option<Uuid>,
        pub gig_id: Option<Uuid>,
        pub bid_id: Option<Uuid>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletSummary {
        pub wallet: WalletView,
        pub transaction_count: u64,
        /// Withdrawals and their fees still waiting for the payout callback.
        pub pending_withdrawals_minor: i64,
        pub recent_transactions: Vec<TransactionView>,
    }

    /// Query string of `GET /wallet/transactions`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionHistoryQuery {
        pub kind: Option<TransactionKind>,
        pub status: Option<TransactionStatus>,
        /// RFC3339 lower bound on `created_at`, inclusive.
        pub from: Option<DateTime<Utc>>,
        /// RFC3339 upper bound on `created_at`, inclusive.
        pub to: Option<DateTime<Utc>>,
        pub order_id: Option<Uuid>,
        /// Defaults to 20, capped at 100.
        pub limit: Option<u64>,
        pub offset: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionHistory {
        pub transactions: Vec<TransactionView>,
        pub total: u64,
        pub limit: u64,
        pub offset: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DepositNew {
        pub email: String,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DepositCreated {
        pub reference: String,
        pub authorization_url: String,
        pub access_code: Option<String>,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WithdrawNew {
        pub amount_minor: i64,
        pub account_number: String,
        pub bank_code: String,
        pub account_name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WithdrawalCreated {
        pub reference: String,
        pub amount_minor: i64,
        pub fee_minor: i64,
        pub status: TransactionStatus,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceVerification {
        pub wallet_id: Uuid,
        pub calculated_balance_minor: i64,
        pub calculated_pending_balance_minor: i64,
        pub db_balance_minor: i64,
        pub db_pending_balance_minor: i64,
        pub balance_discrepancy_minor: i64,
        pub pending_discrepancy_minor: i64,
        pub corrected: bool,
        pub verified_at: DateTime<Utc>,
    }
}

pub mod fees {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FeeQuoteQuery {
        pub amount_minor: i64,
        pub campus: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FeeQuote {
        pub amount_minor: i64,
        pub fee_minor: i64,
        pub total_minor: i64,
    }
}

pub mod order {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum OrderStatus {
        Pending,
        Confirmed,
        Preparing,
        Shipped,
        Delivered,
        Completed,
        Cancelled,
        Disputed,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DeliveryStatus {
        Pending,
        InTransit,
        OutForDelivery,
        Delivered,
        Failed,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DeliveryMethod {
        #[default]
        Pickup,
        Delivery,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CheckoutNew {
        #[serde(default)]
        pub delivery_method: DeliveryMethod,
        pub notes: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BuyNow {
        pub product_id: Uuid,
        pub quantity: i32,
        #[serde(default)]
        pub delivery_method: DeliveryMethod,
        pub notes: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderStatusUpdate {
        pub status: OrderStatus,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DeliveryStatusUpdate {
        pub delivery_status: DeliveryStatus,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct OrderCancel {
        pub reason: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderItemView {
        pub product_id: Uuid,
        pub title: String,
        pub price_minor: i64,
        pub category: Option<String>,
        pub images: Vec<String>,
        pub quantity: i32,
        pub subtotal_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderView {
        pub id: Uuid,
        pub buyer_id: String,
        pub seller_id: String,
        /// Seller subtotal, excluding the platform fee.
        pub total_amount_minor: i64,
        pub platform_fee_minor: i64,
        pub status: OrderStatus,
        pub delivery_status: DeliveryStatus,
        pub delivery_method: DeliveryMethod,
        pub notes: Option<String>,
        pub escrow_released: bool,
        pub escrow_released_at: Option<DateTime<Utc>>,
        pub cancelled_reason: Option<String>,
        pub items: Vec<OrderItemView>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrdersCreated {
        pub orders: Vec<OrderView>,
    }
}

pub mod gig {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum GigStatus {
        Open,
        InProgress,
        Completed,
        Cancelled,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum EscrowStatus {
        None,
        InEscrow,
        Released,
        Refunded,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GigView {
        pub id: Uuid,
        pub client_id: String,
        pub title: String,
        pub budget_minor: i64,
        pub status: GigStatus,
        pub freelancer_id: Option<String>,
        pub accepted_bid_id: Option<Uuid>,
        pub agreed_amount_minor: Option<i64>,
        pub platform_fee_minor: i64,
        pub escrow_status: EscrowStatus,
        pub updated_at: DateTime<Utc>,
    }
}

pub mod webhook {
    use super::*;

    /// Acknowledgement returned to the payment provider.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct WebhookAck {
        /// `applied`, `already_processed` or `ignored`.
        pub outcome: String,
        pub detail: Option<String>,
    }
}
