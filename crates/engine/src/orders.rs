//! Orders created by checkout.
//!
//! An order always belongs to exactly one seller; a cart spanning several
//! sellers fans out into one order per seller.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, order_items::OrderItem, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
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

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Disputed => "disputed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Position on the fulfilment path, `None` off the path.
    fn progress(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Confirmed => Some(1),
            Self::Preparing => Some(2),
            Self::Shipped => Some(3),
            Self::Delivered => Some(4),
            _ => None,
        }
    }

    /// Seller-driven fulfilment moves: forward only along
    /// `confirmed → preparing → shipped → delivered`, skipping allowed.
    pub fn can_advance_to(self, next: OrderStatus) -> bool {
        match (self.progress(), next.progress()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }

    /// States from which the buyer (or an admin) may confirm delivery.
    pub fn can_confirm_delivery(self) -> bool {
        matches!(
            self,
            Self::Confirmed | Self::Preparing | Self::Shipped | Self::Delivered
        )
    }

    /// States in which the buyer may still cancel.
    pub fn buyer_can_cancel(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// States in which the seller or an admin may cancel while funds are
    /// still held.
    pub fn seller_can_cancel(self) -> bool {
        !self.is_terminal()
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "preparing" => Ok(Self::Preparing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "disputed" => Ok(Self::Disputed),
            other => Err(EngineError::Validation(format!(
                "invalid order status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    InTransit,
    OutForDelivery,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InTransit => "in_transit",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for DeliveryStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "in_transit" => Ok(Self::InTransit),
            "out_for_delivery" => Ok(Self::OutForDelivery),
            "delivered" => Ok(Self::Delivered),
            "failed" => Ok(Self::Failed),
            other => Err(EngineError::Validation(format!(
                "invalid delivery status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Pickup,
    Delivery,
}

impl DeliveryMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pickup => "pickup",
            Self::Delivery => "delivery",
        }
    }
}

impl TryFrom<&str> for DeliveryMethod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pickup" => Ok(Self::Pickup),
            "delivery" => Ok(Self::Delivery),
            other => Err(EngineError::Validation(format!(
                "invalid delivery method: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: String,
    pub seller_id: String,
    /// Sum of the item subtotals, held in escrow for the seller.
    pub total_amount: i64,
    pub platform_fee: i64,
    pub status: OrderStatus,
    pub delivery_status: DeliveryStatus,
    pub delivery_method: DeliveryMethod,
    pub notes: Option<String>,
    pub escrow_released: bool,
    pub escrow_released_at: Option<DateTime<Utc>>,
    pub cancelled_reason: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub(crate) fn new(
        buyer_id: &str,
        seller_id: &str,
        total_amount: i64,
        platform_fee: i64,
        delivery_method: DeliveryMethod,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            buyer_id: buyer_id.to_string(),
            seller_id: seller_id.to_string(),
            total_amount,
            platform_fee,
            status: OrderStatus::Confirmed,
            delivery_status: DeliveryStatus::Pending,
            delivery_method,
            notes,
            escrow_released: false,
            escrow_released_at: None,
            cancelled_reason: None,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn total_with_fee(&self) -> i64 {
        self.total_amount + self.platform_fee
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub total_amount: i64,
    pub platform_fee: i64,
    pub status: String,
    pub delivery_status: String,
    pub delivery_method: String,
    pub notes: Option<String>,
    pub escrow_released: bool,
    pub escrow_released_at: Option<DateTimeUtc>,
    pub cancelled_reason: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Order> for ActiveModel {
    fn from(order: &Order) -> Self {
        Self {
            id: ActiveValue::Set(order.id.to_string()),
            buyer_id: ActiveValue::Set(order.buyer_id.clone()),
            seller_id: ActiveValue::Set(order.seller_id.clone()),
            total_amount: ActiveValue::Set(order.total_amount),
            platform_fee: ActiveValue::Set(order.platform_fee),
            status: ActiveValue::Set(order.status.as_str().to_string()),
            delivery_status: ActiveValue::Set(order.delivery_status.as_str().to_string()),
            delivery_method: ActiveValue::Set(order.delivery_method.as_str().to_string()),
            notes: ActiveValue::Set(order.notes.clone()),
            escrow_released: ActiveValue::Set(order.escrow_released),
            escrow_released_at: ActiveValue::Set(order.escrow_released_at),
            cancelled_reason: ActiveValue::Set(order.cancelled_reason.clone()),
            created_at: ActiveValue::Set(order.created_at),
            updated_at: ActiveValue::Set(order.updated_at),
        }
    }
}

impl TryFrom<Model> for Order {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "order")?,
            buyer_id: model.buyer_id,
            seller_id: model.seller_id,
            total_amount: model.total_amount,
            platform_fee: model.platform_fee,
            status: OrderStatus::try_from(model.status.as_str())?,
            delivery_status: DeliveryStatus::try_from(model.delivery_status.as_str())?,
            delivery_method: DeliveryMethod::try_from(model.delivery_method.as_str())?,
            notes: model.notes,
            escrow_released: model.escrow_released,
            escrow_released_at: model.escrow_released_at,
            cancelled_reason: model.cancelled_reason,
            items: Vec::new(),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
