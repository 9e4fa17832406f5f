//! Point-in-time snapshot of a purchased product.
//!
//! Title, price, category and images are copied at checkout so later listing
//! edits never rewrite historical orders.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, products, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    pub price: i64,
    pub category: Option<String>,
    pub images: Vec<String>,
    pub quantity: i32,
    pub subtotal: i64,
}

impl OrderItem {
    pub(crate) fn snapshot(
        order_id: Uuid,
        product: &products::Model,
        quantity: i32,
    ) -> ResultEngine<Self> {
        let subtotal = product
            .price
            .checked_mul(i64::from(quantity))
            .ok_or_else(|| EngineError::Validation("order amount too large".to_string()))?;
        Ok(Self {
            id: Uuid::new_v4(),
            order_id,
            product_id: parse_uuid(&product.id, "product")?,
            title: product.title.clone(),
            price: product.price,
            category: product.category.clone(),
            images: product.image_list(),
            quantity,
            subtotal,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub title: String,
    pub price: i64,
    pub category: Option<String>,
    pub images: String,
    pub quantity: i32,
    pub subtotal: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Orders,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&OrderItem> for ActiveModel {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: ActiveValue::Set(item.id.to_string()),
            order_id: ActiveValue::Set(item.order_id.to_string()),
            product_id: ActiveValue::Set(item.product_id.to_string()),
            title: ActiveValue::Set(item.title.clone()),
            price: ActiveValue::Set(item.price),
            category: ActiveValue::Set(item.category.clone()),
            images: ActiveValue::Set(
                serde_json::to_string(&item.images).unwrap_or_else(|_| "[]".to_string()),
            ),
            quantity: ActiveValue::Set(item.quantity),
            subtotal: ActiveValue::Set(item.subtotal),
        }
    }
}

impl TryFrom<Model> for OrderItem {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "order item")?,
            order_id: parse_uuid(&model.order_id, "order")?,
            product_id: parse_uuid(&model.product_id, "product")?,
            title: model.title,
            price: model.price,
            category: model.category,
            images: serde_json::from_str(&model.images).unwrap_or_default(),
            quantity: model.quantity,
            subtotal: model.subtotal,
        })
    }
}
