//! Read-only view of marketplace listings.
//!
//! Listing management lives outside the ledger; checkout only reads price,
//! ownership and purchasability.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub seller_id: String,
    pub title: String,
    /// Unit price in kobo.
    pub price: i64,
    pub category: Option<String>,
    /// JSON array of image URLs.
    pub images: String,
    pub is_active: bool,
    pub platform_purchase_enabled: bool,
    pub campus: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_purchasable(&self) -> bool {
        self.is_active && self.platform_purchase_enabled
    }

    pub fn image_list(&self) -> Vec<String> {
        serde_json::from_str(&self.images).unwrap_or_default()
    }
}
