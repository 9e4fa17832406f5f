//! Checkout: turns a cart (or a single item) into one escrowed order per
//! seller.
//!
//! The whole batch is one unit. Every order, order item, wallet mutation and
//! the cart clearing commit together or not at all.

use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    DeliveryMethod, EngineError, EscrowSubject, FeeQuote, Order, OrderItem, Principal,
    ResultEngine, calculate_fee, cart_items, order_items, orders, products,
    util::{normalize_optional_text, require_positive, require_user_id},
};

use super::{
    Engine, Journal,
    ledger::{ensure_wallet, find_wallet, lock_in_order, take_wallet},
    with_tx,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub delivery_method: DeliveryMethod,
    pub notes: Option<String>,
}

/// One product line of a checkout.
struct CartLine {
    product_id: String,
    quantity: i32,
    /// Cart row to clear once the batch succeeds; `None` for buy-now.
    cart_item_id: Option<String>,
}

/// Lines of one seller, with their product snapshot source.
struct SellerBatch {
    lines: Vec<(products::Model, i32)>,
    subtotal: i64,
    fee: i64,
}

impl Engine {
    /// Fee preview for a purchase of `amount`; writes nothing.
    pub fn quote_fee(&self, amount: i64, campus: Option<&str>) -> ResultEngine<FeeQuote> {
        require_positive(amount, "amount")?;
        Ok(FeeQuote::new(amount, campus, &self.config.fees))
    }

    /// Checks out the buyer's whole cart.
    pub async fn create_order(
        &self,
        buyer: &Principal,
        request: CheckoutRequest,
    ) -> ResultEngine<Vec<Order>> {
        require_user_id(&buyer.user_id)?;
        let mut journal = Journal::default();
        let orders = with_tx!(self, |db_tx| {
            let lines: Vec<CartLine> = cart_items::Entity::find()
                .filter(cart_items::Column::UserId.eq(buyer.user_id.as_str()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|item| CartLine {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    cart_item_id: Some(item.id),
                })
                .collect();
            self.checkout(&db_tx, buyer, lines, &request, &mut journal)
                .await
        })?;
        self.flush(journal);
        Ok(orders)
    }

    /// Buys a single product without touching the cart.
    pub async fn buy_now(
        &self,
        buyer: &Principal,
        product_id: Uuid,
        quantity: i32,
        request: CheckoutRequest,
    ) -> ResultEngine<Order> {
        require_user_id(&buyer.user_id)?;
        let line = CartLine {
            product_id: product_id.to_string(),
            quantity,
            cart_item_id: None,
        };
        let mut journal = Journal::default();
        let mut orders = with_tx!(self, |db_tx| {
            self.checkout(&db_tx, buyer, vec![line], &request, &mut journal)
                .await
        })?;
        self.flush(journal);
        orders
            .pop()
            .ok_or_else(|| EngineError::NotFound("order".to_string()))
    }

    async fn checkout(
        &self,
        db_tx: &DatabaseTransaction,
        buyer: &Principal,
        lines: Vec<CartLine>,
        request: &CheckoutRequest,
        journal: &mut Journal,
    ) -> ResultEngine<Vec<Order>> {
        if lines.is_empty() {
            return Err(EngineError::Validation("cart is empty".to_string()));
        }

        let mut batches: BTreeMap<String, SellerBatch> = BTreeMap::new();
        let mut cart_item_ids = Vec::new();
        for line in lines {
            if line.quantity < 1 {
                return Err(EngineError::Validation(
                    "quantity must be at least 1".to_string(),
                ));
            }
            let product = products::Entity::find_by_id(line.product_id.clone())
                .one(db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("product {}", line.product_id)))?;
            if product.seller_id == buyer.user_id {
                return Err(EngineError::Validation(
                    "cannot buy your own product".to_string(),
                ));
            }
            if !product.is_purchasable() {
                return Err(EngineError::Validation(format!(
                    "product not purchasable: {}",
                    product.title
                )));
            }
            let line_total = product
                .price
                .checked_mul(i64::from(line.quantity))
                .ok_or_else(|| EngineError::Validation("order amount too large".to_string()))?;

            let batch = batches
                .entry(product.seller_id.clone())
                .or_insert_with(|| SellerBatch {
                    lines: Vec::new(),
                    subtotal: 0,
                    fee: 0,
                });
            batch.subtotal = batch
                .subtotal
                .checked_add(line_total)
                .ok_or_else(|| EngineError::Validation("order amount too large".to_string()))?;
            batch.lines.push((product, line.quantity));
            if let Some(id) = line.cart_item_id {
                cart_item_ids.push(id);
            }
        }

        let campus = buyer.campus.as_deref();
        let mut total_with_fee: i64 = 0;
        for batch in batches.values_mut() {
            batch.fee = calculate_fee(batch.subtotal, campus, &self.config.fees);
            total_with_fee = batch
                .subtotal
                .checked_add(batch.fee)
                .and_then(|batch_total| total_with_fee.checked_add(batch_total))
                .ok_or_else(|| EngineError::Validation("order amount too large".to_string()))?;
        }

        let buyer_wallet = find_wallet(db_tx, &buyer.user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("wallet".to_string()))?;
        let mut to_lock = vec![buyer_wallet];
        for seller_id in batches.keys() {
            to_lock.push(ensure_wallet(db_tx, seller_id).await?);
        }
        let mut locked = lock_in_order(db_tx, to_lock).await?;
        let mut buyer_wallet = take_wallet(&mut locked, &buyer.user_id)?;

        if buyer_wallet.balance < total_with_fee {
            return Err(EngineError::insufficient(
                total_with_fee,
                buyer_wallet.balance,
            ));
        }

        let notes = normalize_optional_text(request.notes.as_deref());
        let now = Utc::now();
        let mut created = Vec::with_capacity(batches.len());
        for (seller_id, batch) in batches {
            let mut seller_wallet = take_wallet(&mut locked, &seller_id)?;
            let mut order = Order::new(
                &buyer.user_id,
                &seller_id,
                batch.subtotal,
                batch.fee,
                request.delivery_method,
                notes.clone(),
                now,
            );
            orders::ActiveModel::from(&order).insert(db_tx).await?;
            for (product, quantity) in &batch.lines {
                let item = OrderItem::snapshot(order.id, product, *quantity)?;
                order_items::ActiveModel::from(&item).insert(db_tx).await?;
                order.items.push(item);
            }

            self.hold(
                db_tx,
                EscrowSubject::Order(order.id),
                &mut buyer_wallet,
                &mut seller_wallet,
                batch.subtotal,
                batch.fee,
                journal,
            )
            .await?;

            tracing::info!(
                order_id = %order.id,
                buyer_id = %order.buyer_id,
                seller_id = %order.seller_id,
                subtotal = order.total_amount,
                fee = order.platform_fee,
                "order created"
            );
            journal.order_status(&order);
            created.push(order);
        }

        if !cart_item_ids.is_empty() {
            cart_items::Entity::delete_many()
                .filter(cart_items::Column::Id.is_in(cart_item_ids))
                .exec(db_tx)
                .await?;
        }
        Ok(created)
    }
}
