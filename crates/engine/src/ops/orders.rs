use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    DeliveryStatus, EngineError, EscrowSubject, Order, OrderItem, OrderStatus, Principal,
    ResultEngine, order_items, orders, util::normalize_optional_text,
};

use super::{
    Engine, Journal,
    ledger::lock_pair,
    with_tx,
};

/// How the actor relates to an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Party {
    Buyer,
    Seller,
    Admin,
}

fn party(order: &Order, principal: &Principal) -> ResultEngine<Party> {
    if order.buyer_id == principal.user_id {
        Ok(Party::Buyer)
    } else if order.seller_id == principal.user_id {
        Ok(Party::Seller)
    } else if principal.is_admin() {
        Ok(Party::Admin)
    } else {
        Err(EngineError::Unauthorized(
            "not a party to this order".to_string(),
        ))
    }
}

fn invalid(order: &Order, action: &str) -> EngineError {
    EngineError::InvalidStateTransition(format!(
        "cannot {action} an order that is {}",
        order.status.as_str()
    ))
}

impl Engine {
    /// Order with its items, visible to its buyer, its seller and admins.
    pub async fn order(&self, principal: &Principal, order_id: Uuid) -> ResultEngine<Order> {
        let order = load_order(&self.database, order_id).await?;
        party(&order, principal)?;
        Ok(order)
    }

    /// Moves an order along its lifecycle.
    ///
    /// `completed` and `cancelled` are routed through
    /// [`confirm_delivery`](Self::confirm_delivery) and
    /// [`cancel_order`](Self::cancel_order) so the escrow always moves with
    /// the status.
    pub async fn update_order_status(
        &self,
        principal: &Principal,
        order_id: Uuid,
        status: OrderStatus,
    ) -> ResultEngine<Order> {
        match status {
            OrderStatus::Completed => return self.confirm_delivery(principal, order_id).await,
            OrderStatus::Cancelled => return self.cancel_order(principal, order_id, None).await,
            _ => {}
        }

        let mut journal = Journal::default();
        let order = with_tx!(self, |db_tx| {
            let mut order = lock_order(&db_tx, order_id).await?;
            let party = party(&order, principal)?;
            match status {
                OrderStatus::Disputed => {
                    if party == Party::Admin {
                        return Err(EngineError::Unauthorized(
                            "only the buyer or the seller can open a dispute".to_string(),
                        ));
                    }
                    if order.status.is_terminal() || order.status == OrderStatus::Disputed {
                        return Err(invalid(&order, "dispute"));
                    }
                }
                _ => {
                    if party == Party::Buyer {
                        return Err(EngineError::Unauthorized(
                            "only the seller can update fulfilment".to_string(),
                        ));
                    }
                    if !order.status.can_advance_to(status) {
                        return Err(EngineError::InvalidStateTransition(format!(
                            "cannot move order from {} to {}",
                            order.status.as_str(),
                            status.as_str()
                        )));
                    }
                    if status == OrderStatus::Delivered {
                        order.delivery_status = DeliveryStatus::Delivered;
                    }
                }
            }
            order.status = status;
            save_order(&db_tx, &mut order).await?;
            journal.order_status(&order);
            Ok(order)
        })?;
        self.flush(journal);
        Ok(order)
    }

    /// Completes the order and pays the seller out of escrow.
    ///
    /// Allowed to the buyer or an admin while the order is in fulfilment;
    /// admins may also settle a disputed order this way. A second
    /// confirmation fails with [`EngineError::InvalidStateTransition`].
    pub async fn confirm_delivery(
        &self,
        principal: &Principal,
        order_id: Uuid,
    ) -> ResultEngine<Order> {
        let mut journal = Journal::default();
        let order = with_tx!(self, |db_tx| {
            let mut order = lock_order(&db_tx, order_id).await?;
            let party = party(&order, principal)?;
            if party == Party::Seller {
                return Err(EngineError::Unauthorized(
                    "only the buyer can confirm delivery".to_string(),
                ));
            }
            let allowed = order.status.can_confirm_delivery()
                || (party == Party::Admin && order.status == OrderStatus::Disputed);
            if !allowed || order.escrow_released {
                return Err(invalid(&order, "confirm delivery of"));
            }

            let (mut buyer, mut seller) =
                lock_pair(&db_tx, &order.buyer_id, &order.seller_id).await?;
            self.release(
                &db_tx,
                EscrowSubject::Order(order.id),
                &mut buyer,
                &mut seller,
                &mut journal,
            )
            .await?;

            let now = Utc::now();
            order.status = OrderStatus::Completed;
            order.delivery_status = DeliveryStatus::Delivered;
            order.escrow_released = true;
            order.escrow_released_at = Some(now);
            save_order(&db_tx, &mut order).await?;
            tracing::info!(order_id = %order.id, amount = order.total_amount, "escrow released");
            journal.order_status(&order);
            Ok(order)
        })?;
        self.flush(journal);
        Ok(order)
    }

    /// Cancels the order and refunds the buyer the subtotal and the platform
    /// fee.
    ///
    /// The buyer may cancel while the order is `pending` or `confirmed`; the
    /// seller or an admin while the funds are still held.
    pub async fn cancel_order(
        &self,
        principal: &Principal,
        order_id: Uuid,
        reason: Option<&str>,
    ) -> ResultEngine<Order> {
        let mut journal = Journal::default();
        let order = with_tx!(self, |db_tx| {
            let mut order = lock_order(&db_tx, order_id).await?;
            let party = party(&order, principal)?;
            let allowed = match party {
                Party::Buyer => order.status.buyer_can_cancel(),
                Party::Seller | Party::Admin => order.status.seller_can_cancel(),
            };
            if !allowed || order.escrow_released {
                return Err(invalid(&order, "cancel"));
            }

            let (mut buyer, mut seller) =
                lock_pair(&db_tx, &order.buyer_id, &order.seller_id).await?;
            self.refund(
                &db_tx,
                EscrowSubject::Order(order.id),
                &mut buyer,
                &mut seller,
                order.platform_fee,
                &mut journal,
            )
            .await?;

            order.status = OrderStatus::Cancelled;
            order.cancelled_reason = normalize_optional_text(reason);
            save_order(&db_tx, &mut order).await?;
            tracing::info!(
                order_id = %order.id,
                refunded = order.total_with_fee(),
                "order cancelled"
            );
            journal.order_status(&order);
            Ok(order)
        })?;
        self.flush(journal);
        Ok(order)
    }

    /// Records delivery progress. `delivered` also advances an order still
    /// in fulfilment to `delivered`.
    pub async fn update_delivery_status(
        &self,
        principal: &Principal,
        order_id: Uuid,
        delivery_status: DeliveryStatus,
    ) -> ResultEngine<Order> {
        let mut journal = Journal::default();
        let order = with_tx!(self, |db_tx| {
            let mut order = lock_order(&db_tx, order_id).await?;
            if party(&order, principal)? == Party::Buyer {
                return Err(EngineError::Unauthorized(
                    "only the seller can update delivery".to_string(),
                ));
            }
            if order.status.is_terminal() {
                return Err(invalid(&order, "update delivery of"));
            }

            order.delivery_status = delivery_status;
            if delivery_status == DeliveryStatus::Delivered
                && order.status.can_advance_to(OrderStatus::Delivered)
            {
                order.status = OrderStatus::Delivered;
                journal.order_status(&order);
            }
            save_order(&db_tx, &mut order).await?;
            Ok(order)
        })?;
        self.flush(journal);
        Ok(order)
    }
}

async fn load_items<C: ConnectionTrait>(db: &C, order_id: Uuid) -> ResultEngine<Vec<OrderItem>> {
    order_items::Entity::find()
        .filter(order_items::Column::OrderId.eq(order_id.to_string()))
        .order_by_asc(order_items::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(OrderItem::try_from)
        .collect()
}

async fn load_order<C: ConnectionTrait>(db: &C, order_id: Uuid) -> ResultEngine<Order> {
    let model = orders::Entity::find_by_id(order_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("order {order_id}")))?;
    let mut order = Order::try_from(model)?;
    order.items = load_items(db, order_id).await?;
    Ok(order)
}

async fn lock_order(db_tx: &DatabaseTransaction, order_id: Uuid) -> ResultEngine<Order> {
    let model = orders::Entity::find_by_id(order_id.to_string())
        .lock_exclusive()
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("order {order_id}")))?;
    let mut order = Order::try_from(model)?;
    order.items = load_items(db_tx, order_id).await?;
    Ok(order)
}

async fn save_order(db_tx: &DatabaseTransaction, order: &mut Order) -> ResultEngine<()> {
    order.updated_at = Utc::now();
    orders::ActiveModel::from(&*order).update(db_tx).await?;
    Ok(())
}
