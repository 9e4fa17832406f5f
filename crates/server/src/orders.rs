//! Order API endpoints: checkout and the escrow order lifecycle.

use api_types::order::{
    BuyNow, CheckoutNew, DeliveryMethod as ApiMethod, DeliveryStatus as ApiDelivery,
    DeliveryStatusUpdate, OrderCancel, OrderItemView, OrderStatus as ApiStatus,
    OrderStatusUpdate, OrderView, OrdersCreated,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{CheckoutRequest, DeliveryMethod, DeliveryStatus, Order, OrderStatus, Principal};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn map_status(status: OrderStatus) -> ApiStatus {
    match status {
        OrderStatus::Pending => ApiStatus::Pending,
        OrderStatus::Confirmed => ApiStatus::Confirmed,
        OrderStatus::Preparing => ApiStatus::Preparing,
        OrderStatus::Shipped => ApiStatus::Shipped,
        OrderStatus::Delivered => ApiStatus::Delivered,
        OrderStatus::Completed => ApiStatus::Completed,
        OrderStatus::Cancelled => ApiStatus::Cancelled,
        OrderStatus::Disputed => ApiStatus::Disputed,
    }
}

fn unmap_status(status: ApiStatus) -> OrderStatus {
    match status {
        ApiStatus::Pending => OrderStatus::Pending,
        ApiStatus::Confirmed => OrderStatus::Confirmed,
        ApiStatus::Preparing => OrderStatus::Preparing,
        ApiStatus::Shipped => OrderStatus::Shipped,
        ApiStatus::Delivered => OrderStatus::Delivered,
        ApiStatus::Completed => OrderStatus::Completed,
        ApiStatus::Cancelled => OrderStatus::Cancelled,
        ApiStatus::Disputed => OrderStatus::Disputed,
    }
}

fn map_delivery(status: DeliveryStatus) -> ApiDelivery {
    match status {
        DeliveryStatus::Pending => ApiDelivery::Pending,
        DeliveryStatus::InTransit => ApiDelivery::InTransit,
        DeliveryStatus::OutForDelivery => ApiDelivery::OutForDelivery,
        DeliveryStatus::Delivered => ApiDelivery::Delivered,
        DeliveryStatus::Failed => ApiDelivery::Failed,
    }
}

fn unmap_delivery(status: ApiDelivery) -> DeliveryStatus {
    match status {
        ApiDelivery::Pending => DeliveryStatus::Pending,
        ApiDelivery::InTransit => DeliveryStatus::InTransit,
        ApiDelivery::OutForDelivery => DeliveryStatus::OutForDelivery,
        ApiDelivery::Delivered => DeliveryStatus::Delivered,
        ApiDelivery::Failed => DeliveryStatus::Failed,
    }
}

fn checkout_request(method: ApiMethod, notes: Option<String>) -> CheckoutRequest {
    CheckoutRequest {
        delivery_method: match method {
            ApiMethod::Pickup => DeliveryMethod::Pickup,
            ApiMethod::Delivery => DeliveryMethod::Delivery,
        },
        notes,
    }
}

fn order_view(order: Order) -> OrderView {
    OrderView {
        id: order.id,
        buyer_id: order.buyer_id,
        seller_id: order.seller_id,
        total_amount_minor: order.total_amount,
        platform_fee_minor: order.platform_fee,
        status: map_status(order.status),
        delivery_status: map_delivery(order.delivery_status),
        delivery_method: match order.delivery_method {
            DeliveryMethod::Pickup => ApiMethod::Pickup,
            DeliveryMethod::Delivery => ApiMethod::Delivery,
        },
        notes: order.notes,
        escrow_released: order.escrow_released,
        escrow_released_at: order.escrow_released_at,
        cancelled_reason: order.cancelled_reason,
        items: order
            .items
            .into_iter()
            .map(|item| OrderItemView {
                product_id: item.product_id,
                title: item.title,
                price_minor: item.price,
                category: item.category,
                images: item.images,
                quantity: item.quantity,
                subtotal_minor: item.subtotal,
            })
            .collect(),
        created_at: order.created_at,
        updated_at: order.updated_at,
    }
}

/// Checks out the caller's cart: one order per seller.
pub async fn create(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Json(payload): Json<CheckoutNew>,
) -> Result<(StatusCode, Json<OrdersCreated>), ServerError> {
    let orders = state
        .engine
        .create_order(
            &principal,
            checkout_request(payload.delivery_method, payload.notes),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrdersCreated {
            orders: orders.into_iter().map(order_view).collect(),
        }),
    ))
}

pub async fn buy_now(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Json(payload): Json<BuyNow>,
) -> Result<(StatusCode, Json<OrderView>), ServerError> {
    let order = state
        .engine
        .buy_now(
            &principal,
            payload.product_id,
            payload.quantity,
            checkout_request(payload.delivery_method, payload.notes),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(order_view(order))))
}

pub async fn get(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, ServerError> {
    let order = state.engine.order(&principal, id).await?;
    Ok(Json(order_view(order)))
}

pub async fn update_status(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderStatusUpdate>,
) -> Result<Json<OrderView>, ServerError> {
    let order = state
        .engine
        .update_order_status(&principal, id, unmap_status(payload.status))
        .await?;
    Ok(Json(order_view(order)))
}

pub async fn confirm_delivery(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, ServerError> {
    let order = state.engine.confirm_delivery(&principal, id).await?;
    Ok(Json(order_view(order)))
}

pub async fn cancel(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderCancel>,
) -> Result<Json<OrderView>, ServerError> {
    let order = state
        .engine
        .cancel_order(&principal, id, payload.reason.as_deref())
        .await?;
    Ok(Json(order_view(order)))
}

pub async fn update_delivery(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeliveryStatusUpdate>,
) -> Result<Json<OrderView>, ServerError> {
    let order = state
        .engine
        .update_delivery_status(&principal, id, unmap_delivery(payload.delivery_status))
        .await?;
    Ok(Json(order_view(order)))
}
