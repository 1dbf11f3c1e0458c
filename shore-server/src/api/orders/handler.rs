//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;

use shared::location::{RawLocation, normalize};
use shared::message::StatusUpdate;
use shared::order::{LineItem, Order, OrderId, OrderStatus};

use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

/// Payload for placing an order
///
/// `location` accepts every historical client shape; whatever arrives is
/// normalized to a canonical coordinate before the order is stored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub total: f64,
    pub tip: Option<f64>,
    pub discount_code: Option<String>,
    pub location: Option<RawLocation>,
}

/// Place a new order
///
/// The accepted record is broadcast as `ordersUpdated` to every live
/// connection, joined to a room or not.
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let order = Order {
        id: OrderId::generate(),
        status: OrderStatus::Placed,
        items: payload.items,
        total: payload.total,
        tip: payload.tip,
        discount_code: payload.discount_code,
        location: normalize(payload.location.as_ref()),
        timestamp: Utc::now(),
    };

    state.store().insert(order.clone())?;
    tracing::info!(order_id = %order.id, total = order.total, "order placed");

    state.broadcast_order_placed(order.clone());

    Ok((StatusCode::CREATED, Json(order)))
}

/// List all orders, oldest first
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Order>>> {
    Ok(Json(state.store().list()))
}

/// Most recently placed order, if any
pub async fn latest(State(state): State<ServerState>) -> AppResult<Json<Option<Order>>> {
    Ok(Json(state.store().latest()))
}

/// Get order by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let id = OrderId::from(id);
    let order = state
        .store()
        .get(&id)
        .ok_or_else(|| AppError::not_found(format!("Order {} not found", id)))?;
    Ok(Json(order))
}

/// Status transition request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

/// Advance an order's status
///
/// The transition is validated and persisted before anything is announced;
/// each accepted transition produces exactly one `orderStatusUpdated`
/// broadcast to the order's room. Rejected transitions broadcast nothing.
pub async fn update_status(
    State(state): State<ServerState>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<Order>> {
    let order = state
        .store()
        .update_status(&payload.order_id, payload.status)?;
    tracing::info!(order_id = %order.id, status = %order.status, "order status advanced");

    state.broadcast_status(StatusUpdate {
        order_id: order.id.clone(),
        status: order.status,
    });

    Ok(Json(order))
}
