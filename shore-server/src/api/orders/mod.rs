//! Order API Module
//!
//! 订单生命周期的全部变更都走这里：下单、查询、状态推进。状态推进
//! 被接受后由处理器触发一次房间广播。

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Place a new order / list every order
        .route("/", post(handler::create).get(handler::list))
        // Most recently placed order
        .route("/latest", get(handler::latest))
        // Advance an order through the state machine
        .route("/status", post(handler::update_status))
        // Order detail
        .route("/{id}", get(handler::get_by_id))
}
