//! 健康检查路由
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /health | GET | 健康检查 (含转发指标) |
//! | /api/ping | GET | 连通性探测 |
//!
//! # 响应示例
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "version": "0.1.0",
//!   "order_count": 3,
//!   "connections": 2,
//!   "relay": { "joins": 4, "broadcasts": 12, "deliveries": 11, "drops": 1 }
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;
use crate::relay::MetricsSnapshot;

/// 健康检查路由 - 公共路由
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/ping", get(ping))
}

/// 健康检查响应
#[derive(Serialize)]
pub struct HealthResponse {
    /// 状态 (healthy | error)
    status: &'static str,
    /// 版本号
    version: &'static str,
    /// 存储中的订单数
    order_count: usize,
    /// 当前活跃连接数
    connections: usize,
    /// 转发计数器
    relay: MetricsSnapshot,
}

/// 连通性探测响应
#[derive(Serialize)]
pub struct PingResponse {
    message: &'static str,
}

/// 健康检查，附带转发层计数器
pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        order_count: state.store().len(),
        connections: state.relay().connection_count(),
        relay: state.relay().metrics().snapshot(),
    })
}

/// 前端启动时的连通性探测
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse { message: "pong" })
}
