//! 实时转发中心
//!
//! # 架构
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        RelayHub                          │
//! │  connections: DashMap<ParticipantId, mpsc::Sender>       │
//! │  rooms:       DashMap<OrderId, Vec<ParticipantId>>       │
//! │  membership:  DashMap<ParticipantId, OrderId>            │
//! └───────────────────────────┬──────────────────────────────┘
//!                             │
//!                  ┌──────────┴──────────┐
//!                  │   WebSocket 边界     │  (relay::ws)
//!                  └──────────┬──────────┘
//!                             │
//!            driver app ◄────┼────► customer app
//! ```
//!
//! # 消息流
//!
//! ```text
//! participant ──▶ joinOrder ─────▶ 加入该订单的房间
//! participant ──▶ driverLocation ─▶ 归一化后转发给房间内其他成员
//! HTTP 状态更新 ──▶ orderStatusUpdated ─▶ 广播给房间全部成员
//! 下单 ──▶ ordersUpdated ─▶ 广播给所有连接
//! ```

pub mod hub;
pub mod metrics;
pub mod ws;

pub use hub::{ParticipantId, RelayHub};
pub use metrics::{MetricsSnapshot, RelayMetrics};
