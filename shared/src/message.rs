//! 实时转发的线上契约
//!
//! 每一帧是 `{"event": <名称>, "data": <负载>}` 的 JSON 信封，事件名
//! 与历史前端约定一致：
//!
//! | 事件 | 方向 | 负载 |
//! |------|------|------|
//! | `joinOrder` | 参与者 → 服务端 | 订单 ID |
//! | `driverLocation` | 双向 | `{orderId, latitude, longitude}` |
//! | `customerLocation` | 双向 | `{orderId, latitude, longitude}` |
//! | `orderStatusUpdated` | 服务端 → 房间成员 | `{orderId, status}` |
//! | `ordersUpdated` | 服务端 → 所有连接 | 新建的订单记录 |
//!
//! 转发是尽力而为：不持久化、不重放，晚加入者只错过，权威状态
//! 始终以 REST 查询为准。

use serde::{Deserialize, Serialize};

use crate::order::{Order, OrderId, OrderStatus};

/// 位置事件负载
///
/// Relayed verbatim in shape: the hub normalizes the coordinate but members
/// receive exactly this structure, `orderId` included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    pub order_id: OrderId,
    pub latitude: f64,
    pub longitude: f64,
}

/// 状态事件负载 - 每次被接受的状态迁移恰好发出一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

/// 参与者发往服务端的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// 加入某个订单的房间
    JoinOrder(OrderId),
    DriverLocation(LocationUpdate),
    CustomerLocation(LocationUpdate),
}

/// 服务端发往参与者的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    DriverLocation(LocationUpdate),
    CustomerLocation(LocationUpdate),
    OrderStatusUpdated(StatusUpdate),
    /// 新订单广播（供摊主面板刷新，不限房间）
    OrdersUpdated(Order),
}

/// 位置事件的角色标签
///
/// The role lives in the event name, not the payload; any joined participant
/// may emit either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationRole {
    Driver,
    Customer,
}

impl LocationRole {
    /// Wrap a payload in the outbound event carrying this role.
    pub fn event(self, update: LocationUpdate) -> ServerEvent {
        match self {
            Self::Driver => ServerEvent::DriverLocation(update),
            Self::Customer => ServerEvent::CustomerLocation(update),
        }
    }
}

impl std::fmt::Display for LocationRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Driver => f.write_str("driver"),
            Self::Customer => f.write_str("customer"),
        }
    }
}
