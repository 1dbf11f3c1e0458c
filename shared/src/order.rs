//! 订单模型与状态机
//!
//! 订单记录是交易的审计凭证：创建后只有 `status` 可变，且状态只能
//! 沿 `placed → en_route → delivered` 单向前进。进入 `en_route` 时
//! 位置转发才有意义，`delivered` 为终态。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::location::Coordinate;
use crate::util;

/// 订单 ID - 不透明的稳定标识
///
/// Serialized as a string. Legacy clients send numeric ids over the wire;
/// deserialization coerces both forms to the same string key so the room
/// lookup never splits on representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Mint a fresh id (snowflake-style, JS-safe).
    pub fn generate() -> Self {
        Self(util::snowflake_id().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for OrderId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(Self(s)),
            Value::Number(n) => Ok(Self(n.to_string())),
            other => Err(D::Error::custom(format!(
                "order id must be a string or number, got {other}"
            ))),
        }
    }
}

/// 订单状态
///
/// Strict forward-only policy: the only accepted transitions are
/// `placed → en_route` and `en_route → delivered`. Repeating the current
/// status, skipping a state or moving backward is rejected, so one request
/// can never fire two status broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// 已下单（初始态）
    Placed,
    /// 配送中 - 进入该状态后司机位置转发才有意义
    EnRoute,
    /// 已送达（终态）
    Delivered,
}

impl OrderStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered)
    }

    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Placed, Self::EnRoute) | (Self::EnRoute, Self::Delivered)
        )
    }

    /// Apply the state machine, returning the new status or the rejected
    /// transition.
    pub fn advance_to(self, requested: Self) -> Result<Self, InvalidTransition> {
        if self.can_advance_to(requested) {
            Ok(requested)
        } else {
            Err(InvalidTransition {
                from: self,
                to: requested,
            })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Placed => "placed",
            Self::EnRoute => "en_route",
            Self::Delivered => "delivered",
        };
        f.write_str(s)
    }
}

/// 被拒绝的状态迁移
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid order status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// 订单行项目（创建后不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    pub price: f64,
}

/// 订单记录
///
/// 除 `status` 外所有字段在创建时固定；记录永不删除。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub items: Vec<LineItem>,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
    /// 送货地点（顾客坐标），入库前已归一化
    pub location: Coordinate,
    /// 创建时间
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_accepted() {
        assert_eq!(
            OrderStatus::Placed.advance_to(OrderStatus::EnRoute),
            Ok(OrderStatus::EnRoute)
        );
        assert_eq!(
            OrderStatus::EnRoute.advance_to(OrderStatus::Delivered),
            Ok(OrderStatus::Delivered)
        );
    }

    #[test]
    fn backward_and_skipping_transitions_rejected() {
        let err = OrderStatus::Delivered
            .advance_to(OrderStatus::EnRoute)
            .unwrap_err();
        assert_eq!(err.from, OrderStatus::Delivered);
        assert_eq!(err.to, OrderStatus::EnRoute);

        assert!(OrderStatus::Placed.advance_to(OrderStatus::Delivered).is_err());
        assert!(OrderStatus::EnRoute.advance_to(OrderStatus::Placed).is_err());
    }

    #[test]
    fn repeating_current_status_rejected() {
        assert!(OrderStatus::EnRoute.advance_to(OrderStatus::EnRoute).is_err());
        assert!(OrderStatus::Placed.advance_to(OrderStatus::Placed).is_err());
    }

    #[test]
    fn delivered_is_terminal() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(!OrderStatus::Placed.is_terminal());
        assert!(!OrderStatus::EnRoute.is_terminal());
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::EnRoute).unwrap(),
            "\"en_route\""
        );
        let parsed: OrderStatus = serde_json::from_str("\"delivered\"").unwrap();
        assert_eq!(parsed, OrderStatus::Delivered);
    }

    #[test]
    fn order_id_accepts_string_or_number() {
        let from_string: OrderId = serde_json::from_str("\"1761234\"").unwrap();
        let from_number: OrderId = serde_json::from_str("1761234").unwrap();
        assert_eq!(from_string, from_number);

        let bad: Result<OrderId, _> = serde_json::from_str("true");
        assert!(bad.is_err());
    }

    #[test]
    fn order_serializes_camel_case() {
        let order = Order {
            id: OrderId::from("O1"),
            status: OrderStatus::Placed,
            items: vec![LineItem {
                name: "Lemonade".into(),
                price: 6.5,
            }],
            total: 6.5,
            tip: Some(1.0),
            discount_code: Some("SUN10".into()),
            location: crate::location::DEFAULT_COORDINATE,
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["discountCode"], "SUN10");
        assert_eq!(value["status"], "placed");
        assert!(value["location"]["latitude"].is_f64());
    }
}
