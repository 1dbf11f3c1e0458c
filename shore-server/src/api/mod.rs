//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查和转发指标
//! - [`orders`] - 订单生命周期接口
//!
//! 实时接入点 (`/ws`) 不在这里，见 [`crate::relay::ws`]。

pub mod health;
pub mod orders;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};
