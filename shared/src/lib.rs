//! Shore 共享类型库
//!
//! 服务端与客户端（司机端/顾客端追踪页面）共用的类型：
//!
//! - **坐标归一化** (`location`): 把多种历史位置格式统一为规范坐标
//! - **订单模型** (`order`): 订单记录与状态机
//! - **实时消息** (`message`): 位置转发与状态广播的线上契约
//! - **工具函数** (`util`): 时间戳与 ID 生成

pub mod location;
pub mod message;
pub mod order;
pub mod util;

// Re-export 公共类型
pub use location::{Coordinate, DEFAULT_COORDINATE, RawLocation, normalize};
pub use message::{ClientEvent, LocationRole, LocationUpdate, ServerEvent, StatusUpdate};
pub use order::{InvalidTransition, LineItem, Order, OrderId, OrderStatus};
