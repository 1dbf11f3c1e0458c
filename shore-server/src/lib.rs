//! Shore Server - 海滩配送订单与实时位置转发服务
//!
//! # 架构概述
//!
//! 本模块是 Shore Server 的主入口，提供以下核心功能：
//!
//! - **转发中心** (`relay`): 按订单分房间的司机/顾客位置转发
//! - **订单存储** (`store`): JSON 快照文件支撑的订单表
//! - **HTTP API** (`api`): 订单生命周期的 RESTful 接口
//! - **WebSocket** (`relay::ws`): 追踪会话的实时边界
//!
//! # 模块结构
//!
//! ```text
//! shore-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── api/           # HTTP 路由和处理器
//! ├── relay/         # 转发中心与 WebSocket 边界
//! ├── store/         # 订单持久化
//! └── utils/         # 错误、日志等工具
//! ```

pub mod api;
pub mod core;
pub mod relay;
pub mod store;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerState};
pub use relay::{ParticipantId, RelayHub};
pub use store::OrderStore;
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
   _____ __
  / ___// /_  ____  ________
  \__ \/ __ \/ __ \/ ___/ _ \
 ___/ / / / / /_/ / /  /  __/
/____/_/ /_/\____/_/   \___/
    "#
    );
}
