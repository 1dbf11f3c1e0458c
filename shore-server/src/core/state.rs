use std::sync::Arc;

use shared::message::StatusUpdate;
use shared::order::Order;

use crate::core::Config;
use crate::relay::RelayHub;
use crate::store::OrderStore;
use crate::utils::AppError;

/// 服务器状态 - 持有所有服务的共享引用
///
/// ServerState 是整个服务的核心数据结构，clone 只是浅拷贝。
/// 显式构造（而非进程级单例）使测试可以各自持有隔离的实例。
///
/// # 组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | store | OrderStore | 订单持久化 |
/// | relay | Arc<RelayHub> | 按订单分房间的实时转发 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 订单存储
    pub store: OrderStore,
    /// 实时转发中心
    pub relay: Arc<RelayHub>,
}

impl ServerState {
    /// 创建服务器状态 (手动构造，测试常用)
    pub fn new(config: Config, store: OrderStore, relay: Arc<RelayHub>) -> Self {
        Self {
            config,
            store,
            relay,
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 数据目录（确保存在）
    /// 2. 订单存储（data_dir/orders.json，缺失或为空则从空集合开始）
    /// 3. 转发中心
    pub fn initialize(config: &Config) -> Result<Self, AppError> {
        config
            .ensure_data_dir()
            .map_err(|e| AppError::internal(format!("Failed to create data dir: {}", e)))?;

        let store = OrderStore::open(config.orders_path())?;
        let relay = Arc::new(RelayHub::new());

        Ok(Self::new(config.clone(), store, relay))
    }

    /// 构造全内存实例（无持久化，测试专用）
    pub fn in_memory(config: Config) -> Self {
        Self::new(config, OrderStore::open_in_memory(), Arc::new(RelayHub::new()))
    }

    /// 获取订单存储
    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    /// 获取转发中心
    pub fn relay(&self) -> &Arc<RelayHub> {
        &self.relay
    }

    /// 广播一次被接受的状态迁移
    ///
    /// 发往该订单房间的所有当前成员；空房间是 no-op。
    pub fn broadcast_status(&self, update: StatusUpdate) {
        self.relay.emit_status(update);
    }

    /// 向所有连接广播新订单
    pub fn broadcast_order_placed(&self, order: Order) {
        self.relay.broadcast_orders_updated(order);
    }
}
