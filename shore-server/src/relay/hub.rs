//! 转发中心核心实现
//!
//! # 职责
//!
//! - 连接管理 (connect, disconnect)
//! - 房间成员管理 (join, 隐式 leave)
//! - 事件扇出 (emit_location, emit_status, broadcast_orders_updated)
//!
//! # 并发模型
//!
//! 每个连接由独立任务驱动；房间/成员映射是唯一的共享可变状态，
//! 所有变更与扇出都在 DashMap 的 per-key entry 锁下串行化，一个
//! 房间内的事件因此有单一全序，并发的 join 也不会看到半投递的
//! 事件。不同订单的操作不会在同一把锁上竞争。
//!
//! # 投递语义
//!
//! 尽力而为，最新值优先：空房间的事件直接丢弃（不是错误），对单个
//! 成员的投递失败只计数并摘除该连接，不影响其余成员，也不会让
//! 触发方失败。不为晚加入者重放。

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use shared::location::Coordinate;
use shared::message::{LocationRole, LocationUpdate, ServerEvent, StatusUpdate};
use shared::order::{Order, OrderId};

use super::metrics::RelayMetrics;

/// 参与者标识 - 每个打开的连接一个
///
/// The relay does not distinguish identity beyond this handle; the
/// driver/customer role travels in the event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 转发中心 - 按订单分房间的事件扇出
///
/// Explicitly constructed (no process-wide singleton); tests hold as many
/// isolated hubs as they need.
#[derive(Debug)]
pub struct RelayHub {
    /// 每个连接的信箱 (Participant ID -> mpsc sender)
    connections: DashMap<ParticipantId, mpsc::UnboundedSender<ServerEvent>>,
    /// 房间成员表，按订单 ID 分键；房间随最后一个成员离开而消失
    rooms: DashMap<OrderId, Vec<ParticipantId>>,
    /// 反向索引：参与者当前所在的房间（至多一个）
    membership: DashMap<ParticipantId, OrderId>,
    /// 关闭信号令牌
    shutdown_token: CancellationToken,
    /// 计数器 (joins / broadcasts / deliveries / drops)
    metrics: Arc<RelayMetrics>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
            membership: DashMap::new(),
            shutdown_token: CancellationToken::new(),
            metrics: Arc::new(RelayMetrics::default()),
        }
    }

    // ========== Connection Management ==========

    /// Register a new connection; returns its id and mailbox receiver.
    pub fn connect(&self) -> (ParticipantId, mpsc::UnboundedReceiver<ServerEvent>) {
        let participant = ParticipantId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.insert(participant, tx);
        tracing::debug!(participant = %participant, "participant connected");
        (participant, rx)
    }

    /// Implicit leave: drop the connection and its room membership.
    ///
    /// Safe to call at any point, including for ids already gone.
    pub fn disconnect(&self, participant: ParticipantId) {
        self.connections.remove(&participant);
        if let Some((_, order)) = self.membership.remove(&participant) {
            self.remove_member(&order, participant);
        }
        tracing::debug!(participant = %participant, "participant disconnected");
    }

    // ========== Rooms ==========

    /// Add a participant to an order's room.
    ///
    /// The room is created lazily; order ids unknown to the store are
    /// accepted (validation is the caller's business). A participant
    /// belongs to at most one room, so joining again moves it.
    pub fn join(&self, participant: ParticipantId, order: OrderId) {
        if let Some(previous) = self.membership.insert(participant, order.clone())
            && previous != order
        {
            self.remove_member(&previous, participant);
        }

        let mut members = self.rooms.entry(order.clone()).or_default();
        if !members.contains(&participant) {
            members.push(participant);
        }
        drop(members);

        self.metrics.record_join();
        tracing::debug!(participant = %participant, order_id = %order, "joined room");
    }

    fn remove_member(&self, order: &OrderId, participant: ParticipantId) {
        if let Some(mut members) = self.rooms.get_mut(order) {
            members.retain(|m| *m != participant);
            drop(members);
            // rooms are ephemeral: drop the entry once empty, unless a
            // concurrent join repopulated it first
            self.rooms.remove_if(order, |_, members| members.is_empty());
        }
    }

    /// Current member count of an order's room
    pub fn room_size(&self, order: &OrderId) -> usize {
        self.rooms.get(order).map(|m| m.len()).unwrap_or(0)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    // ========== Fan-out ==========

    /// Relay a location update to every *other* member of its order's room.
    ///
    /// The coordinate passes through the single normalization boundary so
    /// recipients always see the canonical pair; the payload shape
    /// (orderId included) is otherwise relayed verbatim.
    pub fn emit_location(
        &self,
        sender: ParticipantId,
        role: LocationRole,
        update: LocationUpdate,
    ) {
        let canonical = Coordinate::new(update.latitude, update.longitude);
        let update = LocationUpdate {
            order_id: update.order_id,
            latitude: canonical.latitude,
            longitude: canonical.longitude,
        };
        let order = update.order_id.clone();
        self.broadcast_room(&order, role.event(update), Some(sender));
    }

    /// Broadcast an accepted status transition to the whole room.
    ///
    /// The trigger is the HTTP status-update handler, never a room member,
    /// so nobody is excluded.
    pub fn emit_status(&self, update: StatusUpdate) {
        let order = update.order_id.clone();
        self.broadcast_room(&order, ServerEvent::OrderStatusUpdated(update), None);
    }

    /// Broadcast a newly placed order to every connection, joined or not.
    pub fn broadcast_orders_updated(&self, order: Order) {
        let event = ServerEvent::OrdersUpdated(order);
        self.metrics.record_broadcast();

        let mut dead = Vec::new();
        for entry in self.connections.iter() {
            if entry.value().send(event.clone()).is_ok() {
                self.metrics.record_delivery();
            } else {
                self.metrics.record_drop();
                dead.push(*entry.key());
            }
        }
        for participant in dead {
            self.disconnect(participant);
        }
    }

    /// Fan an event out to a room's current members.
    ///
    /// Holds the room's entry lock for the duration of the (non-blocking)
    /// sends, so concurrent emits to one room serialize into a single
    /// delivery order and every member sees one consistent member set.
    /// Rooms are independent keys and never contend with each other.
    /// An empty or absent room is a no-op.
    fn broadcast_room(&self, order: &OrderId, event: ServerEvent, exclude: Option<ParticipantId>) {
        let mut dead = Vec::new();
        {
            let Some(members) = self.rooms.get_mut(order) else {
                return;
            };

            self.metrics.record_broadcast();

            for member in members.iter() {
                if exclude == Some(*member) {
                    continue;
                }
                let delivered = self
                    .connections
                    .get(member)
                    .map(|tx| tx.send(event.clone()).is_ok())
                    .unwrap_or(false);
                if delivered {
                    self.metrics.record_delivery();
                } else {
                    // the member's task is gone; swallow, count, prune
                    self.metrics.record_drop();
                    dead.push(*member);
                }
            }
        }
        for participant in dead {
            self.disconnect(participant);
        }
    }

    // ========== Lifecycle ==========

    /// 获取关闭令牌 (连接任务监听此信号)
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// 优雅关闭转发中心，取消所有连接任务
    pub fn shutdown(&self) {
        tracing::info!("Shutting down relay hub");
        self.shutdown_token.cancel();
    }

    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::ClientEvent;

    fn update(order: &str, latitude: f64, longitude: f64) -> LocationUpdate {
        LocationUpdate {
            order_id: OrderId::from(order),
            latitude,
            longitude,
        }
    }

    #[tokio::test]
    async fn test_fan_out_excludes_sender() {
        let hub = RelayHub::new();
        let order = OrderId::from("O1");

        let (driver, mut driver_rx) = hub.connect();
        let (c1, mut c1_rx) = hub.connect();
        let (c2, mut c2_rx) = hub.connect();
        hub.join(driver, order.clone());
        hub.join(c1, order.clone());
        hub.join(c2, order.clone());

        hub.emit_location(driver, LocationRole::Driver, update("O1", 33.9, -118.41));

        let expected = ServerEvent::DriverLocation(update("O1", 33.9, -118.41));
        assert_eq!(c1_rx.try_recv().unwrap(), expected);
        assert_eq!(c2_rx.try_recv().unwrap(), expected);
        // never back to the sender
        assert!(driver_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_room_isolation() {
        let hub = RelayHub::new();

        let (d1, _d1_rx) = hub.connect();
        let (c1, mut c1_rx) = hub.connect();
        let (other, mut other_rx) = hub.connect();
        hub.join(d1, OrderId::from("O1"));
        hub.join(c1, OrderId::from("O1"));
        hub.join(other, OrderId::from("O2"));

        hub.emit_location(d1, LocationRole::Driver, update("O1", 33.9, -118.41));

        assert!(c1_rx.try_recv().is_ok());
        // a participant joined only to O2 receives nothing
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_late_join_misses_earlier_events() {
        let hub = RelayHub::new();
        let order = OrderId::from("O1");

        let (d1, _d1_rx) = hub.connect();
        let (c1, mut c1_rx) = hub.connect();
        hub.join(d1, order.clone());
        hub.join(c1, order.clone());

        hub.emit_location(d1, LocationRole::Driver, update("O1", 33.9, -118.41));

        let (late, mut late_rx) = hub.connect();
        hub.join(late, order.clone());

        hub.emit_location(d1, LocationRole::Driver, update("O1", 33.91, -118.42));

        // late joiner only sees the second event
        assert_eq!(
            late_rx.try_recv().unwrap(),
            ServerEvent::DriverLocation(update("O1", 33.91, -118.42))
        );
        assert!(late_rx.try_recv().is_err());

        // existing member saw both, in order
        assert_eq!(
            c1_rx.try_recv().unwrap(),
            ServerEvent::DriverLocation(update("O1", 33.9, -118.41))
        );
        assert_eq!(
            c1_rx.try_recv().unwrap(),
            ServerEvent::DriverLocation(update("O1", 33.91, -118.42))
        );
    }

    #[tokio::test]
    async fn test_disconnected_member_does_not_break_broadcast() {
        let hub = RelayHub::new();
        let order = OrderId::from("O1");

        let (d1, _d1_rx) = hub.connect();
        let (gone, gone_rx) = hub.connect();
        let (alive, mut alive_rx) = hub.connect();
        hub.join(d1, order.clone());
        hub.join(gone, order.clone());
        hub.join(alive, order.clone());

        // simulate an abrupt disconnect: the mailbox receiver is dropped
        // without the hub hearing about it
        drop(gone_rx);

        hub.emit_location(d1, LocationRole::Driver, update("O1", 33.9, -118.41));

        // remaining member still got the event
        assert!(alive_rx.try_recv().is_ok());
        // the dead connection was pruned
        assert_eq!(hub.room_size(&order), 2);
        assert_eq!(hub.metrics().snapshot().drops, 1);
    }

    #[tokio::test]
    async fn test_status_broadcast_reaches_all_members() {
        let hub = RelayHub::new();
        let order = OrderId::from("O1");

        let (d1, mut d1_rx) = hub.connect();
        let (c1, mut c1_rx) = hub.connect();
        hub.join(d1, order.clone());
        hub.join(c1, order.clone());

        hub.emit_status(StatusUpdate {
            order_id: order.clone(),
            status: shared::order::OrderStatus::EnRoute,
        });

        for rx in [&mut d1_rx, &mut c1_rx] {
            match rx.try_recv().unwrap() {
                ServerEvent::OrderStatusUpdated(update) => {
                    assert_eq!(update.order_id, order);
                    assert_eq!(update.status, shared::order::OrderStatus::EnRoute);
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_emit_to_empty_room_is_noop() {
        let hub = RelayHub::new();
        let (d1, _d1_rx) = hub.connect();

        // d1 never joined; the room does not exist
        hub.emit_location(d1, LocationRole::Driver, update("O1", 33.9, -118.41));
        hub.emit_status(StatusUpdate {
            order_id: OrderId::from("O1"),
            status: shared::order::OrderStatus::Delivered,
        });

        assert_eq!(hub.metrics().snapshot().broadcasts, 0);
    }

    #[tokio::test]
    async fn test_join_moves_between_rooms() {
        let hub = RelayHub::new();
        let (p, _rx) = hub.connect();

        hub.join(p, OrderId::from("O1"));
        assert_eq!(hub.room_size(&OrderId::from("O1")), 1);

        // joining a new room leaves the previous one implicitly
        hub.join(p, OrderId::from("O2"));
        assert_eq!(hub.room_size(&OrderId::from("O1")), 0);
        assert_eq!(hub.room_size(&OrderId::from("O2")), 1);

        // re-joining the same room does not duplicate membership
        hub.join(p, OrderId::from("O2"));
        assert_eq!(hub.room_size(&OrderId::from("O2")), 1);
    }

    #[tokio::test]
    async fn test_disconnect_is_implicit_leave() {
        let hub = RelayHub::new();
        let order = OrderId::from("O1");

        let (p, _rx) = hub.connect();
        hub.join(p, order.clone());
        assert_eq!(hub.connection_count(), 1);

        hub.disconnect(p);
        assert_eq!(hub.connection_count(), 0);
        assert_eq!(hub.room_size(&order), 0);

        // idempotent
        hub.disconnect(p);
    }

    #[tokio::test]
    async fn test_orders_updated_reaches_unjoined_connections() {
        let hub = RelayHub::new();

        let (_joined, mut joined_rx) = {
            let (p, rx) = hub.connect();
            hub.join(p, OrderId::from("O1"));
            (p, rx)
        };
        let (_lobby, mut lobby_rx) = hub.connect();

        let order = Order {
            id: OrderId::from("O9"),
            status: shared::order::OrderStatus::Placed,
            items: vec![],
            total: 0.0,
            tip: None,
            discount_code: None,
            location: shared::location::DEFAULT_COORDINATE,
            timestamp: chrono::Utc::now(),
        };
        hub.broadcast_orders_updated(order.clone());

        for rx in [&mut joined_rx, &mut lobby_rx] {
            match rx.try_recv().unwrap() {
                ServerEvent::OrdersUpdated(received) => assert_eq!(received.id, order.id),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_location_event_payload_matches_wire_contract() {
        // the event a member receives serializes exactly as the tracker expects
        let hub = RelayHub::new();
        let order = OrderId::from("O1");

        let (d, _d_rx) = hub.connect();
        let (c, mut c_rx) = hub.connect();
        hub.join(d, order.clone());
        hub.join(c, order.clone());

        // same frame a driver app would send
        let frame: ClientEvent = serde_json::from_str(
            r#"{"event":"driverLocation","data":{"orderId":"O1","latitude":33.9,"longitude":-118.41}}"#,
        )
        .unwrap();
        let ClientEvent::DriverLocation(incoming) = frame else {
            panic!("wrong event");
        };
        hub.emit_location(d, LocationRole::Driver, incoming);

        let received = c_rx.try_recv().unwrap();
        let wire = serde_json::to_value(&received).unwrap();
        assert_eq!(wire["event"], "driverLocation");
        assert_eq!(wire["data"]["orderId"], "O1");
        assert_eq!(wire["data"]["latitude"], 33.9);
        assert_eq!(wire["data"]["longitude"], -118.41);
    }
}
