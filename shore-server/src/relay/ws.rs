//! WebSocket 接入层
//!
//! 每个连接升级后拆成两个任务：写任务从中心信箱取事件序列化下发，
//! 读循环解析进站帧并分发给转发中心。任何一侧结束（对端关闭、解析
//! 不了的传输错误、服务端关闭信号）都会触发 disconnect 清理。
//!
//! 无法解析的帧只记日志丢弃，不断开连接。

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};

use shared::message::{ClientEvent, LocationRole};

use crate::core::ServerState;
use crate::relay::ParticipantId;

pub fn router() -> Router<ServerState> {
    Router::new().route("/ws", get(ws_handler))
}

async fn ws_handler(State(state): State<ServerState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: ServerState, socket: WebSocket) {
    let hub = state.relay();
    let (participant, mut mailbox) = hub.connect();
    let (mut sink, mut stream) = socket.split();

    // 写任务：信箱 -> socket
    let shutdown = hub.shutdown_token().clone();
    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                event = mailbox.recv() => {
                    let Some(event) = event else { break };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!("Failed to serialize relay event: {}", e);
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // 读循环：socket -> 转发中心
    let shutdown = hub.shutdown_token().clone();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        dispatch(&state, participant, text.as_str());
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong handled by axum, binary ignored
                    Some(Err(e)) => {
                        tracing::debug!(participant = %participant, "websocket error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    hub.disconnect(participant);
    writer.abort();
}

fn dispatch(state: &ServerState, participant: ParticipantId, text: &str) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(participant = %participant, "unparseable frame dropped: {}", e);
            return;
        }
    };

    let hub = state.relay();
    match event {
        ClientEvent::JoinOrder(order) => hub.join(participant, order),
        ClientEvent::DriverLocation(update) => {
            hub.emit_location(participant, LocationRole::Driver, update)
        }
        ClientEvent::CustomerLocation(update) => {
            hub.emit_location(participant, LocationRole::Customer, update)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use shared::order::OrderId;

    fn test_state() -> ServerState {
        ServerState::in_memory(Config::with_overrides("/tmp/unused", 0))
    }

    #[tokio::test]
    async fn test_malformed_frames_dropped_without_disconnecting() {
        let state = test_state();
        let hub = state.relay();
        let (participant, mut mailbox) = hub.connect();
        hub.join(participant, OrderId::from("O1"));

        dispatch(&state, participant, "not json at all");
        dispatch(&state, participant, r#"{"event":"teleport","data":{}}"#);
        dispatch(&state, participant, r#"{"event":"joinOrder"}"#);

        // the connection and its room membership survive bad frames
        assert_eq!(hub.connection_count(), 1);
        assert_eq!(hub.room_size(&OrderId::from("O1")), 1);
        assert!(mailbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_join_frame_adds_to_room() {
        let state = test_state();
        let hub = state.relay();
        let (participant, _mailbox) = hub.connect();

        dispatch(&state, participant, r#"{"event":"joinOrder","data":"O1"}"#);
        assert_eq!(hub.room_size(&OrderId::from("O1")), 1);
    }

    #[tokio::test]
    async fn test_location_frame_relayed_to_room() {
        let state = test_state();
        let hub = state.relay();
        let (driver, _driver_rx) = hub.connect();
        let (customer, mut customer_rx) = hub.connect();
        hub.join(driver, OrderId::from("O1"));
        hub.join(customer, OrderId::from("O1"));

        dispatch(
            &state,
            driver,
            r#"{"event":"driverLocation","data":{"orderId":"O1","latitude":33.9,"longitude":-118.41}}"#,
        );

        match customer_rx.try_recv().unwrap() {
            shared::message::ServerEvent::DriverLocation(update) => {
                assert_eq!(update.order_id, OrderId::from("O1"));
                assert_eq!(update.latitude, 33.9);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
