//! `GET /ws` — dashboard subscribers. Each connection gets its own hub
//! subscription, an initial-state replay, and a keepalive/deadline loop.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use mesh_core::time::now_ms;
use mesh_types::{MeshEvent, MeshEventType};
use serde_json::json;
use tokio::time::{interval, timeout};

use crate::state::AppState;

const WRITE_DEADLINE: Duration = Duration::from_secs(10);

pub fn create_ws_router(state: AppState) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (id, tx, mut rx) = state.hub.subscribe();

    // Initial-state replay: one synthesized node_registered event per
    // currently known worker, followed by a stats snapshot. Non-blocking —
    // nothing drains `rx` until the select loop below starts, so a
    // blocking `send` here would deadlock once the queue fills.
    for worker in state.registry.snapshot() {
        let _ = tx.try_send(MeshEvent::new(MeshEventType::NodeRegistered, now_ms(), json!(worker)));
    }
    let _ = tx.try_send(MeshEvent::new(
        MeshEventType::Stats,
        now_ms(),
        json!(state.stats.snapshot()),
    ));

    let mut keepalive = interval(Duration::from_secs(state.config.keepalive_interval_s));
    keepalive.tick().await; // the first tick fires immediately; consume it

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                let Ok(payload) = serde_json::to_string(&event) else { continue };
                if timeout(WRITE_DEADLINE, sender.send(Message::Text(payload))).await.is_err() {
                    break;
                }
            }
            _ = keepalive.tick() => {
                if timeout(WRITE_DEADLINE, sender.send(Message::Ping(Vec::new()))).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    // A well-behaved client may send unsolicited pings/pongs
                    // or text; we only care about detecting close/error.
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.hub.unsubscribe(id);
}
