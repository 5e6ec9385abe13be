//! WebSocket endpoint: session lifecycle, JSON dispatch, heartbeat.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::{ClientMessage, ErrorCode, PlayerId, ServerMessage};

use super::connection::ConnectionManager;
use super::registry::RoomRegistry;

const LOG_TARGET: &str = "server::ws";

/// Longer than worst-case proof generation: proving may block the client's
/// event loop for tens of seconds, and a ping it cannot answer must not
/// kill the session.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(45);
const MAX_MISSED_PONGS: u8 = 2;

#[derive(Clone)]
pub struct AppState {
    pub connections: Arc<ConnectionManager>,
    pub registry: Arc<RoomRegistry>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let player: PlayerId = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.connections.register(player, tx);
    state
        .connections
        .send(&player, ServerMessage::Connected { player_id: player });
    info!(target: LOG_TARGET, %player, "session opened");

    let missed_pongs = Arc::new(AtomicU8::new(0));

    // Writer: outbound messages plus the heartbeat.
    let writer_missed = Arc::clone(&missed_pongs);
    let mut writer = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                message = rx.recv() => {
                    let Some(message) = message else { break };
                    let text = match serde_json::to_string(&message) {
                        Ok(text) => text,
                        Err(err) => {
                            warn!(target: LOG_TARGET, error = %err, "outbound encode failed");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    let missed = writer_missed.fetch_add(1, Ordering::Relaxed);
                    if missed >= MAX_MISSED_PONGS {
                        debug!(target: LOG_TARGET, "heartbeat missed twice, closing");
                        break;
                    }
                    if sink.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Reader: inbound frames dispatch into the room layer.
    loop {
        tokio::select! {
            _ = &mut writer => break,
            frame = stream.next() => {
                let Some(Ok(frame)) = frame else { break };
                match frame {
                    Message::Text(text) => {
                        missed_pongs.store(0, Ordering::Relaxed);
                        dispatch(&state, player, &text);
                    }
                    Message::Pong(_) => {
                        missed_pongs.store(0, Ordering::Relaxed);
                    }
                    Message::Ping(payload) => {
                        // axum answers pings itself; nothing to do beyond
                        // treating it as liveness.
                        let _ = payload;
                        missed_pongs.store(0, Ordering::Relaxed);
                    }
                    Message::Close(_) => break,
                    Message::Binary(_) => {
                        state.connections.send(
                            &player,
                            ErrorCode::InvalidMessage.message("binary frames unsupported"),
                        );
                    }
                }
            }
        }
    }

    info!(target: LOG_TARGET, %player, "session closed");
    state.registry.disconnect(player);
    state.connections.unregister(&player);
}

fn dispatch(state: &AppState, player: PlayerId, text: &str) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            state
                .connections
                .send(&player, ErrorCode::InvalidMessage.message(err.to_string()));
            return;
        }
    };
    if matches!(message, ClientMessage::JoinRoom { .. }) {
        state.registry.join(player, message);
    } else {
        state.registry.route(player, message);
    }
}
