//! `WebSocket` handler for real-time snapshot streaming.
//!
//! Clients connect to `GET /ws` and receive a JSON-encoded
//! [`HmiUpdate`](crate::hub::HmiUpdate) text frame each time the state
//! coordinator commits a reading. The handler uses a
//! [`broadcast::Receiver`](tokio::sync::broadcast::Receiver) so all
//! connected clients see the same stream.
//!
//! If a client falls behind, lagged messages are silently skipped and
//! the client resumes from the most recent snapshot. Frames sent by the
//! client are ignored apart from close and ping.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming snapshot updates.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_updates(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: subscribe to the hub and forward
/// each update as a text frame.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut rx = state.hub.subscribe();
    debug!(
        subscribers = state.hub.subscriber_count(),
        "WebSocket client connected"
    );

    loop {
        tokio::select! {
            // Receive a committed snapshot from the hub.
            result = rx.recv() => {
                match result {
                    Ok(update) => {
                        let json = match serde_json::to_string(&update) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!("Failed to serialize hmi_update: {e}");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Broadcast channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            // Check if the client sent a close frame or disconnected.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {
                        // Commands from the client are not part of the protocol.
                    }
                }
            }
        }
    }
}
