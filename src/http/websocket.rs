//! WebSocket echo handling.
//!
//! # Data Flow
//! ```text
//! Client ── Text(payload) ──→ Server
//! Client ←── Text("Echo: " + payload) ── Server
//! ```
//!
//! # Behaviour
//! - One message at a time per session, no cross-session state
//! - Binary frames close the session with 1003 (unsupported data)
//! - Messages over `websocket.max_message_bytes` close it with 1009 (too big)
//! - Ping/pong answered by the protocol layer
//! - Server shutdown closes open sessions with 1001 (going away)

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};

use crate::http::server::AppState;
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionKind, ConnectionTracker};
use crate::observability::metrics;

/// Reply sent for a text frame carrying `payload`.
pub fn echo_reply(payload: &str) -> String {
    format!("Echo: {payload}")
}

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.max_message_size(state.websocket.max_message_bytes)
        .on_failed_upgrade(|e| tracing::warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| echo_session(socket, state.connections, state.shutdown))
}

async fn echo_session(mut socket: WebSocket, connections: ConnectionTracker, shutdown: Shutdown) {
    let guard = connections.track(ConnectionKind::WebSocket);
    let session_id = guard.id();
    tracing::info!(session_id = %session_id, "WebSocket session opened");

    loop {
        let message = tokio::select! {
            message = socket.recv() => message,
            _ = shutdown.wait() => {
                close(&mut socket, close_code::AWAY, "server shutting down").await;
                break;
            }
        };

        match message {
            Some(Ok(Message::Text(text))) => {
                tracing::debug!(session_id = %session_id, len = text.len(), "Text frame received");
                let reply = echo_reply(text.as_str());
                if let Err(e) = socket.send(Message::Text(reply.into())).await {
                    tracing::warn!(session_id = %session_id, error = %e, "Failed to send echo");
                    break;
                }
                metrics::record_ws_message();
            }
            Some(Ok(Message::Binary(_))) => {
                tracing::debug!(session_id = %session_id, "Binary frame rejected");
                close(&mut socket, close_code::UNSUPPORTED, "Binary messages not supported").await;
                break;
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Close(frame))) => {
                tracing::debug!(session_id = %session_id, frame = ?frame, "Close frame received");
                break;
            }
            Some(Err(e)) if is_message_too_big(&e) => {
                tracing::debug!(session_id = %session_id, error = %e, "Oversized message rejected");
                close(&mut socket, close_code::SIZE, "Message too big").await;
                break;
            }
            Some(Err(e)) => {
                tracing::warn!(session_id = %session_id, error = %e, "WebSocket receive error");
                break;
            }
            None => break,
        }
    }

    tracing::info!(session_id = %session_id, "WebSocket session closed");
}

/// Whether a receive error is tungstenite's message size limit.
fn is_message_too_big(error: &axum::Error) -> bool {
    use tokio_tungstenite::tungstenite::Error as WsError;

    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = source {
        if let Some(WsError::Capacity(_)) = err.downcast_ref::<WsError>() {
            return true;
        }
        source = err.source();
    }
    // axum may be built against another tungstenite release than ours.
    let text = error.to_string();
    text.contains("Message too long") || text.contains("Space limit exceeded")
}

async fn close(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: reason.into(),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        tracing::debug!(error = %e, "Failed to send close frame");
    }
}
