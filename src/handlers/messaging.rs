//! Real-time messaging handler.
//!
//! # Data Flow
//! ```text
//! Client A ──frame──▶ session A ──▶ broadcast channel ──▶ session A, B, C ──▶ clients
//! ```
//!
//! Every text or binary frame is fanned out to every connected session,
//! the sender included. Ping/pong is answered by the WebSocket layer.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Shared fan-out hub.
#[derive(Clone, Debug)]
pub struct MessagingHub {
    tx: broadcast::Sender<Message>,
    next_session: Arc<AtomicU64>,
}

impl MessagingHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            next_session: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Number of connected sessions.
    pub fn sessions(&self) -> usize {
        self.tx.receiver_count()
    }

    async fn serve(self, socket: WebSocket) {
        let session = self.next_session.fetch_add(1, Ordering::Relaxed);
        let (mut sink, mut stream) = socket.split();
        let mut rx = self.tx.subscribe();
        tracing::debug!(session, sessions = self.sessions(), "Messaging session opened");

        let mut send_task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(message) => {
                        if sink.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(session, skipped, "Messaging session lagging, frames dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let tx = self.tx.clone();
        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(message)) = stream.next().await {
                match message {
                    Message::Text(_) | Message::Binary(_) => {
                        // No receivers is not an error: the sender itself just left.
                        let _ = tx.send(message);
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });

        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }
        tracing::debug!(session, "Messaging session closed");
    }
}

impl Default for MessagingHub {
    fn default() -> Self {
        Self::new()
    }
}

async fn messaging_handler(
    State(hub): State<MessagingHub>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match upgrade {
        Ok(ws) => ws.on_upgrade(move |socket| hub.serve(socket)),
        Err(rejection) => {
            tracing::debug!(reason = %rejection, "Non-upgrade request reached messaging handler");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "websocket_upgrade_required" })),
            )
                .into_response()
        }
    }
}

/// Router accepting upgrades on any path.
pub fn router(hub: MessagingHub) -> Router {
    Router::new().fallback(messaging_handler).with_state(hub)
}
