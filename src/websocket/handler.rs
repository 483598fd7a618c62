//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and manages the connection lifecycle.

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

use super::connection::{Connection, ConnectionError};
use crate::api::AppState;
use crate::emotion::EmotionService;

/// WebSocket upgrade handler
///
/// This is the entry point for WebSocket connections.
/// It upgrades the HTTP connection to WebSocket and starts message handling.
/// A failed upgrade is rejected by axum before this task ever starts.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let ingest = Arc::clone(&state.ingest);
    ws.on_upgrade(move |socket| handle_socket(socket, ingest))
}

/// Write half of a socket, guarded so writes never interleave
struct WsConnection {
    sink: Mutex<SplitSink<WebSocket, Message>>,
    /// Fired by the hub when it drops this member
    shutdown: Notify,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&self, payload: &str) -> Result<(), ConnectionError> {
        self.sink
            .lock()
            .await
            .send(Message::Text(payload.to_string()))
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))
    }

    /// Stops the read loop, which then drops both halves of the socket.
    /// The sink is not touched: after a timed-out write it may still be
    /// locked or unable to flush.
    async fn close(&self) {
        self.shutdown.notify_one();
    }
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, ingest: Arc<EmotionService>) {
    let (sender, mut receiver) = socket.split();
    let connection = Arc::new(WsConnection {
        sink: Mutex::new(sender),
        shutdown: Notify::new(),
    });

    let hub = ingest.hub().clone();
    let connection_id = match hub.register(connection.clone()).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register WebSocket connection");
            return;
        }
    };

    loop {
        let result = tokio::select! {
            _ = connection.shutdown.notified() => {
                tracing::debug!(connection_id = %connection_id, "Connection dropped by hub");
                break;
            }
            next = receiver.next() => match next {
                Some(result) => result,
                None => break,
            },
        };

        match result {
            Ok(msg) => {
                if !handle_ws_message(&ingest, &connection_id, msg).await {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(
                    connection_id = %connection_id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
        }
    }

    // No-op when the hub already removed us
    hub.unregister(&connection_id).await;
}

/// Handle a received WebSocket message
///
/// Returns false if the connection should be closed.
async fn handle_ws_message(ingest: &EmotionService, connection_id: &str, message: Message) -> bool {
    match message {
        Message::Text(text) => {
            ingest_frame(ingest, connection_id, text.as_bytes()).await;
            true
        }
        Message::Binary(bytes) => {
            ingest_frame(ingest, connection_id, &bytes).await;
            true
        }
        Message::Ping(_) | Message::Pong(_) => {
            // Axum answers pings automatically
            true
        }
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Client requested close");
            false
        }
    }
}

async fn ingest_frame(ingest: &EmotionService, connection_id: &str, bytes: &[u8]) {
    if let Err(e) = ingest.process(bytes).await {
        // Bad frames are dropped; the connection stays open
        tracing::warn!(
            connection_id = %connection_id,
            error = %e,
            bytes = bytes.len(),
            "Invalid emotion reading"
        );
    }
}
