//! `WebSocket` handler for the replay stream.
//!
//! Each socket is one consumer. On upgrade the connection is offered to
//! the [`ReplayController`]; if the replay cannot start (another consumer
//! owns the running session, or nothing is recorded at the start time) the
//! socket is closed with a close frame carrying the reason.
//!
//! Otherwise the handler forwards every message the engine queues on the
//! connection's [`ChannelTransport`] as a text frame, until the client
//! disconnects or a send fails. Either way the controller is told, which
//! stops the engine and caches the session for the next consumer.
//!
//! [`ReplayController`]: tickreplay_core::controller::ReplayController

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tickreplay_core::engine::ReplayError;
use tickreplay_core::storage::StorageQuery;
use tickreplay_core::transport::ChannelTransport;
use tickreplay_types::ConnectionId;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming the replay.
///
/// # Route
///
/// `GET <websocket_path>`
pub async fn ws_replay<S: StorageQuery>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Close code sent when the replay cannot be attached.
const fn rejection_code(err: &ReplayError) -> u16 {
    match err {
        ReplayError::SessionAlreadyRunning => close_code::AGAIN,
        ReplayError::NotFound { .. } => close_code::POLICY,
        _ => close_code::ERROR,
    }
}

/// Handle the `WebSocket` lifecycle for one consumer.
async fn handle_ws<S: StorageQuery>(mut socket: WebSocket, state: Arc<AppState<S>>) {
    let connection = ConnectionId::new();
    let (transport, mut outbound) = ChannelTransport::new();

    if let Err(e) = state
        .controller()
        .on_connect(connection, Arc::new(transport))
        .await
    {
        warn!(%connection, error = %e, "Rejecting replay consumer");
        let frame = CloseFrame {
            code: rejection_code(&e),
            reason: e.to_string().into(),
        };
        if socket.send(Message::Close(Some(frame))).await.is_err() {
            debug!(%connection, "Client gone before close frame was sent");
        }
        return;
    }

    state.connection_opened();
    info!(%connection, "Replay consumer attached");

    loop {
        tokio::select! {
            // Forward the next message queued by the engine.
            queued = outbound.recv() => {
                let Some(text) = queued else {
                    debug!(%connection, "Replay stream ended");
                    break;
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    debug!(%connection, "WebSocket client disconnected (send failed)");
                    break;
                }
            }
            // Check if the client sent a close frame or disconnected.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%connection, "WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%connection, "WebSocket client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%connection, "WebSocket error: {e}");
                        break;
                    }
                    _ => {
                        // Ignore other message types (text, binary from client).
                    }
                }
            }
        }
    }

    state.connection_closed();
    state.controller().on_disconnect(connection).await;
    info!(%connection, "Replay consumer detached");
}
