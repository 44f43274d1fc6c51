//! Axum router construction for the replay server.
//!
//! Assembles the replay stream and the status endpoint into a single
//! [`Router`] with CORS and request tracing enabled.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tickreplay_core::storage::StorageQuery;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the replay server.
///
/// The router includes:
/// - `GET <websocket_path>` -- `WebSocket` replay stream
/// - `GET /api/status` -- replay session status
///
/// Any other path answers `404` with a JSON error body.
pub fn build_router<S: StorageQuery>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(state.websocket_path(), get(ws::ws_replay::<S>))
        .route("/api/status", get(handlers::get_status::<S>))
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
