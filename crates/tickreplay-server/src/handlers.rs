//! HTTP handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::Uri;
use serde::Serialize;
use tickreplay_core::storage::StorageQuery;
use tickreplay_types::SessionStatus;

use crate::error::ApiError;
use crate::state::AppState;

/// Body of `GET /api/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// Session snapshot.
    #[serde(flatten)]
    pub session: SessionStatus,
    /// Sockets attached to the replay stream.
    pub active_connections: usize,
}

/// Report the replay session status.
///
/// # Route
///
/// `GET /api/status`
pub async fn get_status<S: StorageQuery>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<StatusResponse> {
    Json(StatusResponse {
        session: state.controller().status().await,
        active_connections: state.active_connections(),
    })
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_owned())
}
