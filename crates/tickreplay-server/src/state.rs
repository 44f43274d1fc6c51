//! Shared application state for the replay server.

use std::sync::atomic::{AtomicUsize, Ordering};

use tickreplay_core::controller::ReplayController;

/// State shared by every handler.
pub struct AppState<S> {
    controller: ReplayController<S>,
    websocket_path: String,
    active_connections: AtomicUsize,
}

impl<S> AppState<S> {
    /// Create state serving `controller` at `websocket_path`.
    pub fn new(controller: ReplayController<S>, websocket_path: &str) -> Self {
        Self {
            controller,
            websocket_path: websocket_path.to_owned(),
            active_connections: AtomicUsize::new(0),
        }
    }

    /// Return the replay controller.
    pub const fn controller(&self) -> &ReplayController<S> {
        &self.controller
    }

    /// Return the path the replay stream is served on.
    pub fn websocket_path(&self) -> &str {
        &self.websocket_path
    }

    /// Number of sockets currently attached to the replay stream.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Acquire)
    }

    pub(crate) fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn connection_closed(&self) {
        let _ = self
            .active_connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }
}
