//! Maps transport lifecycle events onto engine operations.
//!
//! One consumer at a time owns the replay. Connecting starts a session (or
//! resumes a stopped one); disconnecting the owning connection stops it.
//! A connection that arrives while another one owns a running session is
//! rejected, and its later disconnect leaves the owner's session alone.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tickreplay_types::{ConnectionId, Instrument, SessionId, SessionStatus};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::engine::{ReplayEngine, ReplayError};
use crate::storage::StorageQuery;
use crate::transport::TransportSession;

/// Connection-driven front end for a [`ReplayEngine`].
pub struct ReplayController<S> {
    engine: Arc<ReplayEngine<S>>,
    instrument: Instrument,
    start_time: DateTime<Utc>,
    owner: Mutex<Option<ConnectionId>>,
}

impl<S: StorageQuery> ReplayController<S> {
    /// Create a controller replaying `instrument` from `start_time`.
    pub fn new(
        engine: Arc<ReplayEngine<S>>,
        instrument: Instrument,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            engine,
            instrument,
            start_time,
            owner: Mutex::new(None),
        }
    }

    /// Return the underlying engine.
    pub const fn engine(&self) -> &Arc<ReplayEngine<S>> {
        &self.engine
    }

    /// Return the configured instrument.
    pub const fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    /// Handle a new consumer connection.
    ///
    /// Resumes the stopped session if there is one, otherwise starts a
    /// fresh session at the configured start time. On success the
    /// connection becomes the session owner.
    ///
    /// # Errors
    ///
    /// Propagates [`ReplayError`] from the engine. In particular a
    /// connection arriving while a session runs gets
    /// [`ReplayError::SessionAlreadyRunning`].
    pub async fn on_connect(
        &self,
        connection: ConnectionId,
        transport: Arc<dyn TransportSession>,
    ) -> Result<SessionId, ReplayError> {
        let mut owner = self.owner.lock().await;
        let status = self.engine.status().await;

        let session_id = if status.needs_resume {
            info!(%connection, "Consumer connected, resuming session");
            self.engine.resume(transport).await?
        } else {
            info!(%connection, instrument = %self.instrument, "Consumer connected, starting session");
            self.engine
                .start(self.instrument.clone(), self.start_time, transport)
                .await?
        };

        *owner = Some(connection);
        Ok(session_id)
    }

    /// Handle a consumer disconnect.
    ///
    /// Stops the session only if `connection` owns it. Returns whether the
    /// session was stopped.
    pub async fn on_disconnect(&self, connection: ConnectionId) -> bool {
        let mut owner = self.owner.lock().await;
        if *owner != Some(connection) {
            debug!(%connection, "Non-owning connection closed");
            return false;
        }
        *owner = None;
        match self.engine.stop().await {
            Ok(()) => {
                info!(%connection, "Consumer disconnected, session stopped");
                true
            }
            Err(e) => {
                debug!(%connection, error = %e, "Nothing to stop on disconnect");
                false
            }
        }
    }

    /// Return a snapshot of the session.
    pub async fn status(&self) -> SessionStatus {
        self.engine.status().await
    }
}
