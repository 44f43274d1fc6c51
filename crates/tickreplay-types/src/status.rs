//! Serializable snapshot of the replay session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::ReplayState;
use crate::ids::SessionId;
use crate::instrument::Instrument;

/// Point-in-time view of the replay session, served by the status API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Current lifecycle state.
    pub state: ReplayState,
    /// Session identifier, absent before the first start.
    pub session_id: Option<SessionId>,
    /// Instrument being replayed.
    pub instrument: Option<Instrument>,
    /// Virtual-time origin of the session.
    pub anchor_time: Option<DateTime<Utc>>,
    /// Elapsed virtual seconds since the anchor.
    pub virtual_offset: u64,
    /// Whether a reconnect will resume the cached session.
    pub needs_resume: bool,
    /// Number of buckets currently held in the window index.
    pub buffered_buckets: usize,
}

impl SessionStatus {
    /// Status reported before any session exists.
    pub const fn idle() -> Self {
        Self {
            state: ReplayState::Idle,
            session_id: None,
            instrument: None,
            anchor_time: None,
            virtual_offset: 0,
            needs_resume: false,
            buffered_buckets: 0,
        }
    }
}
