//! Enumeration types shared by the engine and the transport.

use serde::{Deserialize, Serialize};

/// How the records of one virtual second are framed on the wire.
///
/// A deployment picks one mode and uses it for every connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamMode {
    /// One message per record, carrying the raw payload verbatim.
    #[default]
    PerRecord,
    /// One message per non-empty second, carrying a JSON array of payloads.
    Batched,
}

/// Lifecycle state of the replay session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayState {
    /// No session has been started yet.
    #[default]
    Idle,
    /// Timers are active and buckets are being emitted.
    Running,
    /// Timers are cancelled; the session is cached for resume.
    Stopped,
}
