//! Shared type definitions for the tick replay service.
//!
//! This crate is the single source of truth for the values that flow
//! between the storage layer, the replay engine, and the `WebSocket`
//! transport.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for sessions and connections
//! - [`bucket`] -- One-second bucket keys derived from record timestamps
//! - [`instrument`] -- Validated instrument identifiers
//! - [`record`] -- The immutable [`TickRecord`] read from the tick log
//! - [`enums`] -- Stream framing mode and replay session state
//! - [`status`] -- Serializable session status reported by the server

pub mod bucket;
pub mod enums;
pub mod ids;
pub mod instrument;
pub mod record;
pub mod status;

// Re-export all public types at crate root for convenience.
pub use bucket::BucketKey;
pub use enums::{ReplayState, StreamMode};
pub use ids::{ConnectionId, SessionId};
pub use instrument::{Instrument, InstrumentError};
pub use record::TickRecord;
pub use status::SessionStatus;
