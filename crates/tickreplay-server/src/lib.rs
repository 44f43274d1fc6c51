//! Replay server for the tick replay service.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (configurable, default `/`) streaming the
//!   replayed tick log to one consumer at a time
//! - **Status endpoint** (`GET /api/status`) reporting the replay session
//!
//! # Architecture
//!
//! Each upgraded socket gets a [`ChannelTransport`]. The connection is
//! handed to the [`ReplayController`], which starts or resumes the replay
//! engine; the socket task then drains the transport's channel into the
//! socket until either side goes away, at which point the controller
//! stops the engine.
//!
//! [`ChannelTransport`]: tickreplay_core::transport::ChannelTransport
//! [`ReplayController`]: tickreplay_core::controller::ReplayController

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, serve, start_server};
pub use state::AppState;
