//! Virtual clock, window index, and replay engine for the tick replay service.
//!
//! This crate owns the time-ordered replay of a recorded tick log: one
//! emission per virtual second, fed by a prefetch pipeline that keeps an
//! in-memory window of upcoming buckets ahead of the clock.
//!
//! # Modules
//!
//! - [`clock`] -- Virtual clock: anchor plus monotone offset.
//! - [`config`] -- Configuration loading from `tickreplay-config.yaml` into
//!   strongly-typed structs.
//! - [`controller`] -- [`ReplayController`] mapping connect/disconnect onto
//!   engine operations.
//! - [`engine`] -- [`ReplayEngine`] with the emission and prefetch timers.
//! - [`frame`] -- Per-record and batched wire framing.
//! - [`storage`] -- [`StorageQuery`] trait and the in-memory [`MemoryStore`].
//! - [`transport`] -- [`TransportSession`] trait and [`ChannelTransport`].
//! - [`window`] -- [`WindowIndex`] of pending buckets and tombstones.
//!
//! [`ReplayController`]: controller::ReplayController
//! [`ReplayEngine`]: engine::ReplayEngine
//! [`StorageQuery`]: storage::StorageQuery
//! [`MemoryStore`]: storage::MemoryStore
//! [`TransportSession`]: transport::TransportSession
//! [`ChannelTransport`]: transport::ChannelTransport
//! [`WindowIndex`]: window::WindowIndex

pub mod clock;
pub mod config;
pub mod controller;
pub mod engine;
pub mod frame;
pub mod storage;
pub mod transport;
pub mod window;
