//! Data layer for the tick replay service (`PostgreSQL`).
//!
//! The tick log is written by an external ingestion pipeline, one
//! `stock_<instrument>_raw` table per instrument. This crate only reads it:
//! [`TickStore`] answers the replay engine's window queries, and the
//! [`export`] module dumps one day of records to CSV.
//!
//! # Modules
//!
//! - [`postgres`] -- Read-only `PostgreSQL` connection pool and configuration
//! - [`tick_store`] -- [`StorageQuery`] implementation over the tick tables
//! - [`export`] -- Daily CSV export with gzip compression
//! - [`error`] -- Shared error types
//!
//! [`StorageQuery`]: tickreplay_core::storage::StorageQuery

pub mod error;
pub mod export;
pub mod postgres;
pub mod tick_store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use export::ExportSummary;
pub use postgres::{PostgresConfig, PostgresPool, PostgresTarget};
pub use tick_store::{TickRow, TickStore};
