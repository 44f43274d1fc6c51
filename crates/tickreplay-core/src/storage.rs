//! Read-only query contract over the persisted tick log.
//!
//! [`StorageQuery`] is the only way the engine touches storage. It is
//! stateless and side-effect free: the same arguments always re-read the
//! same rows, which is what makes overlapping prefetch windows safe.
//!
//! [`MemoryStore`] implements the contract over an in-memory vector. It
//! supports injected latency and an availability switch so the engine's
//! degradation paths can be exercised without a database.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tickreplay_types::{Instrument, TickRecord};

/// Default cap on the number of records a single window query returns.
pub const DEFAULT_MAX_WINDOW_RECORDS: usize = 10_000;

/// Errors returned by [`StorageQuery`] implementations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// No record exists at or after the requested instant.
    #[error("no record for instrument {instrument} at or after {from}")]
    NotFound {
        /// Instrument that was queried.
        instrument: Instrument,
        /// Lower bound of the query.
        from: DateTime<Utc>,
    },

    /// The backend failed transiently (connection lost, timeout, ...).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Read-only queries over the tick log.
///
/// The engine holds the implementation in an `Arc` and issues prefetch
/// queries from detached tasks.
pub trait StorageQuery: Send + Sync + 'static {
    /// Return the timestamp of the earliest record (in sequence order)
    /// with `timestamp >= from`.
    ///
    /// Fails with [`StorageError::NotFound`] if no such record exists.
    fn first_timestamp_at_or_after(
        &self,
        instrument: &Instrument,
        from: DateTime<Utc>,
    ) -> impl Future<Output = Result<DateTime<Utc>, StorageError>> + Send;

    /// Return every record with `from <= timestamp < from + duration_seconds`,
    /// ordered by sequence id and capped at a fixed cardinality. Records past
    /// the cap are silently dropped.
    fn records_in_window(
        &self,
        instrument: &Instrument,
        from: DateTime<Utc>,
        duration_seconds: u32,
    ) -> impl Future<Output = Result<Vec<TickRecord>, StorageError>> + Send;
}

/// Compute the exclusive upper bound of a window query.
///
/// # Errors
///
/// Returns [`StorageError::Unavailable`] if the bound is not representable.
pub fn window_end(from: DateTime<Utc>, duration_seconds: u32) -> Result<DateTime<Utc>, StorageError> {
    from.checked_add_signed(TimeDelta::seconds(i64::from(duration_seconds)))
        .ok_or_else(|| StorageError::Unavailable(format!("window end overflows after {from}")))
}

/// In-memory [`StorageQuery`] implementation.
///
/// Records are kept per instrument in sequence order. Every query bumps a
/// counter so tests can assert how often storage was consulted.
#[derive(Debug)]
pub struct MemoryStore {
    instrument: Instrument,
    records: Vec<TickRecord>,
    latency: Duration,
    max_window_records: usize,
    unavailable: AtomicBool,
    window_queries: AtomicU64,
}

impl MemoryStore {
    /// Create a store holding `records` for `instrument`.
    pub fn new(instrument: Instrument, mut records: Vec<TickRecord>) -> Self {
        records.sort_by_key(|r| r.sequence_id);
        Self {
            instrument,
            records,
            latency: Duration::ZERO,
            max_window_records: DEFAULT_MAX_WINDOW_RECORDS,
            unavailable: AtomicBool::new(false),
            window_queries: AtomicU64::new(0),
        }
    }

    /// Delay every query by `latency` before answering.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Set the cap on records returned by one window query.
    #[must_use]
    pub const fn with_max_window_records(mut self, max: usize) -> Self {
        self.max_window_records = max;
        self
    }

    /// Make subsequent queries fail with [`StorageError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    /// Number of [`StorageQuery::records_in_window`] calls served so far.
    pub fn window_queries(&self) -> u64 {
        self.window_queries.load(Ordering::Acquire)
    }

    async fn simulate_latency(&self) -> Result<(), StorageError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.unavailable.load(Ordering::Acquire) {
            return Err(StorageError::Unavailable("memory store switched off".to_owned()));
        }
        Ok(())
    }

    fn records_for<'a>(&'a self, instrument: &'a Instrument) -> impl Iterator<Item = &'a TickRecord> {
        let matches = &self.instrument == instrument;
        self.records.iter().filter(move |_| matches)
    }
}

impl StorageQuery for MemoryStore {
    async fn first_timestamp_at_or_after(
        &self,
        instrument: &Instrument,
        from: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, StorageError> {
        self.simulate_latency().await?;
        self.records_for(instrument)
            .find(|r| r.timestamp >= from)
            .map(|r| r.timestamp)
            .ok_or_else(|| StorageError::NotFound {
                instrument: instrument.clone(),
                from,
            })
    }

    async fn records_in_window(
        &self,
        instrument: &Instrument,
        from: DateTime<Utc>,
        duration_seconds: u32,
    ) -> Result<Vec<TickRecord>, StorageError> {
        self.window_queries.fetch_add(1, Ordering::AcqRel);
        self.simulate_latency().await?;
        let until = window_end(from, duration_seconds)?;
        Ok(self
            .records_for(instrument)
            .filter(|r| r.timestamp >= from && r.timestamp < until)
            .take(self.max_window_records)
            .cloned()
            .collect())
    }
}
