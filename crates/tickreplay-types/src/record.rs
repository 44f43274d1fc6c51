//! The immutable record read from the tick log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bucket::BucketKey;

/// One captured tick, exactly as the ingestion pipeline stored it.
///
/// Records are owned by storage; the replay engine only reads them.
/// `sequence_id` is the strictly monotonic append sequence of the log
/// and defines the emission order within a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRecord {
    /// Append sequence number (the table's `id` column).
    pub sequence_id: i64,
    /// Instant the tick was recorded (the table's `datetime` column).
    pub timestamp: DateTime<Utc>,
    /// Raw payload as received from the market feed.
    pub payload: String,
}

impl TickRecord {
    /// Create a new record.
    pub const fn new(sequence_id: i64, timestamp: DateTime<Utc>, payload: String) -> Self {
        Self {
            sequence_id,
            timestamp,
            payload,
        }
    }

    /// Return the one-second bucket this record belongs to.
    pub fn bucket_key(&self) -> BucketKey {
        BucketKey::from_timestamp(self.timestamp)
    }
}
