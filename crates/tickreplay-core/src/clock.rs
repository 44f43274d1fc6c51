//! Virtual clock for a replay session.
//!
//! The clock is the single source of truth for replay time. It holds the
//! anchor (the first recorded second at or after the requested start) and
//! a virtual offset counting elapsed virtual seconds. The current bucket is
//! always derived as `anchor + offset`, never stored independently.
//!
//! The offset is atomic so the status API can read it while the emission
//! timer advances it. Only the emission timer writes it.

use std::sync::atomic::{AtomicU64, Ordering};

use tickreplay_types::BucketKey;

/// Errors that can occur during clock operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// The offset counter would overflow.
    #[error("virtual offset overflow: cannot advance beyond u64::MAX")]
    OffsetOverflow,

    /// `anchor + offset` is outside the representable time range.
    #[error("bucket at offset {offset} from {anchor} is not representable")]
    OutOfRange {
        /// Session anchor.
        anchor: BucketKey,
        /// Offending offset.
        offset: u64,
    },
}

/// Anchor plus a monotonically increasing virtual offset.
#[derive(Debug)]
pub struct VirtualClock {
    anchor: BucketKey,
    offset: AtomicU64,
}

impl VirtualClock {
    /// Create a clock at offset 0.
    pub const fn new(anchor: BucketKey) -> Self {
        Self {
            anchor,
            offset: AtomicU64::new(0),
        }
    }

    /// Return the session anchor.
    pub const fn anchor(&self) -> BucketKey {
        self.anchor
    }

    /// Return the current virtual offset in seconds.
    pub fn offset(&self) -> u64 {
        self.offset.load(Ordering::Acquire)
    }

    /// Return the bucket key the next emission will read.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::OutOfRange`] if the key is not representable.
    pub fn current_key(&self) -> Result<BucketKey, ClockError> {
        self.key_at(self.offset())
    }

    /// Return the bucket key at an arbitrary offset from the anchor.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::OutOfRange`] if the key is not representable.
    pub fn key_at(&self, offset: u64) -> Result<BucketKey, ClockError> {
        self.anchor.offset_by(offset).ok_or(ClockError::OutOfRange {
            anchor: self.anchor,
            offset,
        })
    }

    /// Advance by one virtual second. Returns the new offset.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::OffsetOverflow`] if the counter would exceed
    /// `u64::MAX`.
    pub fn advance(&self) -> Result<u64, ClockError> {
        let current = self.offset();
        let next = current.checked_add(1).ok_or(ClockError::OffsetOverflow)?;
        self.offset.store(next, Ordering::Release);
        Ok(next)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn anchor() -> BucketKey {
        BucketKey::from_timestamp(Utc.with_ymd_and_hms(2022, 6, 21, 9, 0, 2).unwrap())
    }

    #[test]
    fn clock_starts_at_anchor() {
        let clock = VirtualClock::new(anchor());
        assert_eq!(clock.offset(), 0);
        assert_eq!(clock.current_key().unwrap(), anchor());
    }

    #[test]
    fn clock_advances_one_second_at_a_time() {
        let clock = VirtualClock::new(anchor());
        assert_eq!(clock.advance().unwrap(), 1);
        assert_eq!(clock.advance().unwrap(), 2);
        assert_eq!(
            clock.current_key().unwrap().to_string(),
            "2022-06-21T09:00:04.000Z"
        );
    }

    #[test]
    fn key_at_far_offset_is_out_of_range() {
        let clock = VirtualClock::new(anchor());
        assert!(matches!(
            clock.key_at(u64::MAX),
            Err(ClockError::OutOfRange { .. })
        ));
    }
}
