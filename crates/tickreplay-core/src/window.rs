//! In-memory window of prefetched buckets.
//!
//! The [`WindowIndex`] maps one-second [`BucketKey`]s to the raw payloads
//! recorded in that second. Prefetch merges records in; emission takes a
//! bucket out exactly once and leaves a tombstone behind so a late prefetch
//! for the same second cannot bring it back.
//!
//! Memory stays bounded by the prefetch look-ahead: once the clock has
//! passed a key, [`WindowIndex::reclaim_before`] drops everything older and
//! raises a low-water mark below which merges are ignored.

use std::collections::BTreeMap;

use tickreplay_types::{BucketKey, TickRecord};
use tracing::trace;

/// Contents of one bucket slot.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    /// Payloads waiting to be emitted, in sequence order.
    Pending(Vec<String>),
    /// Already emitted; must not be repopulated.
    Tombstone,
}

/// Outcome of a [`WindowIndex::merge`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Buckets written (new or overwritten).
    pub buckets_written: usize,
    /// Buckets ignored because they were already emitted or reclaimed.
    pub buckets_skipped: usize,
    /// Total records in the written buckets.
    pub records_written: usize,
}

/// Mapping from bucket key to pending payloads or tombstones.
#[derive(Debug, Clone, Default)]
pub struct WindowIndex {
    slots: BTreeMap<BucketKey, Slot>,
    /// Keys strictly below this mark have been reclaimed.
    floor: Option<BucketKey>,
}

impl WindowIndex {
    /// Create an empty window.
    pub const fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
            floor: None,
        }
    }

    /// Build a window from the result of a single window query.
    pub fn from_records(records: &[TickRecord]) -> Self {
        let mut window = Self::new();
        window.merge(records);
        window
    }

    /// Group `records` by bucket and write each group into the window.
    ///
    /// A group overwrites any pending entry for its key, so merging the
    /// same query result twice is the same as merging it once. Tombstoned
    /// keys and keys below the low-water mark are left untouched.
    pub fn merge(&mut self, records: &[TickRecord]) -> MergeSummary {
        let mut ordered: Vec<&TickRecord> = records.iter().collect();
        ordered.sort_by_key(|r| r.sequence_id);

        let mut grouped: BTreeMap<BucketKey, Vec<String>> = BTreeMap::new();
        for record in ordered {
            grouped
                .entry(record.bucket_key())
                .or_default()
                .push(record.payload.clone());
        }

        let mut summary = MergeSummary::default();
        for (key, payloads) in grouped {
            if self.is_reclaimed(key) || self.is_tombstoned(key) {
                trace!(bucket = %key, "Skipping merge into emitted bucket");
                summary.buckets_skipped = summary.buckets_skipped.saturating_add(1);
                continue;
            }
            summary.buckets_written = summary.buckets_written.saturating_add(1);
            summary.records_written = summary.records_written.saturating_add(payloads.len());
            self.slots.insert(key, Slot::Pending(payloads));
        }
        summary
    }

    /// Remove and return the payloads for `key`, leaving a tombstone.
    ///
    /// Returns an empty vector if the bucket was never populated, was
    /// already taken, or lies below the low-water mark.
    pub fn take(&mut self, key: BucketKey) -> Vec<String> {
        if self.is_reclaimed(key) {
            return Vec::new();
        }
        match self.slots.insert(key, Slot::Tombstone) {
            Some(Slot::Pending(payloads)) => payloads,
            Some(Slot::Tombstone) | None => Vec::new(),
        }
    }

    /// Drop every slot strictly before `key` and raise the low-water mark.
    ///
    /// Returns the number of slots dropped.
    pub fn reclaim_before(&mut self, key: BucketKey) -> usize {
        let retained = self.slots.split_off(&key);
        let dropped = self.slots.len();
        self.slots = retained;
        if self.floor.is_none_or(|floor| floor < key) {
            self.floor = Some(key);
        }
        dropped
    }

    /// Whether `key` has been taken and not yet reclaimed.
    pub fn is_tombstoned(&self, key: BucketKey) -> bool {
        matches!(self.slots.get(&key), Some(Slot::Tombstone))
    }

    /// Number of buckets with payloads waiting to be emitted.
    pub fn pending_buckets(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, Slot::Pending(_)))
            .count()
    }

    /// Number of slots held, tombstones included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the window holds no slots at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn is_reclaimed(&self, key: BucketKey) -> bool {
        self.floor.is_some_and(|floor| key < floor)
    }
}
