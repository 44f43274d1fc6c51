//! One-second bucket keys.
//!
//! A [`BucketKey`] is a record timestamp truncated to whole seconds. It is
//! the unit the replay clock advances by: every virtual second the engine
//! emits exactly the records whose key equals `anchor + offset`.
//!
//! The canonical textual form is RFC 3339 with millisecond precision and a
//! `Z` suffix (e.g. `2022-06-21T09:00:02.000Z`). Keys order chronologically,
//! so they can be used directly in a [`BTreeMap`](std::collections::BTreeMap).

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A timestamp truncated to one-second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey(DateTime<Utc>);

impl BucketKey {
    /// Build the bucket key a timestamp falls into.
    pub fn from_timestamp(timestamp: DateTime<Utc>) -> Self {
        Self(timestamp.trunc_subsecs(0))
    }

    /// Return the key `seconds` after this one.
    ///
    /// Returns `None` if the result is outside the representable range.
    pub fn offset_by(self, seconds: u64) -> Option<Self> {
        let seconds = i64::try_from(seconds).ok()?;
        let delta = TimeDelta::try_seconds(seconds)?;
        self.0.checked_add_signed(delta).map(Self)
    }

    /// Return the start of the bucket as an instant.
    pub const fn start(self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for BucketKey {
    fn from(timestamp: DateTime<Utc>) -> Self {
        Self::from_timestamp(timestamp)
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl FromStr for BucketKey {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = DateTime::parse_from_rfc3339(s)?;
        Ok(Self::from_timestamp(parsed.with_timezone(&Utc)))
    }
}

impl Serialize for BucketKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BucketKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
