//! Wall-clock timestamp type
//!
//! A timestamp is an absolute UTC instant with at least millisecond
//! resolution, serialisable to and from ISO-8601. The store uses a
//! wall-clock source but never compares two timestamps taken from different
//! nodes; all ordering is per-process.
//!
//! Internally we store microseconds since the Unix epoch, which both exceeds
//! the millisecond-resolution requirement and keeps ordering a plain integer
//! comparison.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An absolute UTC instant.
///
/// `Timestamp` is `Copy`, totally ordered, and round-trips through ISO-8601
/// strings. Two timestamps are only meaningfully comparable if they were
/// produced by the same process's [`Timestamp::now`] clock or parsed from
/// the same upstream source — the type does not attempt to reconcile clock
/// skew across nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Timestamp(i64);

/// Error returned when parsing a timestamp from a string fails.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid ISO-8601 timestamp: {0}")]
pub struct TimestampParseError(String);

impl Timestamp {
    /// The Unix epoch, 1970-01-01T00:00:00Z.
    pub const EPOCH: Timestamp = Timestamp(0);

    /// The current wall-clock instant.
    pub fn now() -> Self {
        Timestamp(Utc::now().timestamp_micros())
    }

    /// Parse an ISO-8601 / RFC-3339 string into a `Timestamp`.
    pub fn parse(s: &str) -> Result<Self, TimestampParseError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| TimestampParseError(format!("{s}: {e}")))?;
        Ok(Timestamp(dt.with_timezone(&Utc).timestamp_micros()))
    }

    /// Build a timestamp from microseconds since the Unix epoch.
    pub const fn from_micros(micros: i64) -> Self {
        Timestamp(micros)
    }

    /// Microseconds since the Unix epoch.
    pub const fn as_micros(&self) -> i64 {
        self.0
    }

    /// Render as an ISO-8601 / RFC-3339 string with microsecond precision.
    pub fn to_iso8601(&self) -> String {
        let dt = Utc.timestamp_micros(self.0).single().unwrap_or_else(Utc::now);
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_iso8601())
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_iso8601()
    }
}

impl TryFrom<String> for Timestamp {
    type Error = TimestampParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Timestamp::parse(&value)
    }
}
