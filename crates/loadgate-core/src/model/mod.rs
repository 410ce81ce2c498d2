//! Domain model: projects own tests, tests own runs, runs own details.

pub mod detail;
pub mod project;
pub mod run;

pub use detail::{Detail, DetailInput, DEFAULT_DETAIL_STATUS};
pub use project::Project;
pub use run::{Bucket, LatencyDistribution, Options, Run};
pub use test::Test;

use chrono::{DateTime, NaiveDateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("{child} must belong to a {parent}")]
    MissingParent {
        child: &'static str,
        parent: &'static str,
    },

    #[error("{kind} name cannot be empty")]
    EmptyName { kind: &'static str },

    #[error("invalid latency {latency}: must be a finite, non-negative number")]
    InvalidLatency { latency: String },

    #[error("invalid timestamp '{value}'")]
    InvalidTimestamp { value: String },

    #[error("invalid sort parameters: {field} {order}")]
    InvalidSort { field: String, order: String },
}

/// Names are stored lowercase with every space removed.
pub(crate) fn normalize_name(name: &str) -> String {
    name.replace(' ', "").to_lowercase()
}

pub(crate) fn random_name() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// Parse a report timestamp. Accepts RFC 3339 (with or without fractional
/// seconds), `2006-01-02T15:04:05.666Z` and `2006-01-02T15:04:05-0700`.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ModelError> {
    let trimmed = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.fZ") {
        return Ok(naive.and_utc());
    }
    Err(ModelError::InvalidTimestamp {
        value: value.to_string(),
    })
}

/// Serde adapter: `Duration` as integer nanoseconds. Negative input reads
/// as zero.
pub(crate) mod nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = i64::deserialize(d)?;
        Ok(Duration::from_nanos(u64::try_from(raw).unwrap_or(0)))
    }

    pub fn to_i64(d: Duration) -> i64 {
        i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)
    }

    pub fn from_i64(raw: i64) -> Duration {
        Duration::from_nanos(u64::try_from(raw).unwrap_or(0))
    }
}

/// Serde adapter for optional, leniently parsed timestamps.
pub(crate) mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.serialize_str(&ts.to_rfc3339()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(raw) if !raw.trim().is_empty() => super::parse_timestamp(&raw)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_supported_timestamp_layouts() {
        let rfc = parse_timestamp("2018-08-08T13:00:00Z").unwrap();
        assert_eq!((rfc.year(), rfc.hour()), (2018, 13));

        let nano = parse_timestamp("2018-08-08T13:00:00.123456789+02:00").unwrap();
        assert_eq!(nano.hour(), 11);
        assert_eq!(nano.nanosecond(), 123_456_789);

        let iso = parse_timestamp("2018-08-08T13:00:00.666Z").unwrap();
        assert_eq!(iso.nanosecond(), 666_000_000);

        let offset = parse_timestamp("2018-08-08T13:00:00-0700").unwrap();
        assert_eq!(offset.hour(), 20);
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert_eq!(
            parse_timestamp("yesterday"),
            Err(ModelError::InvalidTimestamp {
                value: "yesterday".into()
            })
        );
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(normalize_name("My Test Name"), "mytestname");
        assert_eq!(random_name().len(), 16);
        assert_ne!(random_name(), random_name());
    }
}
