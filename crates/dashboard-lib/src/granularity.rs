//! Time-bucket selection for metric queries
//!
//! The backend needs an explicit bucket size. Too fine a bucket over a long
//! range inflates the payload, so the choice follows two fixed breakpoints.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::query::QueryParams;

/// Ranges shorter than this use minute buckets
const MINUTE_BREAKPOINT_HOURS: i64 = 1;

/// Ranges shorter than this (and at least an hour) use hour buckets
const HOUR_BREAKPOINT_HOURS: i64 = 48;

/// Time-bucket width
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Minute,
    Hour,
    Day,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Minute => "minute",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minute" => Ok(Granularity::Minute),
            "hour" => Ok(Granularity::Hour),
            "day" => Ok(Granularity::Day),
            other => Err(format!("unknown granularity: {}", other)),
        }
    }
}

/// Naive forms tried after RFC 3339, all taken as UTC
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a query timestamp.
///
/// Accepts RFC 3339, naive date-times with or without seconds and fractional
/// seconds (taken as UTC) and a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Choose a bucket size for the range `start..end`.
///
/// A missing or unparseable `start` yields `Day`. A missing or unparseable
/// `end` falls back to `now`. Negative ranges count as zero.
pub fn pick_granularity(start: Option<&str>, end: Option<&str>, now: DateTime<Utc>) -> Granularity {
    let Some(start) = start.and_then(parse_timestamp) else {
        return Granularity::Day;
    };
    let end = end.and_then(parse_timestamp).unwrap_or(now);
    let elapsed = (end - start).max(Duration::zero());

    if elapsed < Duration::hours(MINUTE_BREAKPOINT_HOURS) {
        Granularity::Minute
    } else if elapsed < Duration::hours(HOUR_BREAKPOINT_HOURS) {
        Granularity::Hour
    } else {
        Granularity::Day
    }
}

/// Fill in `granularity` when the caller left it unset
pub fn with_auto_granularity(params: &QueryParams, now: DateTime<Utc>) -> QueryParams {
    if params.granularity.is_some() {
        return params.clone();
    }

    let mut resolved = params.clone();
    resolved.granularity = Some(pick_granularity(
        params.start.as_deref(),
        params.end.as_deref(),
        now,
    ));
    resolved
}
