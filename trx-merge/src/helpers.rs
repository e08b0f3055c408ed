// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers for interpreting values stored in reports.

use chrono::{DateTime, FixedOffset, NaiveDateTime};

/// Formats accepted for timestamps without an offset, which are taken to be UTC.
static NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
];

/// Interprets a timestamp as written in a TRX report.
///
/// VSTest writes RFC 3339 timestamps with seven fractional digits, but reports produced by other
/// tools use culture-specific formats. Returns `None` if the timestamp isn't recognized.
pub fn parse_timestamp(timestamp: &str) -> Option<DateTime<FixedOffset>> {
    let timestamp = timestamp.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(parsed);
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(timestamp, format).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}
