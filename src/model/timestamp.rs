//! ISO-8601 timestamp handling for entity identity fields
//!
//! Timestamps are held at microsecond precision so the fixed-width text form
//! round-trips exactly and sorts lexicographically in the store.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, TimeZone, Utc};

use crate::{Error, Result};

/// Current time, truncated to microseconds.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Render a timestamp as `YYYY-MM-DDTHH:MM:SS.ffffffZ`.
#[must_use]
pub fn format(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 text with an offset, and naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// text, which is taken to be UTC.
///
/// # Errors
///
/// Returns `Error::InvalidTimestamp` naming `field` if neither form parses.
pub fn parse(field: &str, text: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc).trunc_subsecs(6));
    }

    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive).trunc_subsecs(6))
        .map_err(|_| Error::InvalidTimestamp {
            field: field.to_string(),
            value: text.to_string(),
        })
}
