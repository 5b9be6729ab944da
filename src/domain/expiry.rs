//! Expiry date parsing and formatting
//!
//! Expiry instants travel as Unix epoch seconds. `None` means "clear".

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::domain::DomainError;

/// Inputs that explicitly clear an expiry.
pub const CLEAR_SENTINELS: [&str; 3] = ["never", "none", "null"];

/// Parse a user-supplied expiry.
///
/// Accepted forms:
/// - `never` / `none` / `null` (any case) → `Ok(None)`
/// - epoch seconds, e.g. `1767225600`
/// - RFC 3339, e.g. `2026-01-01T00:00:00+02:00`
/// - `YYYY-MM-DDTHH:MM[:SS]` without offset, read as UTC
/// - `YYYY-MM-DD`, midnight UTC
pub fn parse_expiry(input: &str) -> Result<Option<i64>, DomainError> {
    let invalid = || DomainError::InvalidDate {
        input: input.to_string(),
    };
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    if CLEAR_SENTINELS
        .iter()
        .any(|sentinel| trimmed.eq_ignore_ascii_case(sentinel))
    {
        return Ok(None);
    }

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed.parse::<i64>().map(Some).map_err(|_| invalid());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(Some(dt.timestamp()));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Some(naive.and_utc().timestamp()));
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Some(midnight.and_utc().timestamp()))
        .ok_or_else(invalid)
}

/// Render epoch seconds as RFC 3339 UTC (`2026-01-01T00:00:00Z`).
pub fn format_expiry(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| timestamp.to_string())
}

/// Reject expiries that are not strictly after `now`.
pub fn ensure_future(expires_at: i64, now: i64) -> Result<(), DomainError> {
    if expires_at <= now {
        return Err(DomainError::invalid_field(
            "expires-at",
            format!("{} is not in the future", format_expiry(expires_at)),
        ));
    }
    Ok(())
}
