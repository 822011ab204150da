//! Internal helpers for date normalisation and id generation.
//!
//! Transaction dates are stored as canonical UTC text
//! (`YYYY-MM-DDTHH:MM:SS.mmmZ`). Every stored value and every query bound goes
//! through [`normalize_date`], so comparing the strings in SQL gives the same
//! answer as comparing the instants.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Generates a fresh opaque id for a category, wallet or transaction.
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Canonical text for an instant.
pub(crate) fn format_date(at: DateTime<Utc>) -> String {
    at.format(CANONICAL_FORMAT).to_string()
}

/// Parses an ISO-8601 date or date-time into canonical UTC text.
///
/// Accepted shapes:
/// - RFC 3339 with any offset (`2025-01-05T10:00:00+02:00`, `...Z`)
/// - naive date-time, read as UTC (`2025-01-05T10:00:00`)
/// - date only, read as midnight UTC (`2025-01-05`)
pub(crate) fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(format_date(at.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(format_date(naive.and_utc()));
    }
    parse_date_only(raw).map(|day| format_date(day.and_time(NaiveTime::MIN).and_utc()))
}

/// Like [`normalize_date`], but a date-only value covers the whole day
/// (`23:59:59.999`). Used for inclusive upper bounds.
pub(crate) fn normalize_end_bound(raw: &str) -> Option<String> {
    let raw = raw.trim();
    match parse_date_only(raw) {
        Some(day) => {
            let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?;
            Some(format_date(day.and_time(last).and_utc()))
        }
        None => normalize_date(raw),
    }
}

fn parse_date_only(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
