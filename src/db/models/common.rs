//! Shared helpers for database models.

use chrono::{DateTime, Utc};

/// Parse an RFC 3339 timestamp stored as TEXT. Returns None on malformed input.
pub fn parse_ts(value: &str) -> Option<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Current time serialized the way every table stores it.
pub fn now_ts() -> String {
    Utc::now().to_rfc3339()
}
