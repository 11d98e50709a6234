pub mod auth;
pub mod comments;
pub mod error;
pub mod middleware;
pub mod posts;
pub mod tree;
pub mod users;
pub mod votes;

use chrono::{DateTime, Utc};
use tracing::warn;

/// Parse a stored timestamp. Rows written by this service are RFC 3339;
/// rows written by SQLite's datetime('now') default are naive UTC.
pub(crate) fn parse_created_at(raw: &str, context_id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on row '{}': {}", raw, context_id, e);
            DateTime::default()
        })
}

pub(crate) fn parse_uuid(raw: &str, what: &str) -> uuid::Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        uuid::Uuid::default()
    })
}
