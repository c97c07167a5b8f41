//! Timestamp utilities
//!
//! Publication timestamps are persisted as `YYYY-MM-DDTHH:MM:SSZ` (UTC,
//! second precision) so that string order equals chronological order.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Canonical on-disk timestamp layout
pub const PUBLISHED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Render a timestamp in the canonical second-precision form
pub fn format_published(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a published timestamp
///
/// Accepts the canonical form as well as any RFC 3339 offset (arXiv reports
/// `2024-03-01T17:59:59Z`, older exports sometimes carried `+00:00`).
/// Sub-second precision is truncated.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let parsed = NaiveDateTime::parse_from_str(raw, PUBLISHED_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|ts| ts.with_timezone(&Utc))
        })?;
    DateTime::from_timestamp(parsed.timestamp(), 0)
}

/// Serde adapter for `published` fields
pub mod published_format {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_published(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_published(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid published timestamp: {raw}")))
    }
}
