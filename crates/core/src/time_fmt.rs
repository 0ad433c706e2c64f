// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timestamp serialization and human-readable duration formatting.
//!
//! Ledger documents carry ISO-8601 timestamps with exactly millisecond
//! precision (`2026-01-02T03:04:05.678Z`). Chrono's default RFC 3339
//! serialization varies its sub-second precision, so the serde helpers here
//! pin the output format while accepting any RFC 3339 input.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp as ISO-8601 with millisecond precision.
pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse any RFC 3339 timestamp into UTC.
pub fn parse_ts(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

/// Serde adapter for `DateTime<Utc>` fields in wire documents.
///
/// Use as `#[serde(with = "time_fmt::ts_ms")]`.
pub mod ts_ms {
    use super::{format_ts, parse_ts};
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_ts(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_ts(&s).map_err(de::Error::custom)
    }

    /// Variant for `Option<DateTime<Utc>>` fields.
    ///
    /// Use as `#[serde(default, with = "time_fmt::ts_ms::option")]`, paired
    /// with `skip_serializing_if = "Option::is_none"`.
    pub mod option {
        use super::{format_ts, parse_ts};
        use chrono::{DateTime, Utc};
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            ts: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => serializer.serialize_some(&format_ts(ts)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(s) => parse_ts(&s).map(Some).map_err(de::Error::custom),
                None => Ok(None),
            }
        }
    }
}

/// Short human-readable age of `start` as of `now`: `"5s"`, `"2m"`,
/// `"1h30m"`, `"3d"`.
///
/// Participants report how long their operation has been running from the
/// ledger's `startTime`; coarser units win as the operation ages. Clock
/// skew that puts `start` in the future reads as `"0s"`.
pub fn format_elapsed_since(start: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - start).num_seconds().max(0) as u64;
    let days = secs / 86_400;
    let hours = (secs / 3_600) % 24;
    let mins = (secs / 60) % 60;
    match (days, hours, mins) {
        (0, 0, 0) => format!("{}s", secs),
        (0, 0, m) => format!("{}m", m),
        (0, h, 0) => format!("{}h", h),
        (0, h, m) => format!("{}h{}m", h, m),
        (d, _, _) => format!("{}d", d),
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
