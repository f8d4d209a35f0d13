//! Forgiving deserializers for records written by older versions of the portal.
//!
//! The store document is hand-editable JSON and earlier writers were loose
//! about nulls and timestamps. These keep one bad field from making the
//! whole document unreadable.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer};

/// Accepts a string or `null`; `null` and missing become `""`.
pub fn de_string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parses an ISO-8601 local timestamp; anything unparseable becomes `None`.
///
/// # Accepted Formats
///
/// * `"2025-09-26T10:15:00.123456"` (naive, fractional seconds optional)
/// * `"2025-09-26T10:15:00+05:30"` (offset dropped, local wall time kept)
/// * `""`, `null`, numbers → `None`
pub fn de_option_datetime_forgiving<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(serde_json::Value::String(s)) = opt else {
        return Ok(None);
    };
    Ok(parse_timestamp(s.trim()))
}

pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "de_string_or_null")]
        text: String,
        #[serde(default, deserialize_with = "de_option_datetime_forgiving")]
        at: Option<NaiveDateTime>,
    }

    #[test]
    fn test_null_string_becomes_empty() {
        let p: Probe = serde_json::from_str(r#"{"text": null}"#).unwrap();
        assert_eq!(p.text, "");
        let p: Probe = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(p.text, "");
    }

    #[test]
    fn test_timestamps_forgiving() {
        let p: Probe = serde_json::from_str(r#"{"at": "2025-09-26T10:15:00.123456"}"#).unwrap();
        assert_eq!(p.at.unwrap().to_string(), "2025-09-26 10:15:00.123456");

        let p: Probe = serde_json::from_str(r#"{"at": "2025-09-26T10:15:00+05:30"}"#).unwrap();
        assert_eq!(p.at.unwrap().to_string(), "2025-09-26 10:15:00");

        for raw in [r#"{"at": ""}"#, r#"{"at": "yesterday"}"#, r#"{"at": 17}"#, r#"{"at": null}"#] {
            let p: Probe = serde_json::from_str(raw).unwrap();
            assert!(p.at.is_none(), "{raw}");
        }
    }
}
