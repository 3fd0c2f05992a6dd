//! Conversion between stored timestamps and `DateTime<Utc>`.
//!
//! The document store writes server timestamps as epoch milliseconds. Older
//! documents may carry RFC 3339 strings, and some carry nothing at all; every
//! read path maps those to a plain date, falling back to "now".

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Interprets a stored field value as a timestamp.
///
/// Accepts integer (or float) epoch milliseconds and RFC 3339 strings.
pub fn from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let ms = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(ms).single()
        },
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

pub fn from_value_or_now(value: Option<&Value>) -> DateTime<Utc> {
    value.and_then(from_value).unwrap_or_else(Utc::now)
}

/// `#[serde(with = "crate::timestamp::lenient")]` for required timestamps.
pub mod lenient {
    use super::*;

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(ts.timestamp_millis())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(from_value_or_now(raw.as_ref()))
    }
}

/// Same as [`lenient`] for fields that may legitimately be absent.
pub mod lenient_opt {
    use super::*;

    pub fn serialize<S>(ts: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ts {
            Some(ts) => serializer.serialize_some(&ts.timestamp_millis()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw.as_ref().and_then(from_value))
    }
}

pub fn default_now() -> DateTime<Utc> {
    Utc::now()
}
