/*!
 * Serde utilities for wire payload tolerance.
 *
 * Remote applications report freeze progress over HTTP; their payloads may
 * omit fields that have no value yet (an attempt still running has no end
 * time) or carry them as explicit nulls. These helpers keep that tolerance
 * in one place.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Deserialize an optional RFC 3339 timestamp that may be absent, null, or
/// a string.
///
/// # Usage with serde
///
/// ```rust
/// use serde::Deserialize;
/// use cutover_core::utils::serde::deserialize_optional_datetime;
///
/// #[derive(Deserialize)]
/// struct Payload {
///     #[serde(default, deserialize_with = "deserialize_optional_datetime")]
///     end_time: Option<chrono::DateTime<chrono::Utc>>,
/// }
/// ```
pub fn deserialize_optional_datetime<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| D::Error::custom(format!("Invalid timestamp '{s}': {e}"))),
        Some(other) => Err(D::Error::custom(format!(
            "Expected timestamp string, found: {other:?}"
        ))),
    }
}
