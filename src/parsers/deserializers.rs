use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::{EpochMillis, EpochSeconds};

/// Accepts a string, treating any other JSON type as absent and empty strings as absent.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    })
}

/// Epoch seconds from a number or numeric string. Zero and non-finite values are absent.
pub fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<EpochSeconds>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_f64(&value).filter(|s| s.is_finite() && *s != 0.0).map(EpochSeconds))
}

/// Epoch milliseconds from an integer, a numeric string, or an RFC3339 string.
pub fn lenient_millis<'de, D>(deserializer: D) -> Result<Option<EpochMillis>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if let Value::String(s) = &value
        && let Ok(dt) = s.parse::<DateTime<Utc>>()
    {
        return Ok(Some(EpochMillis(dt.timestamp_millis())));
    }
    Ok(as_f64(&value)
        .filter(|ms| ms.is_finite() && *ms != 0.0)
        .map(|ms| EpochMillis(ms as i64)))
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
