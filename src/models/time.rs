//! Timestamp newtypes.
//!
//! Export sources mix units: record-level times are epoch milliseconds, while message
//! times keep the source-native epoch seconds (often fractional). Keeping them as
//! distinct types makes every conversion explicit.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Epoch milliseconds, used for record-level `created_at` / `updated_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpochMillis(pub i64);

/// Epoch seconds as found in the source data, used for message timestamps.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpochSeconds(pub f64);

impl EpochMillis {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn as_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

impl EpochSeconds {
    /// Convert to milliseconds, truncating sub-millisecond precision.
    pub fn to_millis(self) -> EpochMillis {
        EpochMillis((self.0 * 1000.0) as i64)
    }
}

impl fmt::Display for EpochMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            None => write!(f, "{}ms", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_millis() {
        assert_eq!(EpochSeconds(1.5).to_millis(), EpochMillis(1500));
        assert_eq!(EpochSeconds(1_700_000_000.0).to_millis(), EpochMillis(1_700_000_000_000));
    }

    #[test]
    fn test_transparent_serde() {
        let ms: EpochMillis = serde_json::from_str("1234").unwrap();
        assert_eq!(ms, EpochMillis(1234));
        let secs: EpochSeconds = serde_json::from_str("12.25").unwrap();
        assert_eq!(secs, EpochSeconds(12.25));
        assert_eq!(serde_json::to_string(&EpochMillis(7)).unwrap(), "7");
    }

    #[test]
    fn test_display_formats_utc() {
        assert_eq!(EpochMillis(0).to_string(), "1970-01-01 00:00:00");
    }
}
