//! Start-time parsing and the `HH:MM` serde representation.

use chrono::{DateTime, NaiveTime};

use crate::constants::START_TIME_FORMAT;
use crate::error::{CoreError, CoreResult};

/// ## Summary
/// Parses an order start time given as `HH:MM`, `HH:MM:SS`, or an RFC 3339
/// timestamp (whose wall-clock time is kept, offset ignored).
///
/// ## Errors
/// Returns `ValidationError` if none of the accepted shapes match.
pub fn parse_start_time(value: &str) -> CoreResult<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, START_TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.time()))
        .map_err(|e| {
            CoreError::ValidationError(format!("invalid start time {value:?}: {e}"))
        })
}

#[must_use]
pub fn format_start_time(time: NaiveTime) -> String {
    time.format(START_TIME_FORMAT).to_string()
}

/// Serde adapter for `Option<NaiveTime>` as `"HH:MM"`.
pub mod opt_hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    /// ## Errors
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(
        value: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(time) => serializer.serialize_str(&super::format_start_time(*time)),
            None => serializer.serialize_none(),
        }
    }

    /// ## Errors
    /// Fails if the value is present but not a recognizable time.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| super::parse_start_time(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}
