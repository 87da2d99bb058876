use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::{AGGREGATE_PARTITION, DATE_KEY_FORMAT};
use crate::error::{CoreError, CoreResult};

/// A `YYYY-MM-DD` partition identifier scoping cached and persisted assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// ## Summary
    /// Parses a strictly zero-padded `YYYY-MM-DD` string.
    ///
    /// ## Errors
    /// Returns `InvalidDateKey` if the input is not a valid calendar date in that shape.
    pub fn parse(value: &str) -> CoreResult<Self> {
        let trimmed = value.trim();
        if trimmed.len() != 10 {
            return Err(CoreError::InvalidDateKey(value.to_string()));
        }
        NaiveDate::parse_from_str(trimmed, DATE_KEY_FORMAT)
            .map(Self)
            .map_err(|e| CoreError::InvalidDateKey(format!("{value}: {e}")))
    }

    #[must_use]
    pub const fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.0
    }

    /// Current calendar date in the given time zone.
    #[must_use]
    pub fn today(tz: Tz) -> Self {
        Self(chrono::Utc::now().with_timezone(&tz).date_naive())
    }

    /// ## Summary
    /// The calendar date after today in the given time zone.
    ///
    /// ## Errors
    /// Returns `InvariantViolation` if today is the last representable date.
    pub fn tomorrow(tz: Tz) -> CoreResult<Self> {
        Self::today(tz)
            .succ()
            .ok_or(CoreError::InvariantViolation("date out of range"))
    }

    #[must_use]
    pub fn succ(self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DateKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DateKey> for String {
    fn from(value: DateKey) -> Self {
        value.to_string()
    }
}

/// ## Summary
/// Label of a cache partition: the date key, or the aggregate label when undated.
#[must_use]
pub fn partition_label(key: Option<&DateKey>) -> String {
    key.map_or_else(|| AGGREGATE_PARTITION.to_string(), ToString::to_string)
}

/// ## Summary
/// Parses an IANA time zone name such as `Asia/Tokyo`.
///
/// ## Errors
/// Returns `UnknownTimeZone` if the name is not in the tz database.
pub fn parse_time_zone(name: &str) -> CoreResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_err| CoreError::UnknownTimeZone(name.to_string()))
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a shop requesting staff.
    ShopId
);
string_id!(
    /// Identifier of a remote order (one scheduled staffing slot of a shop).
    OrderId
);
string_id!(
    /// Identifier of a cast member.
    CastId
);
string_id!(
    /// Identifier of a cached assignment row.
    AssignmentId
);

impl AssignmentId {
    /// Fresh locally generated id for an optimistically created row.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Id derived from the remote order a reconciled row belongs to.
    #[must_use]
    pub fn for_order(order_id: &OrderId, discriminator: &str) -> Self {
        Self(format!("{order_id}:{discriminator}"))
    }
}
