//! Canonical order shapes. Everything past the wire boundary speaks these.

use std::fmt;

use chrono::NaiveTime;
use dispatch_core::time::opt_hhmm;
use dispatch_core::types::{CastId, OrderId, ShopId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One scheduled staffing slot of a shop.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub shop_id: ShopId,
    pub order_no: Option<i64>,
    pub start_time: Option<NaiveTime>,
    pub status: OrderStatus,
    /// Assignments when the server inlined them into the listing.
    pub assignments: Option<Vec<OrderAssignment>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Other(other) => other,
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "confirmed" => Self::Confirmed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other(value.trim().to_string()),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|raw| Self::parse(&raw))
    }
}

/// A cast placed into an order, as the server reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAssignment {
    pub id: Option<String>,
    pub cast_id: Option<CastId>,
    pub cast_code: String,
    pub cast_name: String,
    pub hourly_rate: f64,
    pub note: Option<String>,
    pub start_at: Option<NaiveTime>,
    pub end_at: Option<NaiveTime>,
    pub priority: Option<i32>,
    pub override_reason: Option<String>,
}

/// One entry of a full-replace assignment payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cast_id: Option<CastId>,
    pub cast_code: String,
    pub cast_name: String,
    pub hourly_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(with = "opt_hhmm", skip_serializing_if = "Option::is_none")]
    pub start_at: Option<NaiveTime>,
    #[serde(with = "opt_hhmm", skip_serializing_if = "Option::is_none")]
    pub end_at: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,
}

/// Body of a full-replace call.
#[derive(Debug, Serialize)]
pub struct ReplaceAssignments<'a> {
    pub assignments: &'a [AssignmentInput],
}

/// Order metadata change. Absent fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    #[serde(with = "opt_hhmm", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}
