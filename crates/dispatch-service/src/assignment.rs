//! The cached unit: one cast placed into one shop (and eventually one order)
//! for one date, in the flat shape the shop-oriented screens work with.

use chrono::NaiveTime;
use dispatch_core::time::opt_hhmm;
use dispatch_core::types::{AssignmentId, CastId, OrderId, ShopId};
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: AssignmentId,
    pub shop_id: ShopId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_no: Option<i64>,
    #[serde(default, with = "opt_hhmm", skip_serializing_if = "Option::is_none")]
    pub order_start_time: Option<NaiveTime>,
    /// Absent for rows typed in by hand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast_id: Option<CastId>,
    #[serde(default)]
    pub cast_code: String,
    #[serde(default)]
    pub cast_name: String,
    #[serde(default)]
    pub hourly_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Cast fields picked from the roster.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CastRef {
    pub id: Option<CastId>,
    pub code: String,
    pub name: String,
}

impl Assignment {
    /// Empty row for a shop, with a fresh local id.
    #[must_use]
    pub fn for_shop(shop_id: ShopId) -> Self {
        Self {
            id: AssignmentId::generate(),
            shop_id,
            order_id: None,
            order_no: None,
            order_start_time: None,
            cast_id: None,
            cast_code: String::new(),
            cast_name: String::new(),
            hourly_rate: 0.0,
            note: None,
        }
    }

    /// Row pre-filled from a picked cast.
    #[must_use]
    pub fn for_cast(shop_id: ShopId, cast: CastRef) -> Self {
        Self {
            cast_id: cast.id,
            cast_code: cast.code,
            cast_name: cast.name,
            ..Self::for_shop(shop_id)
        }
    }

    #[must_use]
    pub fn with_rate(mut self, hourly_rate: f64) -> Self {
        self.hourly_rate = hourly_rate;
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn with_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    /// ## Summary
    /// Checks the row can be sent to the Orders API.
    ///
    /// ## Errors
    /// Returns `ValidationError` for a negative or non-finite hourly rate.
    pub fn validate(&self) -> ServiceResult<()> {
        if !self.hourly_rate.is_finite() || self.hourly_rate < 0.0 {
            return Err(ServiceError::ValidationError(format!(
                "assignment {} has invalid hourly rate {}",
                self.id, self.hourly_rate
            )));
        }
        Ok(())
    }
}

/// Built-in rows shown when nothing has been persisted for a partition yet.
/// Ids are fixed so repeated reads compare equal.
#[must_use]
pub fn placeholder_assignments() -> Vec<Assignment> {
    let shop = ShopId::from("sample-shop");
    vec![
        Assignment {
            id: AssignmentId::from("placeholder-1"),
            cast_code: "S01".to_string(),
            cast_name: "Sample Cast A".to_string(),
            hourly_rate: 1500.0,
            ..Assignment::for_shop(shop.clone())
        },
        Assignment {
            id: AssignmentId::from("placeholder-2"),
            cast_code: "S02".to_string(),
            cast_name: "Sample Cast B".to_string(),
            hourly_rate: 1800.0,
            ..Assignment::for_shop(shop)
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_shop_rows_get_distinct_local_ids() {
        let a = Assignment::for_shop(ShopId::from("s1"));
        let b = Assignment::for_shop(ShopId::from("s1"));

        assert_ne!(a.id, b.id);
        assert_eq!(a.shop_id, ShopId::from("s1"));
        assert!(a.order_id.is_none());
        assert!(a.cast_id.is_none());
    }

    #[test]
    fn for_cast_copies_cast_fields() {
        let row = Assignment::for_cast(
            ShopId::from("s1"),
            CastRef {
                id: Some(CastId::from("c1")),
                code: "A01".to_string(),
                name: "Aoi".to_string(),
            },
        )
        .with_rate(2000.0)
        .with_note("first night");

        assert_eq!(row.cast_id, Some(CastId::from("c1")));
        assert_eq!(row.cast_code, "A01");
        assert_eq!(row.cast_name, "Aoi");
        assert!((row.hourly_rate - 2000.0).abs() < f64::EPSILON);
        assert_eq!(row.note.as_deref(), Some("first night"));
    }

    #[test]
    fn placeholder_is_stable() {
        assert_eq!(placeholder_assignments(), placeholder_assignments());
    }

    #[test]
    fn negative_rate_fails_validation() {
        let row = Assignment::for_shop(ShopId::from("s1")).with_rate(-1.0);
        assert!(row.validate().is_err());
        assert!(row.with_rate(0.0).validate().is_ok());
    }

    #[test]
    fn persisted_form_is_camel_case_and_tolerates_missing_fields() {
        let row: Assignment = serde_json::from_str(
            r#"{"id": "a1", "shopId": "s1", "orderStartTime": "21:00", "castName": "Aoi"}"#,
        )
        .expect("deserialize legacy row");

        assert_eq!(row.order_start_time, NaiveTime::from_hms_opt(21, 0, 0));
        assert_eq!(row.cast_name, "Aoi");
        assert!(row.cast_code.is_empty());
        assert!(row.hourly_rate.abs() < f64::EPSILON);

        let json = serde_json::to_value(&row).expect("serialize");
        assert_eq!(json["orderStartTime"], "21:00");
        assert!(json.get("orderId").is_none());
    }
}
