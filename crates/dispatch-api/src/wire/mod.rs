//! Wire boundary of the Orders API.
//!
//! The server is loose about field naming (`orderNo` vs `order_no`, flat
//! `shopId` vs nested `shop.id`), id types (string or number) and envelopes
//! (bare array or `{ "data": [...] }`). Raw shapes are accepted here and
//! normalized into [`crate::model`]; nothing else in the workspace sees them.

use chrono::NaiveTime;
use dispatch_core::time::parse_start_time;
use dispatch_core::types::{CastId, OrderId, ShopId};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::model::{Order, OrderAssignment, OrderStatus};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> Option<String> {
        let value = match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Number(number) => number.to_string(),
        };
        (!value.is_empty()).then_some(value)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawNumber {
    /// Integer rates outside the `i32` range are rejected rather than rounded.
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => i32::try_from(*value).ok().map(f64::from),
            Self::Float(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Float(_) => None,
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRef {
    id: Option<RawId>,
    code: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawShop {
    Id(RawId),
    Object(RawRef),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrder {
    id: Option<RawId>,
    #[serde(alias = "shop_id")]
    shop_id: Option<RawId>,
    shop: Option<RawShop>,
    #[serde(alias = "order_no")]
    order_no: Option<RawNumber>,
    #[serde(alias = "start_time")]
    start_time: Option<String>,
    status: Option<String>,
    assignments: Option<Vec<RawAssignment>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAssignment {
    id: Option<RawId>,
    #[serde(alias = "cast_id")]
    cast_id: Option<RawId>,
    #[serde(alias = "cast_code")]
    cast_code: Option<String>,
    #[serde(alias = "cast_name")]
    cast_name: Option<String>,
    cast: Option<RawRef>,
    #[serde(alias = "hourly_rate", alias = "rate")]
    hourly_rate: Option<RawNumber>,
    note: Option<String>,
    #[serde(alias = "start_at")]
    start_at: Option<String>,
    #[serde(alias = "end_at")]
    end_at: Option<String>,
    priority: Option<i32>,
    #[serde(alias = "override_reason")]
    override_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
    /// Replace responses may echo the request body.
    Echoed { assignments: Vec<T> },
}

impl<T> Envelope<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items)
            | Self::Wrapped { data: items }
            | Self::Echoed { assignments: items } => items,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Single<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Single<T> {
    fn into_item(self) -> T {
        match self {
            Self::Bare(item) | Self::Wrapped { data: item } => item,
        }
    }
}

/// ## Summary
/// Decodes an order listing body into canonical orders.
///
/// ## Errors
/// Returns `Decode` for malformed JSON and `Normalization` for records missing
/// an id or shop reference, or carrying invalid times or rates.
pub fn decode_orders(body: &[u8]) -> ApiResult<Vec<Order>> {
    let envelope: Envelope<RawOrder> = serde_json::from_slice(body)?;
    envelope.into_items().into_iter().map(normalize_order).collect()
}

/// ## Summary
/// Decodes a single order body.
///
/// ## Errors
/// See [`decode_orders`].
pub fn decode_order(body: &[u8]) -> ApiResult<Order> {
    let single: Single<RawOrder> = serde_json::from_slice(body)?;
    normalize_order(single.into_item())
}

/// ## Summary
/// Decodes an assignment listing body. An empty body decodes to no assignments.
///
/// ## Errors
/// See [`decode_orders`].
pub fn decode_assignments(body: &[u8]) -> ApiResult<Vec<OrderAssignment>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let envelope: Envelope<RawAssignment> = serde_json::from_slice(body)?;
    envelope
        .into_items()
        .into_iter()
        .map(normalize_assignment)
        .collect()
}

fn normalize_order(raw: RawOrder) -> ApiResult<Order> {
    let id = raw
        .id
        .and_then(RawId::into_string)
        .ok_or_else(|| ApiError::Normalization("order without id".to_string()))?;

    let shop_id = raw
        .shop_id
        .and_then(RawId::into_string)
        .or_else(|| match raw.shop {
            Some(RawShop::Id(shop)) => shop.into_string(),
            Some(RawShop::Object(shop)) => shop.id.and_then(RawId::into_string),
            None => None,
        })
        .ok_or_else(|| ApiError::Normalization(format!("order {id} has no shop reference")))?;

    let order_no = match raw.order_no {
        Some(number) => Some(number.as_i64().ok_or_else(|| {
            ApiError::Normalization(format!("order {id} has a non-integer order number"))
        })?),
        None => None,
    };

    let assignments = raw
        .assignments
        .map(|items| {
            items
                .into_iter()
                .map(normalize_assignment)
                .collect::<ApiResult<Vec<_>>>()
        })
        .transpose()?;

    Ok(Order {
        id: OrderId::new(id),
        shop_id: ShopId::new(shop_id),
        order_no,
        start_time: optional_time(raw.start_time.as_deref())?,
        status: raw
            .status
            .as_deref()
            .map(OrderStatus::parse)
            .unwrap_or_default(),
        assignments,
    })
}

fn normalize_assignment(raw: RawAssignment) -> ApiResult<OrderAssignment> {
    let (nested_id, nested_code, nested_name) = match raw.cast {
        Some(cast) => (cast.id, cast.code, cast.name),
        None => (None, None, None),
    };

    let hourly_rate = match raw.hourly_rate {
        Some(rate) => rate
            .as_f64()
            .ok_or_else(|| ApiError::Normalization("unreadable hourly rate".to_string()))?,
        None => 0.0,
    };
    if !hourly_rate.is_finite() || hourly_rate < 0.0 {
        return Err(ApiError::Normalization(format!(
            "hourly rate must be a non-negative number, got {hourly_rate}"
        )));
    }

    Ok(OrderAssignment {
        id: raw.id.and_then(RawId::into_string),
        cast_id: raw
            .cast_id
            .or(nested_id)
            .and_then(RawId::into_string)
            .map(CastId::new),
        cast_code: raw.cast_code.or(nested_code).unwrap_or_default(),
        cast_name: raw.cast_name.or(nested_name).unwrap_or_default(),
        hourly_rate,
        note: raw.note.filter(|note| !note.trim().is_empty()),
        start_at: optional_time(raw.start_at.as_deref())?,
        end_at: optional_time(raw.end_at.as_deref())?,
        priority: raw.priority,
        override_reason: raw.override_reason,
    })
}

fn optional_time(value: Option<&str>) -> ApiResult<Option<NaiveTime>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => Ok(Some(parse_start_time(raw)?)),
    }
}
