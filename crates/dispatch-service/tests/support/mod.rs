//! Shared fakes for cache tests.

#![expect(
    dead_code,
    reason = "recorded call payloads are only compared through the derived PartialEq"
)]

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveTime;
use dispatch_api::model::{AssignmentInput, Order, OrderAssignment, OrderStatus, OrderUpdate};
use dispatch_api::{ApiError, ApiFuture, OrdersApi};
use dispatch_core::types::{CastId, DateKey, OrderId, ShopId};
use dispatch_service::{AssignmentCache, CacheOptions};
use dispatch_store::MemoryStore;
use futures::FutureExt;
use parking_lot::Mutex;

/// Calls the cache made against the fake, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListOrders(Option<DateKey>),
    GetAssignments(OrderId),
    Replace(OrderId, Vec<AssignmentInput>),
    Update(OrderId, OrderUpdate),
    Confirm(OrderId),
    Cancel(OrderId),
}

#[derive(Default)]
struct FakeState {
    orders: Vec<(DateKey, Order)>,
    assignments: HashMap<OrderId, Vec<OrderAssignment>>,
    calls: Vec<Call>,
    fail_list: bool,
    fail_replace: bool,
}

/// In-memory Orders API recording every call.
#[derive(Default)]
pub struct FakeOrdersApi {
    state: Mutex<FakeState>,
}

impl FakeOrdersApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_order(&self, date: DateKey, order: Order) {
        self.state.lock().orders.push((date, order));
    }

    pub fn set_assignments(&self, order_id: &OrderId, assignments: Vec<OrderAssignment>) {
        self.state
            .lock()
            .assignments
            .insert(order_id.clone(), assignments);
    }

    pub fn fail_list(&self, fail: bool) {
        self.state.lock().fail_list = fail;
    }

    pub fn fail_replace(&self, fail: bool) {
        self.state.lock().fail_replace = fail;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::ListOrders(_)))
            .count()
    }

    pub fn replace_calls(&self) -> Vec<(OrderId, Vec<AssignmentInput>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Replace(order_id, inputs) => Some((order_id, inputs)),
                _ => None,
            })
            .collect()
    }

    fn unavailable() -> ApiError {
        ApiError::Status {
            status: 503,
            body: "unavailable".to_string(),
        }
    }
}

impl OrdersApi for FakeOrdersApi {
    fn list_orders<'a>(&'a self, date: Option<&'a DateKey>) -> ApiFuture<'a, Vec<Order>> {
        async move {
            let mut state = self.state.lock();
            state.calls.push(Call::ListOrders(date.copied()));
            if state.fail_list {
                return Err(Self::unavailable());
            }
            Ok(state
                .orders
                .iter()
                .filter(|(day, _)| date.is_none_or(|wanted| wanted == day))
                .map(|(_, order)| order.clone())
                .collect())
        }
        .boxed()
    }

    fn get_assignments<'a>(
        &'a self,
        order_id: &'a OrderId,
    ) -> ApiFuture<'a, Vec<OrderAssignment>> {
        async move {
            let mut state = self.state.lock();
            state.calls.push(Call::GetAssignments(order_id.clone()));
            Ok(state.assignments.get(order_id).cloned().unwrap_or_default())
        }
        .boxed()
    }

    fn replace_assignments<'a>(
        &'a self,
        order_id: &'a OrderId,
        assignments: &'a [AssignmentInput],
    ) -> ApiFuture<'a, Vec<OrderAssignment>> {
        async move {
            let mut state = self.state.lock();
            state
                .calls
                .push(Call::Replace(order_id.clone(), assignments.to_vec()));
            if state.fail_replace {
                return Err(Self::unavailable());
            }
            let stored: Vec<OrderAssignment> = assignments
                .iter()
                .map(|input| OrderAssignment {
                    id: None,
                    cast_id: input.cast_id.clone(),
                    cast_code: input.cast_code.clone(),
                    cast_name: input.cast_name.clone(),
                    hourly_rate: input.hourly_rate,
                    note: input.note.clone(),
                    start_at: input.start_at,
                    end_at: input.end_at,
                    priority: input.priority,
                    override_reason: input.override_reason.clone(),
                })
                .collect();
            state.assignments.insert(order_id.clone(), stored.clone());
            Ok(stored)
        }
        .boxed()
    }

    fn update_order<'a>(
        &'a self,
        order_id: &'a OrderId,
        update: &'a OrderUpdate,
    ) -> ApiFuture<'a, Order> {
        async move {
            let mut state = self.state.lock();
            state
                .calls
                .push(Call::Update(order_id.clone(), update.clone()));
            let Some(order) = state
                .orders
                .iter_mut()
                .map(|(_, order)| order)
                .find(|order| &order.id == order_id)
            else {
                return Err(ApiError::Status {
                    status: 404,
                    body: "no such order".to_string(),
                });
            };
            if let Some(start_time) = update.start_time {
                order.start_time = Some(start_time);
            }
            if let Some(status) = &update.status {
                order.status = status.clone();
            }
            Ok(order.clone())
        }
        .boxed()
    }

    fn confirm_order<'a>(&'a self, order_id: &'a OrderId) -> ApiFuture<'a, ()> {
        async move {
            self.state.lock().calls.push(Call::Confirm(order_id.clone()));
            Ok(())
        }
        .boxed()
    }

    fn cancel_order<'a>(&'a self, order_id: &'a OrderId) -> ApiFuture<'a, ()> {
        async move {
            self.state.lock().calls.push(Call::Cancel(order_id.clone()));
            Ok(())
        }
        .boxed()
    }
}

pub fn date(value: &str) -> DateKey {
    DateKey::parse(value).expect("valid date key")
}

pub fn order(id: &str, shop: &str, start: &str) -> Order {
    Order {
        id: OrderId::from(id),
        shop_id: ShopId::from(shop),
        order_no: Some(1),
        start_time: Some(NaiveTime::parse_from_str(start, "%H:%M").expect("valid start")),
        status: OrderStatus::Pending,
        assignments: None,
    }
}

pub fn remote(cast: &str, rate: f64) -> OrderAssignment {
    OrderAssignment {
        id: None,
        cast_id: Some(CastId::from(cast)),
        cast_code: format!("{cast}-code"),
        cast_name: format!("{cast}-name"),
        hourly_rate: rate,
        note: None,
        start_at: None,
        end_at: None,
        priority: None,
        override_reason: None,
    }
}

pub struct Harness {
    pub api: Arc<FakeOrdersApi>,
    pub store: Arc<MemoryStore>,
    pub cache: AssignmentCache,
}

pub fn harness() -> Harness {
    harness_with(CacheOptions::default())
}

pub fn harness_with(options: CacheOptions) -> Harness {
    let api = FakeOrdersApi::new();
    let store = Arc::new(MemoryStore::new());
    let cache = AssignmentCache::new(api.clone(), store.clone(), options)
        .expect("tests run inside a tokio runtime");
    Harness { api, store, cache }
}
