//! Shape adapter between the order-keyed Orders API and the shop-keyed rows
//! the screens edit.
//!
//! The remote unit of truth is an order, and a shop's request may be split
//! into several time-sliced orders. The screens only know "the list for a
//! shop". Going API → rows is lossless; going rows → API needs to pick the
//! order a shop's list belongs to, which is what [`resolve_target`] does.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use dispatch_api::model::{AssignmentInput, Order, OrderAssignment, OrderStatus};
use dispatch_core::types::{AssignmentId, OrderId, ShopId};

use crate::assignment::Assignment;

/// Which order each reconciled or propagated row belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderIndex {
    by_assignment: HashMap<AssignmentId, OrderId>,
}

impl OrderIndex {
    pub fn record(&mut self, assignment_id: AssignmentId, order_id: OrderId) {
        self.by_assignment.insert(assignment_id, order_id);
    }

    #[must_use]
    pub fn order_of(&self, assignment_id: &AssignmentId) -> Option<&OrderId> {
        self.by_assignment.get(assignment_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_assignment.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_assignment.is_empty()
    }
}

/// ## Summary
/// Flattens orders and their assignments into shop rows.
///
/// Row ids are derived from the order (`<orderId>:<castId>`, falling back to
/// the remote assignment id and then the position) and recorded in the
/// returned index.
pub fn assignments_from_orders<'a>(
    orders: impl IntoIterator<Item = (&'a Order, &'a [OrderAssignment])>,
) -> (Vec<Assignment>, OrderIndex) {
    let mut rows = Vec::new();
    let mut index = OrderIndex::default();

    for (order, assignments) in orders {
        let mut used = HashSet::new();
        for (position, remote) in assignments.iter().enumerate() {
            let discriminator = [
                remote.cast_id.as_ref().map(ToString::to_string),
                remote.id.clone(),
            ]
            .into_iter()
            .flatten()
            .find(|candidate| !used.contains(candidate))
            .unwrap_or_else(|| format!("#{position}"));
            used.insert(discriminator.clone());

            let id = AssignmentId::for_order(&order.id, &discriminator);
            index.record(id.clone(), order.id.clone());
            rows.push(Assignment {
                id,
                shop_id: order.shop_id.clone(),
                order_id: Some(order.id.clone()),
                order_no: order.order_no,
                order_start_time: order.start_time,
                cast_id: remote.cast_id.clone(),
                cast_code: remote.cast_code.clone(),
                cast_name: remote.cast_name.clone(),
                hourly_rate: remote.hourly_rate,
                note: remote.note.clone(),
            });
        }
    }

    (rows, index)
}

/// ## Summary
/// Full-replace payload for one order, in row order. Row position becomes the
/// priority.
#[must_use]
pub fn assignment_inputs(rows: &[&Assignment]) -> Vec<AssignmentInput> {
    rows.iter()
        .zip(1..)
        .map(|(row, priority)| AssignmentInput {
            cast_id: row.cast_id.clone(),
            cast_code: row.cast_code.clone(),
            cast_name: row.cast_name.clone(),
            hourly_rate: row.hourly_rate,
            note: row.note.clone(),
            start_at: None,
            end_at: None,
            priority: Some(priority),
            override_reason: None,
        })
        .collect()
}

/// Rows grouped by shop, keeping their relative order.
#[must_use]
pub fn group_by_shop(rows: &[Assignment]) -> BTreeMap<ShopId, Vec<&Assignment>> {
    let mut groups: BTreeMap<ShopId, Vec<&Assignment>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.shop_id.clone()).or_default().push(row);
    }
    groups
}

/// Open orders grouped by shop. Cancelled orders never receive assignments.
#[must_use]
pub fn open_orders_by_shop(orders: &[Order]) -> HashMap<ShopId, Vec<&Order>> {
    let mut groups: HashMap<ShopId, Vec<&Order>> = HashMap::new();
    for order in orders.iter().filter(|o| o.status != OrderStatus::Cancelled) {
        groups.entry(order.shop_id.clone()).or_default().push(order);
    }
    groups
}

/// Where a shop's rows should be pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Order(OrderId),
    /// The shop has no open order on that date.
    NoOrder,
    /// Several orders and the rows do not single one out.
    Ambiguous { candidates: usize },
}

/// ## Summary
/// Picks the order a shop's rows belong to.
///
/// A shop with a single order always targets it. With several, each row
/// narrows the candidates by its explicit `order_id`, then by the index, then
/// by a start-time match; a row with none of these is compatible with every
/// order. Exactly one surviving candidate is the target.
#[must_use]
pub fn resolve_target(rows: &[&Assignment], shop_orders: &[&Order], index: &OrderIndex) -> Target {
    match shop_orders {
        [] => return Target::NoOrder,
        [only] => return Target::Order(only.id.clone()),
        _ => {}
    }

    let all: BTreeSet<&OrderId> = shop_orders.iter().map(|order| &order.id).collect();
    let mut candidates = all.clone();

    for row in rows {
        let known = row
            .order_id
            .as_ref()
            .or_else(|| index.order_of(&row.id));

        let compatible: BTreeSet<&OrderId> = match (known, row.order_start_time) {
            (Some(order_id), _) => all.iter().copied().filter(|id| *id == order_id).collect(),
            (None, Some(start)) => {
                let by_time: BTreeSet<&OrderId> = shop_orders
                    .iter()
                    .filter(|order| order.start_time == Some(start))
                    .map(|order| &order.id)
                    .collect();
                if by_time.is_empty() { all.clone() } else { by_time }
            }
            (None, None) => all.clone(),
        };

        candidates = candidates.intersection(&compatible).copied().collect();
    }

    match candidates.len() {
        1 => candidates
            .into_iter()
            .next()
            .map_or(Target::Ambiguous { candidates: 0 }, |id| Target::Order(id.clone())),
        n => Target::Ambiguous { candidates: n },
    }
}

#[cfg(test)]
mod tests;
