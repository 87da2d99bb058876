//! Tests for the order ⇄ shop-row adapter.

use chrono::NaiveTime;
use dispatch_core::types::CastId;

use super::*;

fn order(id: &str, shop: &str, start: Option<(u32, u32)>) -> Order {
    Order {
        id: OrderId::from(id),
        shop_id: ShopId::from(shop),
        order_no: Some(1),
        start_time: start.and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0)),
        status: OrderStatus::Pending,
        assignments: None,
    }
}

fn remote(cast: Option<&str>, id: Option<&str>) -> OrderAssignment {
    OrderAssignment {
        id: id.map(ToString::to_string),
        cast_id: cast.map(CastId::from),
        cast_code: "A01".to_string(),
        cast_name: "Aoi".to_string(),
        hourly_rate: 1500.0,
        note: Some("note".to_string()),
        start_at: None,
        end_at: None,
        priority: None,
        override_reason: None,
    }
}

fn row(id: &str, shop: &str) -> Assignment {
    Assignment {
        id: AssignmentId::from(id),
        ..Assignment::for_shop(ShopId::from(shop))
    }
}

#[test]
fn orders_flatten_into_rows_with_order_derived_ids() {
    let o1 = order("o1", "s1", Some((21, 0)));
    let remotes = vec![remote(Some("c1"), Some("r1")), remote(None, Some("r2"))];

    let (rows, index) = assignments_from_orders([(&o1, remotes.as_slice())]);

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id.as_str(), "o1:c1");
    assert_eq!(rows[1].id.as_str(), "o1:r2");
    assert_eq!(rows[0].shop_id, ShopId::from("s1"));
    assert_eq!(rows[0].order_id, Some(OrderId::from("o1")));
    assert_eq!(rows[0].order_start_time, NaiveTime::from_hms_opt(21, 0, 0));
    assert_eq!(rows[0].note.as_deref(), Some("note"));
    assert_eq!(index.len(), 2);
    assert_eq!(
        index.order_of(&AssignmentId::from("o1:r2")),
        Some(&OrderId::from("o1"))
    );
}

#[test]
fn duplicate_casts_and_anonymous_rows_still_get_unique_ids() {
    let o1 = order("o1", "s1", None);
    let remotes = vec![
        remote(Some("c1"), None),
        remote(Some("c1"), None),
        remote(None, None),
    ];

    let (rows, _) = assignments_from_orders([(&o1, remotes.as_slice())]);

    let ids: Vec<&str> = rows.iter().map(|row| row.id.as_str()).collect();
    assert_eq!(ids, vec!["o1:c1", "o1:#1", "o1:#2"]);
}

#[test]
fn inputs_carry_cast_rate_note_and_position_priority() {
    let first = Assignment {
        cast_id: Some(CastId::from("c1")),
        cast_code: "A01".to_string(),
        cast_name: "Aoi".to_string(),
        hourly_rate: 1500.0,
        note: Some("late".to_string()),
        ..row("a", "s1")
    };
    let second = row("b", "s1");

    let inputs = assignment_inputs(&[&first, &second]);

    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs[0].cast_id, Some(CastId::from("c1")));
    assert_eq!(inputs[0].cast_code, "A01");
    assert_eq!(inputs[0].cast_name, "Aoi");
    assert!((inputs[0].hourly_rate - 1500.0).abs() < f64::EPSILON);
    assert_eq!(inputs[0].note.as_deref(), Some("late"));
    assert_eq!(inputs[0].priority, Some(1));
    assert_eq!(inputs[1].priority, Some(2));
    assert!(inputs[1].cast_id.is_none());
}

#[test]
fn grouping_keeps_row_order_within_a_shop() {
    let rows = vec![row("a", "s2"), row("b", "s1"), row("c", "s2")];

    let groups = group_by_shop(&rows);

    let s2: Vec<&str> = groups[&ShopId::from("s2")]
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(s2, vec!["a", "c"]);
    assert_eq!(groups[&ShopId::from("s1")].len(), 1);
}

#[test]
fn cancelled_orders_are_not_targets() {
    let mut cancelled = order("o2", "s1", None);
    cancelled.status = OrderStatus::Cancelled;
    let orders = vec![order("o1", "s1", None), cancelled];

    let open = open_orders_by_shop(&orders);

    assert_eq!(open[&ShopId::from("s1")].len(), 1);
    assert_eq!(open[&ShopId::from("s1")][0].id, OrderId::from("o1"));
}

#[test]
fn single_order_is_always_the_target() {
    let o1 = order("o1", "s1", Some((21, 0)));
    let r = row("local", "s1");

    assert_eq!(
        resolve_target(&[&r], &[&o1], &OrderIndex::default()),
        Target::Order(OrderId::from("o1"))
    );
}

#[test]
fn no_orders_means_no_target() {
    let r = row("local", "s1");
    assert_eq!(
        resolve_target(&[&r], &[], &OrderIndex::default()),
        Target::NoOrder
    );
}

#[test]
fn unmapped_rows_with_several_orders_are_ambiguous() {
    let o1 = order("o1", "s1", Some((20, 0)));
    let o2 = order("o2", "s1", Some((22, 0)));
    let r = row("o1-looking-but-local", "s1");

    assert_eq!(
        resolve_target(&[&r], &[&o1, &o2], &OrderIndex::default()),
        Target::Ambiguous { candidates: 2 }
    );
}

#[test]
fn explicit_order_id_disambiguates() {
    let o1 = order("o1", "s1", None);
    let o2 = order("o2", "s1", None);
    let mapped = row("a", "s1").with_order(OrderId::from("o2"));
    let free = row("b", "s1");

    assert_eq!(
        resolve_target(&[&mapped, &free], &[&o1, &o2], &OrderIndex::default()),
        Target::Order(OrderId::from("o2"))
    );
}

#[test]
fn index_disambiguates_rows_that_lost_their_order_id() {
    let o1 = order("o1", "s1", None);
    let o2 = order("o2", "s1", None);
    let mut index = OrderIndex::default();
    index.record(AssignmentId::from("o1:c1"), OrderId::from("o1"));
    let r = row("o1:c1", "s1");

    assert_eq!(
        resolve_target(&[&r], &[&o1, &o2], &index),
        Target::Order(OrderId::from("o1"))
    );
}

#[test]
fn start_time_disambiguates_unmapped_rows() {
    let o1 = order("o1", "s1", Some((20, 0)));
    let o2 = order("o2", "s1", Some((22, 0)));
    let r = Assignment {
        order_start_time: NaiveTime::from_hms_opt(22, 0, 0),
        ..row("a", "s1")
    };

    assert_eq!(
        resolve_target(&[&r], &[&o1, &o2], &OrderIndex::default()),
        Target::Order(OrderId::from("o2"))
    );
}

#[test]
fn rows_pointing_at_different_orders_are_ambiguous() {
    let o1 = order("o1", "s1", None);
    let o2 = order("o2", "s1", None);
    let a = row("a", "s1").with_order(OrderId::from("o1"));
    let b = row("b", "s1").with_order(OrderId::from("o2"));

    assert_eq!(
        resolve_target(&[&a, &b], &[&o1, &o2], &OrderIndex::default()),
        Target::Ambiguous { candidates: 0 }
    );
}
