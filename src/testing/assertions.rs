//! Assertion functions for scheduling outputs.
//!
//! These check the invariants the pipeline is supposed to uphold: interval
//! exclusivity per feeder, quantity conservation across a split, identifier
//! formats, and synchronised packer windows. Each panics with a message
//! naming the offending order.

use regex::Regex;

use crate::mes::MesOrder;
use crate::order::{WorkOrder, WorkOrderType};

/// Assert every order's window satisfies `planned_end > planned_start`.
///
/// # Panics
///
/// Panics on the first order with an empty or inverted window.
pub fn assert_time_monotonic(orders: &[MesOrder]) {
    for order in orders {
        assert!(
            order.planned_end > order.planned_start,
            "order {} has non-monotonic window: {} -> {}",
            order.plan_id,
            order.planned_start,
            order.planned_end
        );
    }
}

/// Assert no two orders on the same feeder overlap, under strict-overlap
/// semantics (shared boundaries allowed).
///
/// # Panics
///
/// Panics on the first overlapping pair.
pub fn assert_no_feeder_overlap(orders: &[WorkOrder]) {
    let feeders: Vec<&WorkOrder> = orders
        .iter()
        .filter(|o| o.order_type == WorkOrderType::Feeding)
        .collect();
    for (i, a) in feeders.iter().enumerate() {
        for b in feeders.iter().skip(i + 1) {
            if a.feeder_code != b.feeder_code {
                continue;
            }
            assert!(
                !a.slot().overlaps(&b.slot()),
                "feeder {} double-booked: {} [{} - {}] overlaps {} [{} - {}]",
                a.feeder_code,
                a.work_order_nr,
                a.planned_start,
                a.planned_end,
                b.work_order_nr,
                b.planned_start,
                b.planned_end
            );
        }
    }
}

/// Assert the packer orders split from `source_plan` sum to the expected
/// finished quantity.
///
/// # Panics
///
/// Panics when the split lost or invented boxes.
pub fn assert_quantity_conserved(orders: &[WorkOrder], source_plan: &str, expected: i64) {
    let total: i64 = orders
        .iter()
        .filter(|o| o.order_type == WorkOrderType::Packing && o.source_plan == source_plan)
        .map(|o| o.final_quantity)
        .sum();
    assert_eq!(
        total, expected,
        "packer orders of {source_plan} sum to {total}, expected {expected}"
    );
}

/// Assert a plan id matches `H(WS|JB)` + nine digits.
///
/// # Panics
///
/// Panics when the id does not match.
pub fn assert_plan_id_format(plan_id: &str) {
    let pattern = Regex::new(r"^H(WS|JB)\d{9}$").expect("valid pattern");
    assert!(pattern.is_match(plan_id), "malformed plan id: {plan_id}");
}

/// Assert every emitted order's plan id is well-formed and unique.
///
/// # Panics
///
/// Panics on a malformed or duplicated id.
pub fn assert_plan_id_formats(orders: &[MesOrder]) {
    let mut seen = std::collections::HashSet::new();
    for order in orders {
        assert_plan_id_format(&order.plan_id);
        assert!(
            seen.insert(&order.plan_id),
            "duplicate plan id: {}",
            order.plan_id
        );
    }
}

/// Assert a work-order number matches its stage's shape: `M` + 12 digits,
/// `B` + 12 digits, or `PK`/`FD` + 18 digits.
///
/// # Panics
///
/// Panics when the number does not match.
pub fn assert_work_order_nr_format(work_order_nr: &str) {
    let pattern = Regex::new(r"^(M\d{12}|B\d{12}|PK\d{18}|FD\d{18})$").expect("valid pattern");
    assert!(
        pattern.is_match(work_order_nr),
        "malformed work order number: {work_order_nr}"
    );
}

/// Assert all HJB orders sharing an original work order have identical
/// windows.
///
/// # Panics
///
/// Panics on the first group with diverging packer windows.
pub fn assert_packers_synchronized(orders: &[MesOrder]) {
    use std::collections::HashMap;
    let mut groups: HashMap<&str, Vec<&MesOrder>> = HashMap::new();
    for order in orders.iter().filter(|o| o.is_packing()) {
        groups
            .entry(order.original_work_order_nr.as_str())
            .or_default()
            .push(order);
    }
    for (group, members) in groups {
        let first = members[0];
        for other in &members[1..] {
            assert_eq!(
                (first.planned_start, first.planned_end),
                (other.planned_start, other.planned_end),
                "packers of {group} not synchronised: {} vs {}",
                first.plan_id,
                other.plan_id
            );
        }
    }
}

/// Assert every HJB order's input batch references an HWS order emitted in
/// the same run.
///
/// # Panics
///
/// Panics on a missing input batch or a dangling reference.
pub fn assert_input_batch_linkage(orders: &[MesOrder]) {
    let hws_ids: std::collections::HashSet<&str> = orders
        .iter()
        .filter(|o| o.is_feeding())
        .map(|o| o.plan_id.as_str())
        .collect();
    for order in orders.iter().filter(|o| o.is_packing()) {
        let batch = order
            .input_batch
            .as_ref()
            .unwrap_or_else(|| panic!("HJB {} has no input batch", order.plan_id));
        assert!(
            hws_ids.contains(batch.input_plan_id.as_str()),
            "HJB {} references unknown HWS {}",
            order.plan_id,
            batch.input_plan_id
        );
    }
}
