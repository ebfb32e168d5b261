//! Tests for the parallel-synchronisation stage.

use leafline::stages::Synchronizer;
use leafline::testing::dt;
use leafline::{AuditTrail, WorkOrder, WorkOrderType};

fn order(
    work_order_nr: &str,
    source_plan: &str,
    order_type: WorkOrderType,
    machine: &str,
    start: &str,
    end: &str,
) -> WorkOrder {
    let (maker_code, feeder_code) = match order_type {
        WorkOrderType::Packing => (Some(machine.to_string()), "F001".to_string()),
        WorkOrderType::Feeding => (None, machine.to_string()),
    };
    WorkOrder {
        work_order_nr: work_order_nr.to_string(),
        source_plan: source_plan.to_string(),
        order_type,
        article_nr: "HNZJHYLC001".to_string(),
        maker_code,
        feeder_code,
        quantity_total: 200,
        final_quantity: 100,
        planned_start: dt(start),
        planned_end: dt(end),
        split_sequence: None,
        total_makers: None,
        input_plan_id: None,
        associated_makers: Vec::new(),
        tobacco_consumption_rate: 0.0,
        source_plans: Vec::new(),
        plan_count: 0,
        is_backup: false,
        is_synchronized: false,
        sync: None,
        audit: AuditTrail::default(),
    }
}

#[test]
fn test_packers_share_min_start_max_end() {
    let sync = Synchronizer::new(dt("2024-10-16 12:00"));
    let outcome = sync.synchronize(vec![
        order("PK1", "M0001", WorkOrderType::Packing, "C1", "2024-10-16 08:00", "2024-10-16 14:00"),
        order("PK2", "M0001", WorkOrderType::Packing, "C2", "2024-10-16 09:00", "2024-10-16 16:00"),
        order("PK3", "M0001", WorkOrderType::Packing, "C3", "2024-10-16 10:00", "2024-10-16 15:00"),
    ]);

    assert_eq!(outcome.groups_synchronized, 1);
    assert_eq!(outcome.machines_synchronized, 3);
    for order in &outcome.orders {
        assert!(order.is_synchronized);
        assert_eq!(order.planned_start, dt("2024-10-16 08:00"));
        assert_eq!(order.planned_end, dt("2024-10-16 16:00"));
    }
}

#[test]
fn test_sync_tags_are_applied() {
    let sync = Synchronizer::new(dt("2024-10-16 12:00"));
    let outcome = sync.synchronize(vec![
        order("PK1", "M0001", WorkOrderType::Packing, "C1", "2024-10-16 08:00", "2024-10-16 14:00"),
        order("PK2", "M0001", WorkOrderType::Packing, "C2", "2024-10-16 08:00", "2024-10-16 14:00"),
    ]);

    for (i, member) in outcome.orders.iter().enumerate() {
        let sync_group = member.sync.as_ref().expect("sync tags");
        assert_eq!(sync_group.sync_group_id, "SYNC_M0001_20241016120000");
        assert_eq!(sync_group.sync_sequence, i as u32 + 1);
        assert_eq!(sync_group.total_sync_machines, 2);
    }
}

#[test]
fn test_feeder_window_is_left_alone_and_conflict_recorded() {
    let sync = Synchronizer::new(dt("2024-10-16 12:00"));
    let outcome = sync.synchronize(vec![
        order("PK1", "M0001", WorkOrderType::Packing, "C1", "2024-10-16 12:00", "2024-10-16 20:00"),
        order("FD1", "M0001", WorkOrderType::Feeding, "F001", "2024-10-16 08:00", "2024-10-16 16:00"),
    ]);

    let feeder = outcome
        .orders
        .iter()
        .find(|o| o.order_type == WorkOrderType::Feeding)
        .expect("feeder order");
    // The feeder's own window survives; the overlap with the packer start
    // is recorded, not fixed.
    assert_eq!(feeder.planned_start, dt("2024-10-16 08:00"));
    assert_eq!(feeder.planned_end, dt("2024-10-16 16:00"));
    assert!(feeder.audit.residual_conflict.is_some());
    assert_eq!(outcome.warnings.len(), 1);
}

#[test]
fn test_feeder_ending_before_packer_start_is_clean() {
    let sync = Synchronizer::new(dt("2024-10-16 12:00"));
    let outcome = sync.synchronize(vec![
        order("PK1", "M0001", WorkOrderType::Packing, "C1", "2024-10-16 12:00", "2024-10-16 20:00"),
        order("FD1", "M0001", WorkOrderType::Feeding, "F001", "2024-10-16 08:00", "2024-10-16 11:00"),
    ]);

    let feeder = outcome
        .orders
        .iter()
        .find(|o| o.order_type == WorkOrderType::Feeding)
        .expect("feeder order");
    assert!(feeder.audit.residual_conflict.is_none());
    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_feeder_only_group_uses_latest_start_fallback() {
    let sync = Synchronizer::new(dt("2024-10-16 12:00"));
    let outcome = sync.synchronize(vec![
        order("FD1", "M0001", WorkOrderType::Feeding, "F001", "2024-10-16 08:00", "2024-10-16 12:00"),
        order("FD2", "M0001", WorkOrderType::Feeding, "F002", "2024-10-16 10:00", "2024-10-16 14:00"),
    ]);

    for member in &outcome.orders {
        assert_eq!(member.planned_start, dt("2024-10-16 10:00"));
        assert_eq!(member.planned_end, dt("2024-10-16 14:00"));
    }
}

#[test]
fn test_singletons_pass_through_unsynchronised() {
    let sync = Synchronizer::new(dt("2024-10-16 12:00"));
    let outcome = sync.synchronize(vec![order(
        "PK1",
        "M0001",
        WorkOrderType::Packing,
        "C1",
        "2024-10-16 08:00",
        "2024-10-16 14:00",
    )]);

    assert_eq!(outcome.groups_synchronized, 0);
    let only = &outcome.orders[0];
    assert!(!only.is_synchronized);
    assert!(only.sync.is_none());
    assert_eq!(only.planned_start, dt("2024-10-16 08:00"));
}

#[test]
fn test_original_window_is_recorded_when_moved() {
    let sync = Synchronizer::new(dt("2024-10-16 12:00"));
    let outcome = sync.synchronize(vec![
        order("PK1", "M0001", WorkOrderType::Packing, "C1", "2024-10-16 08:00", "2024-10-16 14:00"),
        order("PK2", "M0001", WorkOrderType::Packing, "C2", "2024-10-16 10:00", "2024-10-16 16:00"),
    ]);

    let second = outcome
        .orders
        .iter()
        .find(|o| o.work_order_nr == "PK2")
        .expect("second packer");
    assert_eq!(second.audit.original_start, Some(dt("2024-10-16 10:00")));
    assert_eq!(second.audit.original_end, Some(dt("2024-10-16 16:00")));
    assert_eq!(second.planned_start, dt("2024-10-16 08:00"));
    assert_eq!(second.planned_end, dt("2024-10-16 16:00"));
}

#[test]
fn test_groups_are_independent() {
    let sync = Synchronizer::new(dt("2024-10-16 12:00"));
    let outcome = sync.synchronize(vec![
        order("PK1", "M0001", WorkOrderType::Packing, "C1", "2024-10-16 08:00", "2024-10-16 14:00"),
        order("PK2", "M0001", WorkOrderType::Packing, "C2", "2024-10-16 09:00", "2024-10-16 15:00"),
        order("PK3", "M0002", WorkOrderType::Packing, "C3", "2024-10-16 10:00", "2024-10-16 12:00"),
    ]);

    let other = outcome
        .orders
        .iter()
        .find(|o| o.work_order_nr == "PK3")
        .expect("singleton group");
    assert!(!other.is_synchronized);
    assert_eq!(other.planned_start, dt("2024-10-16 10:00"));
}
