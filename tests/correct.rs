//! Tests for the time-correction stage.

use leafline::stages::TimeCorrector;
use leafline::testing::{dt, maintenance_window, speed_entry};
use leafline::{
    AuditTrail, InMemoryReference, MaintenanceStatus, MaintenanceType, ReferencePort,
    ReferenceSnapshot, SchedulerConfig, Shift, WorkOrder, WorkOrderType,
};

fn packer(start: &str, end: &str, final_quantity: i64) -> WorkOrder {
    WorkOrder {
        work_order_nr: "PK202410161200000001".to_string(),
        source_plan: "W0001".to_string(),
        order_type: WorkOrderType::Packing,
        article_nr: "HNZJHYLC001".to_string(),
        maker_code: Some("C1".to_string()),
        feeder_code: "F001".to_string(),
        quantity_total: final_quantity * 2,
        final_quantity,
        planned_start: dt(start),
        planned_end: dt(end),
        split_sequence: Some(1),
        total_makers: Some(1),
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

fn snapshot(reference: InMemoryReference) -> ReferenceSnapshot {
    reference.snapshot().expect("in-memory snapshot")
}

// ---------- speed ----------

#[test]
fn test_speed_recomputes_end_beyond_tolerance() {
    let reference = snapshot(
        InMemoryReference::new().with_speed(speed_entry("C1", "HNZJHYLC001", 20.0, 1.0)),
    );
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    // 100 boxes at 20/h = 5h, plus 45 min default setup and changeover.
    let order = corrector.correct_order(packer("2024-10-16 08:00", "2024-10-16 20:00", 100));

    assert!(order.audit.speed_adjusted);
    assert_eq!(order.planned_end, dt("2024-10-16 13:45"));
    assert_eq!(order.audit.original_planned_end, Some(dt("2024-10-16 20:00")));
    assert!((order.audit.effective_capacity - 20.0).abs() < 1e-9);
    assert!((order.audit.production_hours - 5.0).abs() < 1e-9);
}

#[test]
fn test_speed_within_tolerance_keeps_window() {
    let reference = snapshot(
        InMemoryReference::new().with_speed(speed_entry("C1", "HNZJHYLC001", 20.0, 1.0)),
    );
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    // Planned end matches the computed 13:45 exactly.
    let order = corrector.correct_order(packer("2024-10-16 08:00", "2024-10-16 13:45", 100));

    assert!(!order.audit.speed_adjusted);
    assert_eq!(order.planned_end, dt("2024-10-16 13:45"));
}

#[test]
fn test_percentage_efficiency_is_normalised() {
    let reference = snapshot(
        InMemoryReference::new().with_speed(speed_entry("C1", "HNZJHYLC001", 100.0, 85.0)),
    );
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    // 170 boxes at 85/h effective = 2h, plus 45 min.
    let order = corrector.correct_order(packer("2024-10-16 08:00", "2024-10-16 20:00", 170));

    assert!(order.audit.speed_adjusted);
    assert_eq!(order.planned_end, dt("2024-10-16 10:45"));
}

#[test]
fn test_machine_wide_default_speed_applies() {
    let reference =
        snapshot(InMemoryReference::new().with_speed(speed_entry("C1", "*", 20.0, 1.0)));
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    let order = corrector.correct_order(packer("2024-10-16 08:00", "2024-10-16 20:00", 100));
    assert!(order.audit.speed_adjusted);
}

#[test]
fn test_wildcard_machine_speed_applies() {
    let reference =
        snapshot(InMemoryReference::new().with_speed(speed_entry("*", "HNZJHYLC001", 20.0, 1.0)));
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    let order = corrector.correct_order(packer("2024-10-16 08:00", "2024-10-16 20:00", 100));
    assert!(order.audit.speed_adjusted);
}

#[test]
fn test_missing_speed_entry_skips_substep() {
    let reference = snapshot(InMemoryReference::new());
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    let order = corrector.correct_order(packer("2024-10-16 08:00", "2024-10-16 20:00", 100));

    assert!(!order.audit.speed_adjusted);
    assert_eq!(order.planned_end, dt("2024-10-16 20:00"));
}

#[test]
fn test_zero_capacity_skips_substep() {
    let reference = snapshot(
        InMemoryReference::new().with_speed(speed_entry("C1", "HNZJHYLC001", 0.0, 1.0)),
    );
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    let order = corrector.correct_order(packer("2024-10-16 08:00", "2024-10-16 20:00", 100));
    assert!(!order.audit.speed_adjusted);
}

// ---------- maintenance ----------

#[test]
fn test_major_maintenance_shifts_order() {
    let reference = snapshot(InMemoryReference::new().with_maintenance(maintenance_window(
        "C1",
        "2024-10-20 10:00",
        "2024-10-20 12:00",
        MaintenanceType::Major,
    )));
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    let order = corrector.correct_order(packer("2024-10-20 08:00", "2024-10-20 16:00", 100));

    assert!(order.audit.maintenance_adjusted);
    assert_eq!(order.planned_start, dt("2024-10-20 12:00"));
    assert_eq!(order.planned_end, dt("2024-10-20 20:00"));
    assert_eq!(order.audit.maintenance_conflicts_resolved, 1);
    assert!((order.audit.maintenance_adjustment_hours - 4.0).abs() < 1e-9);
}

#[test]
fn test_routine_maintenance_with_enough_lead_time_compresses() {
    let reference = snapshot(InMemoryReference::new().with_maintenance(maintenance_window(
        "C1",
        "2024-10-20 12:00",
        "2024-10-20 13:00",
        MaintenanceType::Routine,
    )));
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    let order = corrector.correct_order(packer("2024-10-20 08:00", "2024-10-20 16:00", 100));

    assert!(order.audit.maintenance_adjusted);
    assert_eq!(order.planned_start, dt("2024-10-20 08:00"));
    assert_eq!(order.planned_end, dt("2024-10-20 12:00"));
}

#[test]
fn test_routine_maintenance_without_lead_time_shifts() {
    let reference = snapshot(InMemoryReference::new().with_maintenance(maintenance_window(
        "C1",
        "2024-10-20 09:00",
        "2024-10-20 10:00",
        MaintenanceType::Routine,
    )));
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    let order = corrector.correct_order(packer("2024-10-20 08:00", "2024-10-20 16:00", 100));

    assert!(order.audit.maintenance_adjusted);
    assert_eq!(order.planned_start, dt("2024-10-20 10:00"));
    assert_eq!(order.planned_end, dt("2024-10-20 18:00"));
}

#[test]
fn test_chained_maintenance_conflicts_resolve_in_one_pass() {
    let reference = snapshot(
        InMemoryReference::new()
            .with_maintenance(maintenance_window(
                "C1",
                "2024-10-20 09:00",
                "2024-10-20 10:00",
                MaintenanceType::Major,
            ))
            .with_maintenance(maintenance_window(
                "C1",
                "2024-10-20 17:00",
                "2024-10-20 18:00",
                MaintenanceType::Overhaul,
            )),
    );
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    // [08,16] hits the first window, shifts to [10,18], which hits the
    // second, landing at [18,26].
    let order = corrector.correct_order(packer("2024-10-20 08:00", "2024-10-20 16:00", 100));

    assert_eq!(order.audit.maintenance_conflicts_resolved, 2);
    assert_eq!(order.planned_start, dt("2024-10-20 18:00"));
    assert_eq!(order.planned_end, dt("2024-10-21 02:00"));
}

#[test]
fn test_completed_maintenance_is_ignored() {
    let mut window = maintenance_window(
        "C1",
        "2024-10-20 10:00",
        "2024-10-20 12:00",
        MaintenanceType::Major,
    );
    window.plan_status = MaintenanceStatus::Completed;
    let reference = snapshot(InMemoryReference::new().with_maintenance(window));
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    let order = corrector.correct_order(packer("2024-10-20 08:00", "2024-10-20 16:00", 100));
    assert!(!order.audit.maintenance_adjusted);
}

#[test]
fn test_maintenance_on_other_machine_is_ignored() {
    let reference = snapshot(InMemoryReference::new().with_maintenance(maintenance_window(
        "C9",
        "2024-10-20 10:00",
        "2024-10-20 12:00",
        MaintenanceType::Major,
    )));
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    let order = corrector.correct_order(packer("2024-10-20 08:00", "2024-10-20 16:00", 100));
    assert!(!order.audit.maintenance_adjusted);
}

// ---------- shifts ----------

#[test]
fn test_start_outside_shift_moves_to_next_shift_start() {
    let reference =
        snapshot(InMemoryReference::new().with_shift(Shift::new("白班", "08:00", "16:00")));
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    let order = corrector.correct_order(packer("2024-10-16 06:00", "2024-10-16 10:00", 0));

    assert!(order.audit.shift_adjusted);
    assert_eq!(order.planned_start, dt("2024-10-16 08:00"));
    assert_eq!(order.planned_end, dt("2024-10-16 12:00"));
}

#[test]
fn test_end_past_shift_end_is_clamped() {
    let reference =
        snapshot(InMemoryReference::new().with_shift(Shift::new("白班", "08:00", "16:00")));
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    let order = corrector.correct_order(packer("2024-10-16 09:00", "2024-10-16 18:00", 0));

    assert!(order.audit.shift_adjusted);
    assert!(order.audit.duration_adjusted);
    assert_eq!(order.planned_end, dt("2024-10-16 16:00"));
}

#[test]
fn test_long_orders_may_cross_shifts() {
    let reference =
        snapshot(InMemoryReference::new().with_shift(Shift::new("白班", "08:00", "16:00")));
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    // 26 hours, above the 24-hour clamp threshold.
    let order = corrector.correct_order(packer("2024-10-16 09:00", "2024-10-17 11:00", 0));

    assert!(order.audit.cross_shift_allowed);
    assert!(!order.audit.duration_adjusted);
    assert_eq!(order.planned_end, dt("2024-10-17 11:00"));
}

#[test]
fn test_midnight_shift_end_is_next_day() {
    let reference =
        snapshot(InMemoryReference::new().with_shift(Shift::new("夜班", "16:00", "24:00")));
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    // Ends past midnight; the 24:00 shift end is midnight of the 17th.
    let order = corrector.correct_order(packer("2024-10-16 17:00", "2024-10-17 01:00", 0));

    assert!(order.audit.duration_adjusted);
    assert_eq!(order.planned_end, dt("2024-10-17 00:00"));
}

#[test]
fn test_wrapping_night_shift_contains_late_start() {
    let reference =
        snapshot(InMemoryReference::new().with_shift(Shift::new("夜班", "22:00", "06:00")));
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    let order = corrector.correct_order(packer("2024-10-16 23:00", "2024-10-17 08:00", 0));

    // Start is inside the wrapped shift; end clamps to 06:00 next day.
    assert_eq!(order.planned_start, dt("2024-10-16 23:00"));
    assert_eq!(order.planned_end, dt("2024-10-17 06:00"));
    assert!(order.audit.duration_adjusted);
}

#[test]
fn test_no_shift_config_skips_clamping() {
    let reference = snapshot(InMemoryReference::new());
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    let order = corrector.correct_order(packer("2024-10-16 03:00", "2024-10-16 23:00", 0));

    assert!(!order.audit.shift_adjusted);
    assert_eq!(order.planned_start, dt("2024-10-16 03:00"));
}

// ---------- stage-level ----------

#[test]
fn test_correct_all_tallies_adjustments() {
    let reference = snapshot(
        InMemoryReference::new()
            .with_speed(speed_entry("C1", "HNZJHYLC001", 20.0, 1.0))
            .with_maintenance(maintenance_window(
                "C1",
                "2024-10-16 09:00",
                "2024-10-16 10:00",
                MaintenanceType::Major,
            )),
    );
    let config = SchedulerConfig::default();
    let corrector = TimeCorrector::new(&reference, &config);

    let (orders, outcome) =
        corrector.correct_all(vec![packer("2024-10-16 08:00", "2024-10-16 20:00", 100)]);

    assert_eq!(orders.len(), 1);
    assert_eq!(outcome.speed_adjusted, 1);
    assert_eq!(outcome.maintenance_adjusted, 1);
    assert_eq!(outcome.total_adjusted, 1);
}
