//! Tests for the work-order generation stage.

use anyhow::bail;
use leafline::stages::Generator;
use leafline::testing::{
    assert_input_batch_linkage, assert_plan_id_format, assert_plan_id_formats, dt,
};
use leafline::{
    AuditTrail, InMemorySequence, MesOrderKind, SequenceKind, SequencePort, SyncGroup, WorkOrder,
    WorkOrderType, format_plan_id,
};

fn packer(work_order_nr: &str, source_plan: &str, maker: &str, final_quantity: i64) -> WorkOrder {
    WorkOrder {
        work_order_nr: work_order_nr.to_string(),
        source_plan: source_plan.to_string(),
        order_type: WorkOrderType::Packing,
        article_nr: "HNZJHYLC001".to_string(),
        maker_code: Some(maker.to_string()),
        feeder_code: "F001".to_string(),
        quantity_total: final_quantity * 2,
        final_quantity,
        planned_start: dt("2024-10-16 08:00"),
        planned_end: dt("2024-10-16 20:00"),
        split_sequence: Some(1),
        total_makers: Some(1),
        input_plan_id: Some("FD202410161200000001".to_string()),
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

fn feeder(source_plan: &str) -> WorkOrder {
    WorkOrder {
        work_order_nr: "FD202410161200000001".to_string(),
        source_plan: source_plan.to_string(),
        order_type: WorkOrderType::Feeding,
        article_nr: "HNZJHYLC001".to_string(),
        maker_code: None,
        feeder_code: "F001".to_string(),
        quantity_total: 400,
        final_quantity: 200,
        planned_start: dt("2024-10-16 08:00"),
        planned_end: dt("2024-10-16 20:00"),
        split_sequence: None,
        total_makers: None,
        input_plan_id: None,
        associated_makers: vec!["C1".to_string(), "C2".to_string()],
        tobacco_consumption_rate: 33.33,
        source_plans: vec![source_plan.to_string()],
        plan_count: 1,
        is_backup: false,
        is_synchronized: false,
        sync: None,
        audit: AuditTrail::default(),
    }
}

#[test]
fn test_one_hws_per_feeder_one_hjb_per_maker() {
    let sequence = InMemorySequence::new();
    let mut generator = Generator::new(&sequence, "task-1", dt("2024-10-16 12:00"));

    let orders = vec![
        feeder("M0001"),
        packer("PK0001", "M0001", "C1", 100),
        packer("PK0002", "M0001", "C2", 100),
    ];
    let outcome = generator.generate(&orders);

    let feeding: Vec<_> = outcome.mes_orders.iter().filter(|o| o.is_feeding()).collect();
    let packing: Vec<_> = outcome.mes_orders.iter().filter(|o| o.is_packing()).collect();
    assert_eq!(feeding.len(), 1);
    assert_eq!(packing.len(), 2);

    assert_eq!(feeding[0].plan_id, "HWS000000001");
    assert_eq!(feeding[0].production_line, "F001");
    assert_eq!(feeding[0].unit, "公斤");
    assert_eq!(feeding[0].quantity, None);
    assert!(feeding[0].input_batch.is_none());

    for order in &packing {
        assert_eq!(order.unit, "箱");
        assert_eq!(order.quantity, Some(100));
        let batch = order.input_batch.as_ref().expect("input batch");
        assert_eq!(batch.input_plan_id, "HWS000000001");
        assert!(batch.is_main_channel);
        assert!(!batch.is_deleted);
        assert_eq!(batch.material_code, "HNZJHYLC001");
    }

    assert_plan_id_formats(&outcome.mes_orders);
    assert_input_batch_linkage(&outcome.mes_orders);
}

#[test]
fn test_wire_date_formats() {
    let sequence = InMemorySequence::new();
    let mut generator = Generator::new(&sequence, "task-1", dt("2024-10-16 12:00"));

    let outcome = generator.generate(&[packer("PK0001", "M0001", "C1", 100)]);
    let order = outcome.mes_orders.iter().find(|o| o.is_packing()).expect("HJB");

    assert_eq!(order.plan_start_time, "2024/10/16 08:00:00");
    assert_eq!(order.plan_end_time, "2024/10/16 20:00:00");
    assert_eq!(order.plan_date, "2024/10/16");
}

#[test]
fn test_missing_linkage_falls_back_to_first_hws() {
    let sequence = InMemorySequence::new();
    let mut generator = Generator::new(&sequence, "task-1", dt("2024-10-16 12:00"));

    let mut orphan = packer("PK0001", "M0001", "C1", 100);
    orphan.input_plan_id = None;
    let outcome = generator.generate(&[orphan]);

    // The synthesized HWS for the packer's feeder is the fallback target.
    let hjb = outcome.mes_orders.iter().find(|o| o.is_packing()).expect("HJB");
    let hws = outcome.mes_orders.iter().find(|o| o.is_feeding()).expect("HWS");
    assert_eq!(
        hjb.input_batch.as_ref().map(|b| b.input_plan_id.as_str()),
        Some(hws.plan_id.as_str())
    );
}

#[test]
fn test_sequences_are_independent_per_kind() {
    let sequence = InMemorySequence::new();
    let mut generator = Generator::new(&sequence, "task-1", dt("2024-10-16 12:00"));

    let orders = vec![
        feeder("M0001"),
        packer("PK0001", "M0001", "C1", 100),
        packer("PK0002", "M0001", "C2", 100),
    ];
    let outcome = generator.generate(&orders);

    let mut hjb_ids: Vec<&str> = outcome
        .mes_orders
        .iter()
        .filter(|o| o.is_packing())
        .map(|o| o.plan_id.as_str())
        .collect();
    hjb_ids.sort_unstable();
    assert_eq!(hjb_ids, vec!["HJB000000001", "HJB000000002"]);
}

#[test]
fn test_schedule_summary_cartesian_product() {
    let sequence = InMemorySequence::new();
    let mut generator = Generator::new(&sequence, "task-1", dt("2024-10-16 12:00"));

    let mut synced1 = packer("PK0001", "M0001", "C1", 100);
    let mut synced2 = packer("PK0002", "M0001", "C2", 100);
    let tags = SyncGroup {
        sync_group_id: "SYNC_M0001_20241016120000".to_string(),
        sync_sequence: 1,
        total_sync_machines: 3,
    };
    synced1.sync = Some(tags.clone());
    synced2.sync = Some(tags);
    let orders = vec![feeder("M0001"), synced1, synced2];

    let outcome = generator.generate(&orders);

    // 2 makers x 1 feeder.
    assert_eq!(outcome.schedule_summaries.len(), 2);
    for summary in &outcome.schedule_summaries {
        assert_eq!(summary.work_order_nr, "M0001");
        assert_eq!(summary.feeder_code, "F001");
        assert_eq!(summary.final_quantity, 200);
        assert_eq!(summary.quantity_total, 400);
        assert_eq!(summary.task_id, "task-1");
        assert_eq!(summary.schedule_status, "COMPLETED");
        assert_eq!(
            summary.sync_group_id.as_deref(),
            Some("SYNC_M0001_20241016120000")
        );
    }
    let makers: Vec<&str> = outcome
        .schedule_summaries
        .iter()
        .map(|s| s.maker_code.as_str())
        .collect();
    assert_eq!(makers, vec!["C1", "C2"]);
}

#[test]
fn test_feeder_only_group_emits_no_summary() {
    let sequence = InMemorySequence::new();
    let mut generator = Generator::new(&sequence, "task-1", dt("2024-10-16 12:00"));

    let outcome = generator.generate(&[feeder("M0001")]);
    assert!(outcome.schedule_summaries.is_empty());
    assert_eq!(outcome.mes_orders.len(), 1);
}

#[test]
fn test_output_is_sorted_by_plan_id() {
    let sequence = InMemorySequence::new();
    let mut generator = Generator::new(&sequence, "task-1", dt("2024-10-16 12:00"));

    let orders = vec![
        feeder("M0001"),
        packer("PK0001", "M0001", "C1", 100),
        packer("PK0002", "M0002", "C2", 100),
    ];
    let outcome = generator.generate(&orders);

    let ids: Vec<&str> = outcome.mes_orders.iter().map(|o| o.plan_id.as_str()).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
}

struct FailingSequence;

impl SequencePort for FailingSequence {
    fn next(&self, _kind: SequenceKind) -> anyhow::Result<u64> {
        bail!("sequence store unavailable")
    }
}

#[test]
fn test_sequence_failure_falls_back_with_flag() {
    let sequence = FailingSequence;
    let mut generator = Generator::new(&sequence, "task-1", dt("2024-10-16 12:00"));

    let outcome = generator.generate(&[packer("PK0001", "M0001", "C1", 100)]);

    assert_eq!(outcome.fallback_count, 2);
    assert_eq!(outcome.warnings.len(), 2);
    for order in &outcome.mes_orders {
        assert_eq!(order.order_type, MesOrderKind::Fallback);
        assert_plan_id_format(&order.plan_id);
    }
}

#[test]
fn test_format_plan_id_zero_pads() {
    assert_eq!(format_plan_id(SequenceKind::Hws, 1), "HWS000000001");
    assert_eq!(format_plan_id(SequenceKind::Hjb, 123456789), "HJB123456789");
}
