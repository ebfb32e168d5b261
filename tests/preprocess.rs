//! Tests for the preprocessing stage.

use leafline::plan::{MachineType, PlanRow, RawQuantity, RawTimestamp};
use leafline::stages::Preprocessor;
use leafline::testing::{PlanRowBuilder, dt};

#[test]
fn test_empty_rows_are_dropped() {
    let empty = PlanRow {
        work_order_nr: "".to_string(),
        article_nr: "  ".to_string(),
        package_type: None,
        specification: None,
        quantity_total: Some(RawQuantity::Count(0)),
        final_quantity: None,
        production_unit: None,
        maker_code: "".to_string(),
        feeder_code: "".to_string(),
        planned_start: None,
        planned_end: None,
    };
    let full = PlanRowBuilder::new("W0001").build();

    let outcome = Preprocessor::new().preprocess(&[empty, full]);

    assert_eq!(outcome.plans.len(), 1);
    assert_eq!(outcome.dropped_empty, 1);
    assert_eq!(outcome.rejected, 0);
}

#[test]
fn test_blank_work_order_nr_is_rejected_with_error() {
    let row = PlanRowBuilder::new("  ").quantity_total(100).build();

    let outcome = Preprocessor::new().preprocess(&[row]);

    assert!(outcome.plans.is_empty());
    assert_eq!(outcome.rejected, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].row_index, 0);
    assert!(
        outcome.errors[0]
            .errors
            .iter()
            .any(|e| e.field.as_deref() == Some("work_order_nr"))
    );
}

#[test]
fn test_product_code_maps_from_article() {
    let row = PlanRowBuilder::new("W0001").article("HNZJHYLC001").build();
    let outcome = Preprocessor::new().preprocess(&[row]);
    assert_eq!(outcome.plans[0].product_code, "HNZJHYLC001");
}

#[test]
fn test_machine_type_inference() {
    let cases = [
        ("C7", MachineType::Maker),
        ("X12", MachineType::Maker),
        ("WSJ", MachineType::Feeder),
        ("", MachineType::Maker),
    ];
    for (maker_code, expected) in cases {
        let row = PlanRowBuilder::new("W0001").makers(maker_code).build();
        let outcome = Preprocessor::new().preprocess(&[row]);
        assert_eq!(
            outcome.plans[0].machine_type, expected,
            "maker code {maker_code:?}"
        );
    }
}

#[test]
fn test_quantity_coercion() {
    let digits = PlanRowBuilder::new("W0001").quantity_text("450").build();
    let junk = PlanRowBuilder::new("W0002").quantity_text("abc").build();
    let negative = PlanRowBuilder::new("W0003").quantity_total(-5).build();

    let outcome = Preprocessor::new().preprocess(&[digits, junk, negative]);

    assert_eq!(outcome.plans[0].plan_quantity, 450);
    assert_eq!(outcome.plans[1].plan_quantity, 0);
    assert_eq!(outcome.plans[2].plan_quantity, 0);
}

#[test]
fn test_multi_machine_flag() {
    let single = PlanRowBuilder::new("W0001").makers("C1").build();
    let multi = PlanRowBuilder::new("W0002").makers("C1,C2").build();

    let outcome = Preprocessor::new().preprocess(&[single, multi]);

    assert!(!outcome.plans[0].is_multi_machine);
    assert!(outcome.plans[1].is_multi_machine);
}

#[test]
fn test_iso_string_timestamps_are_parsed() {
    let row = PlanRowBuilder::new("W0001")
        .window_text("2024-10-16T08:00:00", "2024-10-16 20:00:00")
        .build();

    let outcome = Preprocessor::new().preprocess(&[row]);

    assert_eq!(outcome.plans[0].planned_start, dt("2024-10-16 08:00"));
    assert_eq!(outcome.plans[0].planned_end, dt("2024-10-16 20:00"));
}

#[test]
fn test_unparseable_timestamp_rejects_row() {
    let row = PlanRowBuilder::new("W0001")
        .window_text("soon", "later")
        .build();

    let outcome = Preprocessor::new().preprocess(&[row]);

    assert!(outcome.plans.is_empty());
    assert_eq!(outcome.rejected, 1);
}

#[test]
fn test_native_timestamp_passthrough() {
    let row = PlanRowBuilder::new("W0001").build();
    let outcome = Preprocessor::new().preprocess(&[row]);
    assert_eq!(outcome.plans[0].planned_start, dt("2024-10-16 08:00"));
}

#[test]
fn test_raw_timestamp_resolution() {
    assert_eq!(
        RawTimestamp::Text("2024-10-16".to_string()).resolve(),
        Some(dt("2024-10-16 00:00"))
    );
    assert_eq!(RawTimestamp::Text("nope".to_string()).resolve(), None);
}
