//! Tests for validation functionality.

use leafline::testing::PlanRowBuilder;
use leafline::validation::{ValidationError, validate_rows};

#[test]
fn test_valid_rows_pass() {
    let rows = vec![
        PlanRowBuilder::new("W0001").build(),
        PlanRowBuilder::new("W0002").build(),
    ];
    let report = validate_rows(&rows);

    assert!(report.is_valid());
    assert_eq!(report.total_rows, 2);
    assert_eq!(report.valid_rows, 2);
}

#[test]
fn test_blank_work_order_nr_is_reported() {
    let rows = vec![PlanRowBuilder::new("  ").build()];
    let report = validate_rows(&rows);

    assert!(!report.is_valid());
    let error = &report.errors[0];
    assert_eq!(error.row_index, 0);
    assert!(error.work_order_nr.is_none());
    assert!(
        error
            .errors
            .iter()
            .any(|e| e.field.as_deref() == Some("work_order_nr"))
    );
}

#[test]
fn test_blank_article_is_reported_with_order_context() {
    let rows = vec![PlanRowBuilder::new("W0001").article("").build()];
    let report = validate_rows(&rows);

    assert!(!report.is_valid());
    assert_eq!(report.errors[0].work_order_nr.as_deref(), Some("W0001"));
    assert!(
        report.errors[0]
            .errors
            .iter()
            .any(|e| e.field.as_deref() == Some("article_nr"))
    );
}

#[test]
fn test_empty_rows_are_not_errors() {
    let mut row = PlanRowBuilder::new("").article("").build();
    row.quantity_total = None;
    let report = validate_rows(&[row]);

    assert!(report.is_valid());
    assert_eq!(report.valid_rows, 1);
}

#[test]
fn test_error_display_includes_field() {
    let error = ValidationError::field("article_nr", "must not be blank");
    assert_eq!(error.to_string(), "[article_nr] must not be blank");

    let bare = ValidationError::new("row is nonsense");
    assert_eq!(bare.to_string(), "row is nonsense");
}

#[test]
fn test_report_serialises_to_json() {
    let rows = vec![PlanRowBuilder::new("  ").build()];
    let report = validate_rows(&rows);
    let json = report.to_json().expect("serialisable report");
    assert!(json.contains("work_order_nr"));
}
