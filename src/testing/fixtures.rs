//! Pre-built rows and reference data for common scheduling scenarios.

use crate::plan::PlanRow;
use crate::reference::{InMemoryReference, Shift};

use super::builders::PlanRowBuilder;

/// The plant's standard three-shift day: 白班 08:00–16:00, 夜班 16:00–24:00,
/// 早班 00:00–08:00.
#[must_use]
pub fn default_shifts() -> Vec<Shift> {
    vec![
        Shift::new("白班", "08:00", "16:00"),
        Shift::new("夜班", "16:00", "24:00"),
        Shift::new("早班", "00:00", "08:00"),
    ]
}

/// Reference store covering the whole day with the default shifts and no
/// speeds, maintenance, or relations.
#[must_use]
pub fn reference_with_default_shifts() -> InMemoryReference {
    InMemoryReference::new().with_shifts(default_shifts())
}

/// Two rows that merge: same product, machines, and month, back-to-back
/// windows on 2024-10-16, 100 boxes each.
#[must_use]
pub fn mergeable_rows() -> Vec<PlanRow> {
    vec![
        PlanRowBuilder::new("W0001")
            .window("2024-10-16 08:00", "2024-10-16 14:00")
            .quantity_total(200)
            .final_quantity(100)
            .build(),
        PlanRowBuilder::new("W0002")
            .window("2024-10-16 14:00", "2024-10-16 20:00")
            .quantity_total(200)
            .final_quantity(100)
            .build(),
    ]
}

/// Two rows on the same feeder with different makers and identical
/// windows, forcing a feeder conflict.
#[must_use]
pub fn conflicting_feeder_rows() -> Vec<PlanRow> {
    vec![
        PlanRowBuilder::new("W0001")
            .makers("C1")
            .window("2024-10-16 08:00", "2024-10-16 14:00")
            .quantity_total(100)
            .final_quantity(50)
            .build(),
        PlanRowBuilder::new("W0002")
            .makers("C2")
            .window("2024-10-16 08:00", "2024-10-16 14:00")
            .quantity_total(100)
            .final_quantity(50)
            .build(),
    ]
}

/// One row split across three makers, 300 boxes.
#[must_use]
pub fn multi_maker_row() -> PlanRow {
    PlanRowBuilder::new("W0001")
        .makers("C1,C2,C3")
        .window("2024-10-16 08:00", "2024-10-16 20:00")
        .quantity_total(600)
        .final_quantity(300)
        .build()
}

/// Two rows identical in every merge key except the month boundary between
/// their starts.
#[must_use]
pub fn cross_month_rows() -> Vec<PlanRow> {
    vec![
        PlanRowBuilder::new("W0001")
            .window("2024-10-31 20:00", "2024-11-01 02:00")
            .final_quantity(100)
            .build(),
        PlanRowBuilder::new("W0002")
            .window("2024-11-01 02:00", "2024-11-01 08:00")
            .final_quantity(100)
            .build(),
    ]
}
