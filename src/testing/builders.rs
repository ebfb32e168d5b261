//! Test data builders for plan rows and reference data.

use chrono::NaiveDateTime;

use crate::plan::{PlanRow, RawQuantity, RawTimestamp};
use crate::reference::{MachineSpeed, MaintenancePlan, MaintenanceStatus, MaintenanceType};

/// Parse a `YYYY-MM-DD HH:MM` literal; panics on malformed input, which is
/// what a test wants.
///
/// # Example
///
/// ```
/// use leafline::testing::dt;
///
/// let start = dt("2024-10-16 08:00");
/// assert_eq!(start.format("%H:%M").to_string(), "08:00");
/// ```
#[must_use]
pub fn dt(literal: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(literal, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(literal, "%Y-%m-%d %H:%M:%S"))
        .unwrap_or_else(|err| panic!("bad test timestamp '{literal}': {err}"))
}

/// A fluent builder for [`PlanRow`] test data.
///
/// Defaults describe a plausible single-machine row so tests only spell out
/// what they care about.
///
/// # Example
///
/// ```
/// use leafline::testing::PlanRowBuilder;
///
/// let row = PlanRowBuilder::new("W0001")
///     .article("HNZJHYLC001")
///     .makers("C1,C2")
///     .feeder("F001")
///     .window("2024-10-16 08:00", "2024-10-16 20:00")
///     .quantity_total(600)
///     .final_quantity(300)
///     .build();
/// assert_eq!(row.maker_code, "C1,C2");
/// ```
pub struct PlanRowBuilder {
    row: PlanRow,
}

impl PlanRowBuilder {
    #[must_use]
    pub fn new(work_order_nr: &str) -> Self {
        Self {
            row: PlanRow {
                work_order_nr: work_order_nr.to_string(),
                article_nr: "HNZJHYLC001".to_string(),
                package_type: None,
                specification: None,
                quantity_total: Some(RawQuantity::Count(200)),
                final_quantity: Some(RawQuantity::Count(100)),
                production_unit: None,
                maker_code: "C1".to_string(),
                feeder_code: "F001".to_string(),
                planned_start: Some(RawTimestamp::Native(dt("2024-10-16 08:00"))),
                planned_end: Some(RawTimestamp::Native(dt("2024-10-16 20:00"))),
            },
        }
    }

    #[must_use]
    pub fn article(mut self, article_nr: &str) -> Self {
        self.row.article_nr = article_nr.to_string();
        self
    }

    /// Maker code cell; several machines separated by `,` or `;`.
    #[must_use]
    pub fn makers(mut self, maker_code: &str) -> Self {
        self.row.maker_code = maker_code.to_string();
        self
    }

    #[must_use]
    pub fn feeder(mut self, feeder_code: &str) -> Self {
        self.row.feeder_code = feeder_code.to_string();
        self
    }

    #[must_use]
    pub fn window(mut self, start: &str, end: &str) -> Self {
        self.row.planned_start = Some(RawTimestamp::Native(dt(start)));
        self.row.planned_end = Some(RawTimestamp::Native(dt(end)));
        self
    }

    /// Time fields as raw strings, exercising the ISO-8601 parse path.
    #[must_use]
    pub fn window_text(mut self, start: &str, end: &str) -> Self {
        self.row.planned_start = Some(RawTimestamp::Text(start.to_string()));
        self.row.planned_end = Some(RawTimestamp::Text(end.to_string()));
        self
    }

    #[must_use]
    pub fn quantity_total(mut self, quantity: i64) -> Self {
        self.row.quantity_total = Some(RawQuantity::Count(quantity));
        self
    }

    /// Quantity as a raw string, exercising the coercion path.
    #[must_use]
    pub fn quantity_text(mut self, quantity: &str) -> Self {
        self.row.quantity_total = Some(RawQuantity::Text(quantity.to_string()));
        self
    }

    #[must_use]
    pub fn final_quantity(mut self, quantity: i64) -> Self {
        self.row.final_quantity = Some(RawQuantity::Count(quantity));
        self
    }

    #[must_use]
    pub fn package_type(mut self, package_type: &str) -> Self {
        self.row.package_type = Some(package_type.to_string());
        self
    }

    #[must_use]
    pub fn build(self) -> PlanRow {
        self.row
    }
}

/// Shorthand for a speed-table entry.
#[must_use]
pub fn speed_entry(machine: &str, article: &str, speed: f64, efficiency: f64) -> MachineSpeed {
    MachineSpeed {
        machine_code: machine.to_string(),
        article_nr: article.to_string(),
        speed,
        efficiency_rate: efficiency,
        setup_minutes: None,
        changeover_minutes: None,
        effective_from: None,
        effective_to: None,
    }
}

/// Shorthand for an active maintenance window.
#[must_use]
pub fn maintenance_window(
    machine: &str,
    start: &str,
    end: &str,
    maintenance_type: MaintenanceType,
) -> MaintenancePlan {
    MaintenancePlan {
        machine_code: machine.to_string(),
        maint_start_time: dt(start),
        maint_end_time: dt(end),
        maintenance_type,
        plan_status: MaintenanceStatus::Planned,
    }
}
