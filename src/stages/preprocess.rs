//! Stage 1: preprocessing — row cleanup, field mapping, and validation.
//!
//! Raw decade-plan rows arrive loosely typed and partially blank. This
//! stage drops empty rows, maps `article_nr` onto `product_code`, infers
//! the machine type from the maker code, coerces quantities to
//! non-negative integers, flags multi-machine rows, and rejects rows
//! without a work-order number or a usable time window. It never aborts;
//! per-row problems land in the outcome's error list.

use log::{debug, info};

use crate::plan::{MachineType, PlanRow, PreprocessedPlan};
use crate::validation::{RowError, ValidationError};

/// Report returned by [`Preprocessor::preprocess`].
#[derive(Debug, Default)]
pub struct PreprocessOutcome {
    pub plans: Vec<PreprocessedPlan>,
    pub errors: Vec<RowError>,
    /// Rows rejected by validation.
    pub rejected: usize,
    /// Rows dropped because they were entirely empty.
    pub dropped_empty: usize,
}

/// The preprocessing stage.
#[derive(Debug, Default)]
pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Normalise and validate a batch of raw rows.
    pub fn preprocess(&self, rows: &[PlanRow]) -> PreprocessOutcome {
        let mut outcome = PreprocessOutcome::default();

        for (index, row) in rows.iter().enumerate() {
            if row.is_empty() {
                debug!("dropping empty row {index}");
                outcome.dropped_empty += 1;
                continue;
            }

            let mut errors = Vec::new();
            if row.work_order_nr.trim().is_empty() {
                errors.push(ValidationError::field("work_order_nr", "must not be blank"));
            }

            let planned_start = row.planned_start.as_ref().and_then(|t| t.resolve());
            let planned_end = row.planned_end.as_ref().and_then(|t| t.resolve());
            if planned_start.is_none() {
                errors.push(ValidationError::field("planned_start", "missing or unparseable"));
            }
            if planned_end.is_none() {
                errors.push(ValidationError::field("planned_end", "missing or unparseable"));
            }

            if !errors.is_empty() {
                outcome.rejected += 1;
                outcome.errors.push(RowError {
                    row_index: index,
                    work_order_nr: (!row.work_order_nr.trim().is_empty())
                        .then(|| row.work_order_nr.clone()),
                    errors,
                });
                continue;
            }
            let (Some(planned_start), Some(planned_end)) = (planned_start, planned_end) else {
                continue;
            };

            let quantity_total = row
                .quantity_total
                .as_ref()
                .map(|q| q.coerce())
                .unwrap_or(0);
            let final_quantity = row
                .final_quantity
                .as_ref()
                .map(|q| q.coerce())
                .unwrap_or(0);

            outcome.plans.push(PreprocessedPlan {
                work_order_nr: row.work_order_nr.clone(),
                article_nr: row.article_nr.clone(),
                product_code: row.article_nr.clone(),
                package_type: row.package_type.clone(),
                specification: row.specification.clone(),
                quantity_total,
                final_quantity,
                plan_quantity: quantity_total,
                maker_code: row.maker_code.clone(),
                feeder_code: row.feeder_code.clone(),
                machine_type: infer_machine_type(&row.maker_code),
                is_multi_machine: row.maker_code.contains(','),
                planned_start,
                planned_end,
            });
        }

        info!(
            "preprocessing: {} rows in, {} out, {} rejected, {} empty",
            rows.len(),
            outcome.plans.len(),
            outcome.rejected,
            outcome.dropped_empty
        );
        outcome
    }
}

/// Maker codes start with `C` or contain a digit; everything else is a
/// feeder code. Empty codes default to maker.
fn infer_machine_type(maker_code: &str) -> MachineType {
    if maker_code.is_empty() {
        return MachineType::Maker;
    }
    if maker_code.starts_with('C') || maker_code.chars().any(|c| c.is_ascii_digit()) {
        MachineType::Maker
    } else {
        MachineType::Feeder
    }
}
