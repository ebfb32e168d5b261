//! Row validation and error collection.
//!
//! Bad input rows never abort a run: the preprocessor records a
//! [`RowError`] per rejected row and keeps going, and callers can run the
//! same checks up front with [`validate_rows`] before committing to a full
//! pipeline execution.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::plan::PlanRow;

/// A single validation error with context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// The field that failed validation (optional)
    pub field: Option<String>,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error with just a message.
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    /// Create a validation error for a specific field.
    pub fn field<S: Into<String>, M: Into<String>>(field: S, message: M) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref field) = self.field {
            write!(f, "[{}] {}", field, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// A rejected row with the errors that rejected it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    /// Zero-based index of the row in the input batch.
    pub row_index: usize,
    /// Work-order number when the row carried one.
    pub work_order_nr: Option<String>,
    pub errors: Vec<ValidationError>,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        match &self.work_order_nr {
            Some(nr) => write!(f, "row {} ({nr}): {joined}", self.row_index),
            None => write!(f, "row {}: {joined}", self.row_index),
        }
    }
}

/// Pre-flight validation summary for a batch of rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowValidationReport {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub errors: Vec<RowError>,
}

impl RowValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Export the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Check the fields every pipeline run requires, without running anything.
///
/// Empty rows (per the preprocessor's definition) are not counted as
/// errors; the preprocessor drops them silently anyway.
pub fn validate_rows(rows: &[PlanRow]) -> RowValidationReport {
    let mut report = RowValidationReport {
        total_rows: rows.len(),
        ..RowValidationReport::default()
    };

    for (index, row) in rows.iter().enumerate() {
        if row.is_empty() {
            report.valid_rows += 1;
            continue;
        }
        let mut errors = Vec::new();
        if row.work_order_nr.trim().is_empty() {
            errors.push(ValidationError::field("work_order_nr", "must not be blank"));
        }
        if row.article_nr.trim().is_empty() {
            errors.push(ValidationError::field("article_nr", "must not be blank"));
        }
        if row.quantity_total.is_none() {
            errors.push(ValidationError::field("quantity_total", "missing"));
        }
        if errors.is_empty() {
            report.valid_rows += 1;
        } else {
            report.errors.push(RowError {
                row_index: index,
                work_order_nr: (!row.work_order_nr.trim().is_empty())
                    .then(|| row.work_order_nr.clone()),
                errors,
            });
        }
    }

    report
}
