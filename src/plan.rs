//! Plan-side data model: raw decade-plan rows and their derived forms.
//!
//! A *decade plan* is a ten-day production plan row extracted from the
//! operational spreadsheets by an external importer. Rows arrive loosely
//! typed (quantities may be numbers or digit strings, timestamps may be
//! native or ISO-8601 text), so [`PlanRow`] keeps the raw shape and the
//! preprocessor normalises it into [`PreprocessedPlan`]. The merger then
//! fuses compatible plans into [`MergedPlan`]s.
//!
//! All types here are owned value types; later pipeline stages reference
//! plans by `work_order_nr`, never by pointer.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Machine category inferred from the machine code during preprocessing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineType {
    /// Maker / packer machine (卷包机): forms and packages finished cigarettes.
    Maker,
    /// Feeder machine (喂丝机): supplies shredded tobacco upstream.
    Feeder,
}

/// A quantity field as it appears in a raw row: a count, a decimal, or a
/// digit string. Anything else coerces to zero.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawQuantity {
    Count(i64),
    Decimal(f64),
    Text(String),
}

impl RawQuantity {
    /// Coerce to a non-negative integer quantity. Non-numeric or negative
    /// values become `0`.
    pub fn coerce(&self) -> i64 {
        let value = match self {
            Self::Count(n) => *n,
            Self::Decimal(f) => *f as i64,
            Self::Text(s) => s.trim().parse::<i64>().unwrap_or(0),
        };
        value.max(0)
    }

    /// True when the field is blank or coerces to zero; used by the
    /// empty-row check.
    pub fn is_blank_or_zero(&self) -> bool {
        match self {
            Self::Text(s) if s.trim().is_empty() => true,
            other => other.coerce() == 0,
        }
    }
}

impl From<i64> for RawQuantity {
    fn from(value: i64) -> Self {
        Self::Count(value)
    }
}

/// A timestamp field as it appears in a raw row: either a native timestamp
/// or an ISO-8601-ish string (`2024-10-16T08:00:00`, `2024-10-16 08:00:00`,
/// or a bare date).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Native(NaiveDateTime),
    Text(String),
}

impl RawTimestamp {
    /// Resolve to a concrete plant-local timestamp, if parseable.
    pub fn resolve(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Native(dt) => Some(*dt),
            Self::Text(s) => {
                let s = s.trim().trim_end_matches('Z');
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
                    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
                    .ok()
                    .or_else(|| {
                        chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                            .ok()
                            .and_then(|d| d.and_hms_opt(0, 0, 0))
                    })
            }
        }
    }
}

impl From<NaiveDateTime> for RawTimestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self::Native(value)
    }
}

/// A raw decade-plan row as produced by the external importer.
///
/// Never mutated by the pipeline; the preprocessor produces a normalised
/// copy instead.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanRow {
    /// Production order number from the spreadsheet.
    pub work_order_nr: String,
    /// Finished-product article code (brand / specification pair).
    pub article_nr: String,
    #[serde(default)]
    pub package_type: Option<String>,
    #[serde(default)]
    pub specification: Option<String>,
    /// Input quantity in pieces-equivalent; loosely typed in the source data.
    #[serde(default)]
    pub quantity_total: Option<RawQuantity>,
    /// Finished quantity in boxes.
    #[serde(default)]
    pub final_quantity: Option<RawQuantity>,
    #[serde(default)]
    pub production_unit: Option<String>,
    /// Maker code; several codes may be packed into one cell separated by
    /// `,` or `;`.
    pub maker_code: String,
    /// Feeder code (single machine).
    pub feeder_code: String,
    #[serde(default)]
    pub planned_start: Option<RawTimestamp>,
    #[serde(default)]
    pub planned_end: Option<RawTimestamp>,
}

impl PlanRow {
    /// A row is empty iff order number, article, and total quantity are all
    /// simultaneously absent, blank, or zero.
    pub fn is_empty(&self) -> bool {
        self.work_order_nr.trim().is_empty()
            && self.article_nr.trim().is_empty()
            && self
                .quantity_total
                .as_ref()
                .is_none_or(RawQuantity::is_blank_or_zero)
    }
}

/// A [`PlanRow`] after cleanup, field mapping, and type coercion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PreprocessedPlan {
    pub work_order_nr: String,
    pub article_nr: String,
    /// Product code mapped from `article_nr`.
    pub product_code: String,
    pub package_type: Option<String>,
    pub specification: Option<String>,
    pub quantity_total: i64,
    pub final_quantity: i64,
    /// Normalised copy of `quantity_total`.
    pub plan_quantity: i64,
    pub maker_code: String,
    pub feeder_code: String,
    pub machine_type: MachineType,
    /// True when `maker_code` names more than one machine.
    pub is_multi_machine: bool,
    pub planned_start: NaiveDateTime,
    pub planned_end: NaiveDateTime,
}

impl PreprocessedPlan {
    /// `(year, month)` of the planned start; the merge equivalence key's
    /// time component.
    pub fn start_month(&self) -> (i32, u32) {
        use chrono::Datelike;
        (self.planned_start.year(), self.planned_start.month())
    }
}

/// A merged decade plan: either a single plan passed through or the fusion
/// of several equivalent plans.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MergedPlan {
    /// Original number for singletons; `M<yyyymmdd><seq>` for fusions.
    pub work_order_nr: String,
    pub article_nr: String,
    pub package_type: Option<String>,
    pub specification: Option<String>,
    pub quantity_total: i64,
    pub final_quantity: i64,
    pub maker_code: String,
    pub feeder_code: String,
    pub planned_start: NaiveDateTime,
    pub planned_end: NaiveDateTime,
    pub is_merged: bool,
    /// Work-order numbers of the fused plans; empty for singletons.
    pub merged_from: Vec<String>,
    pub merged_count: usize,
}

impl MergedPlan {
    /// Pass a single preprocessed plan through unchanged.
    pub fn from_plan(plan: PreprocessedPlan) -> Self {
        Self {
            work_order_nr: plan.work_order_nr,
            article_nr: plan.article_nr,
            package_type: plan.package_type,
            specification: plan.specification,
            quantity_total: plan.quantity_total,
            final_quantity: plan.final_quantity,
            maker_code: plan.maker_code,
            feeder_code: plan.feeder_code,
            planned_start: plan.planned_start,
            planned_end: plan.planned_end,
            is_merged: false,
            merged_from: Vec::new(),
            merged_count: 1,
        }
    }
}

/// A cross-month backup order emitted by the merger's backup branch.
///
/// Backup orders are surfaced to the caller alongside the schedule but are
/// never fed to the splitter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackupOrder {
    /// `B<yyyymmdd><4-digit seq>`.
    pub work_order_nr: String,
    pub article_nr: String,
    pub maker_code: String,
    pub feeder_code: String,
    pub quantity_total: i64,
    pub final_quantity: i64,
    pub planned_start: NaiveDateTime,
    pub planned_end: NaiveDateTime,
    pub backup_reason: String,
    pub backup_sequence: u32,
    /// Original numbers of the plans this backup covers.
    pub covers: Vec<String>,
}
