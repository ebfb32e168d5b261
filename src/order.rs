//! Work-order model shared by the split, time-correction, and
//! synchronisation stages.
//!
//! A [`WorkOrder`] is one machine's slice of a merged decade plan. It is a
//! single record that accumulates audit fields as it moves through the
//! pipeline; every adjustment a stage applies is visible on the order that
//! comes out the other end. Orders reference their merged plan through
//! [`WorkOrder::source_plan`] and their feeder order through
//! [`WorkOrder::input_plan_id`] -- identifiers, not pointers.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::interval::TimeSlot;

/// Whether an order runs on a maker (packing) or a feeder (feeding) machine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderType {
    Packing,
    Feeding,
}

/// Adjustment audit trail. Every field starts unset; stages flip the flags
/// they own and record enough context to reconstruct the original window.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuditTrail {
    /// Set by the splitter when feeder-exclusivity shifted the window.
    pub schedule_adjusted: bool,
    pub adjustment_reason: Option<String>,

    /// Set by speed-based duration recomputation.
    pub speed_adjusted: bool,
    pub original_planned_end: Option<NaiveDateTime>,
    pub speed_adjustment_hours: f64,
    pub effective_capacity: f64,
    pub production_hours: f64,

    /// Set by maintenance avoidance.
    pub maintenance_adjusted: bool,
    pub maintenance_adjustment_hours: f64,
    pub maintenance_conflicts_resolved: u32,

    /// Set by shift clamping.
    pub shift_adjusted: bool,
    pub duration_adjusted: bool,
    pub cross_shift_allowed: bool,

    /// Soft machine-relation check result, when the relation table is
    /// present and does not list the assigned pair.
    pub machine_relation_warning: Option<String>,

    /// Residual conflict left behind by the synchroniser (feeder window
    /// overlapping the aligned packer start).
    pub residual_conflict: Option<String>,

    /// Window before synchronisation, when the synchroniser moved it.
    pub original_start: Option<NaiveDateTime>,
    pub original_end: Option<NaiveDateTime>,
}

/// Synchronisation-group tags applied by the parallel synchroniser.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncGroup {
    /// `SYNC_<source plan>_<timestamp>`.
    pub sync_group_id: String,
    /// 1-based position within the group.
    pub sync_sequence: u32,
    pub total_sync_machines: u32,
}

/// One machine's work order, from the splitter onward.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkOrder {
    /// `PK<yyyymmdd><hhmmss><seq>` for packer orders,
    /// `FD<yyyymmdd><hhmmss><seq>` for feeder orders.
    pub work_order_nr: String,
    /// Work-order number of the merged plan this order was split from; the
    /// grouping key for synchronisation and MES generation.
    pub source_plan: String,
    pub order_type: WorkOrderType,
    pub article_nr: String,
    /// Exactly one maker code for packer orders; `None` for feeder orders.
    pub maker_code: Option<String>,
    pub feeder_code: String,
    pub quantity_total: i64,
    pub final_quantity: i64,
    pub planned_start: NaiveDateTime,
    pub planned_end: NaiveDateTime,

    /// 1-based split position among the plan's makers (packer orders).
    pub split_sequence: Option<u32>,
    /// Number of makers the plan was split across (packer orders).
    pub total_makers: Option<u32>,
    /// Work-order number of the feeder order feeding this packer order.
    pub input_plan_id: Option<String>,

    /// Sorted, de-duplicated maker codes fed by this order (feeder orders).
    pub associated_makers: Vec<String>,
    /// Output per hour of a feeder order, in pieces/hour.
    pub tobacco_consumption_rate: f64,
    /// Merged-plan numbers aggregated into this order (feeder orders).
    pub source_plans: Vec<String>,
    pub plan_count: usize,

    pub is_backup: bool,
    pub is_synchronized: bool,
    pub sync: Option<SyncGroup>,
    pub audit: AuditTrail,
}

impl WorkOrder {
    /// The machine this order is assigned to: the maker for packer orders,
    /// the feeder otherwise.
    pub fn machine_code(&self) -> &str {
        self.maker_code.as_deref().unwrap_or(&self.feeder_code)
    }

    /// The planned window as a closed-open slot.
    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.planned_start, self.planned_end)
    }

    /// Replace the planned window.
    pub fn set_window(&mut self, start: NaiveDateTime, end: NaiveDateTime) {
        self.planned_start = start;
        self.planned_end = end;
    }

    /// Planned duration in fractional hours.
    pub fn duration_hours(&self) -> f64 {
        (self.planned_end - self.planned_start).num_seconds() as f64 / 3600.0
    }
}
