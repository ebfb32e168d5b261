//! MES wire model: the records the pipeline ultimately emits.
//!
//! The downstream MES consumes two order families, distinguished by the
//! `plan_id` prefix:
//!
//! - **HWS** (feeder): one per feeder machine, quantity left unset, unit
//!   `公斤`.
//! - **HJB** (packer): one per maker machine, quantity in finished boxes,
//!   unit `箱`, linked to its upstream HWS order through [`InputBatch`].
//!
//! Timestamps on the wire are strings in the MES convention
//! (`yyyy/MM/dd HH:mm:ss` and `yyyy/MM/dd`); the typed window is kept on
//! the record as well so callers can verify invariants without re-parsing.
//! A [`ScheduleSummary`] row accompanies the orders for gantt rendering.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Unit for feeder (HWS) orders: kilograms of shredded tobacco.
pub const UNIT_FEEDING: &str = "公斤";
/// Unit for packer (HJB) orders: boxes of finished product.
pub const UNIT_PACKING: &str = "箱";

/// MES timestamp convention.
pub fn format_wire_datetime(dt: NaiveDateTime) -> String {
    dt.format("%Y/%m/%d %H:%M:%S").to_string()
}

/// MES date convention.
pub fn format_wire_date(dt: NaiveDateTime) -> String {
    dt.format("%Y/%m/%d").to_string()
}

/// How the emitted record was produced.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MesOrderKind {
    Feeding,
    Packing,
    /// Emitted with a random id suffix because the sequence service failed.
    Fallback,
}

/// Upstream-batch carrier on an HJB order, referencing the HWS order that
/// feeds it. Most fields are nullable on the wire and stay unset here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputBatch {
    /// `plan_id` of the upstream HWS order.
    pub input_plan_id: String,
    pub input_batch_code: Option<String>,
    pub quantity: Option<i64>,
    pub batch_sequence: Option<i32>,
    pub is_whole_batch: Option<bool>,
    pub is_main_channel: bool,
    pub is_deleted: bool,
    pub is_last_one: Option<bool>,
    /// Input material: the finished-product article code.
    pub material_code: String,
    pub bom_revision: Option<String>,
}

impl InputBatch {
    /// Link to an HWS order on the main channel.
    pub fn linking(input_plan_id: impl Into<String>, material_code: impl Into<String>) -> Self {
        Self {
            input_plan_id: input_plan_id.into(),
            input_batch_code: None,
            quantity: None,
            batch_sequence: None,
            is_whole_batch: None,
            is_main_channel: true,
            is_deleted: false,
            is_last_one: None,
            material_code: material_code.into(),
            bom_revision: None,
        }
    }
}

/// One MES work order in wire shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MesOrder {
    /// `H(WS|JB)` + 9-digit sequence.
    pub plan_id: String,
    /// Machine code: the feeder for HWS, the maker for HJB.
    pub production_line: String,
    pub batch_code: Option<String>,
    /// Finished-product article code.
    pub material_code: String,
    pub bom_revision: Option<String>,
    /// Finished boxes for HJB; unset for HWS.
    pub quantity: Option<i64>,
    /// `yyyy/MM/dd HH:mm:ss`.
    pub plan_start_time: String,
    /// `yyyy/MM/dd HH:mm:ss`.
    pub plan_end_time: String,
    pub sequence: u32,
    /// `yyyy/MM/dd`.
    pub plan_date: String,
    pub unit: String,
    pub is_backup: bool,
    pub input_batch: Option<InputBatch>,
    pub order_type: MesOrderKind,

    // Internal linkage, not part of the MES interface proper.
    pub original_work_order_nr: String,
    pub planned_start: NaiveDateTime,
    pub planned_end: NaiveDateTime,
}

impl MesOrder {
    pub fn is_feeding(&self) -> bool {
        self.plan_id.starts_with("HWS")
    }

    pub fn is_packing(&self) -> bool {
        self.plan_id.starts_with("HJB")
    }
}

/// Per-(maker, feeder) gantt rollup persisted alongside the MES orders.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleSummary {
    /// The merged plan's work-order number.
    pub work_order_nr: String,
    pub article_nr: String,
    pub final_quantity: i64,
    pub quantity_total: i64,
    pub maker_code: String,
    pub feeder_code: String,
    pub planned_start: NaiveDateTime,
    pub planned_end: NaiveDateTime,
    pub task_id: String,
    pub schedule_status: String,
    pub sync_group_id: Option<String>,
    pub is_backup: bool,
}
