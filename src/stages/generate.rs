//! Stage 6: work-order generation — materialise MES records.
//!
//! Synchronised orders are grouped by source plan. Each group emits one
//! HWS record per distinct feeder and one HJB record per distinct maker;
//! every HJB is linked to the HWS of the feeder assigned to it by the
//! splitter (falling back to the group's first HWS when that linkage is
//! missing). Groups containing packer orders additionally emit one
//! schedule summary per (maker, feeder) pair for gantt rendering.
//!
//! Identifier allocation goes through the [`SequencePort`]. When the
//! sequence service fails, the record is still emitted with a pseudo-random
//! 9-digit suffix and flagged `FALLBACK`; duplicate fallback ids are
//! tolerated in recovery scenarios and surfaced as warnings.

use chrono::NaiveDateTime;
use log::{info, warn};
use std::collections::BTreeMap;

use crate::mes::{
    InputBatch, MesOrder, MesOrderKind, ScheduleSummary, UNIT_FEEDING, UNIT_PACKING,
    format_wire_date, format_wire_datetime,
};
use crate::order::{WorkOrder, WorkOrderType};
use crate::sequence::{SequenceKind, SequencePort, format_plan_id};
use crate::stages::split::extract_maker_codes;

/// Result of the generation stage.
#[derive(Debug, Default)]
pub struct GenerateOutcome {
    pub mes_orders: Vec<MesOrder>,
    pub schedule_summaries: Vec<ScheduleSummary>,
    pub warnings: Vec<String>,
    /// Records emitted with a fallback id.
    pub fallback_count: usize,
}

/// The generation stage.
pub struct Generator<'a> {
    sequence: &'a dyn SequencePort,
    task_id: &'a str,
    fallback_seed: u64,
}

impl<'a> Generator<'a> {
    pub fn new(sequence: &'a dyn SequencePort, task_id: &'a str, run_at: NaiveDateTime) -> Self {
        Self {
            sequence,
            task_id,
            fallback_seed: run_at.and_utc().timestamp() as u64,
        }
    }

    /// Emit MES orders and schedule summaries for all groups.
    pub fn generate(&mut self, orders: &[WorkOrder]) -> GenerateOutcome {
        let mut outcome = GenerateOutcome::default();

        let mut groups: BTreeMap<&str, Vec<&WorkOrder>> = BTreeMap::new();
        for order in orders {
            groups.entry(order.source_plan.as_str()).or_default().push(order);
        }

        for (source_plan, group) in groups {
            self.generate_group(source_plan, &group, &mut outcome);
        }

        // Upstream class ordering follows input order; sorting by plan id
        // keeps the final output reproducible.
        outcome.mes_orders.sort_by(|a, b| a.plan_id.cmp(&b.plan_id));
        outcome.schedule_summaries.sort_by(|a, b| {
            (&a.work_order_nr, &a.maker_code, &a.feeder_code)
                .cmp(&(&b.work_order_nr, &b.maker_code, &b.feeder_code))
        });

        let feeding = outcome.mes_orders.iter().filter(|o| o.is_feeding()).count();
        let packing = outcome.mes_orders.iter().filter(|o| o.is_packing()).count();
        info!(
            "generation: {feeding} HWS + {packing} HJB orders, {} summaries, {} fallbacks",
            outcome.schedule_summaries.len(),
            outcome.fallback_count
        );
        outcome
    }

    fn generate_group(
        &mut self,
        source_plan: &str,
        group: &[&WorkOrder],
        outcome: &mut GenerateOutcome,
    ) {
        let feeder_orders: Vec<&&WorkOrder> = group
            .iter()
            .filter(|o| o.order_type == WorkOrderType::Feeding)
            .collect();

        // Distinct feeders: from feeder orders when the splitter ran,
        // otherwise from the feeder codes carried on the packer orders.
        let mut feeders: BTreeMap<String, Option<&WorkOrder>> = BTreeMap::new();
        for order in &feeder_orders {
            feeders.insert(order.feeder_code.clone(), Some(**order));
        }
        for order in group {
            let code = order.feeder_code.trim();
            if !code.is_empty() {
                feeders.entry(code.to_string()).or_insert(None);
            }
        }

        // Distinct makers; multi-machine codes on pass-through orders are
        // decomposed here.
        let mut makers: BTreeMap<String, &WorkOrder> = BTreeMap::new();
        for order in group {
            if let Some(maker_code) = &order.maker_code {
                for code in extract_maker_codes(maker_code) {
                    makers.entry(code).or_insert(*order);
                }
            }
        }

        // One HWS per distinct feeder.
        let mut hws_by_feeder_order: BTreeMap<String, String> = BTreeMap::new();
        let mut first_hws: Option<String> = None;
        for (feeder_code, feeder_order) in &feeders {
            let (plan_id, fallback) = self.allocate(SequenceKind::Hws, outcome);
            let (window_start, window_end, article, is_backup) = match feeder_order {
                Some(order) => (
                    order.planned_start,
                    order.planned_end,
                    order.article_nr.clone(),
                    order.is_backup,
                ),
                None => {
                    let (start, end, article, _, is_backup) = group_window(group);
                    (start, end, article, is_backup)
                }
            };

            if first_hws.is_none() {
                first_hws = Some(plan_id.clone());
            }
            if let Some(order) = feeder_order {
                hws_by_feeder_order.insert(order.work_order_nr.clone(), plan_id.clone());
            }

            outcome.mes_orders.push(MesOrder {
                plan_id,
                production_line: feeder_code.clone(),
                batch_code: None,
                material_code: article,
                bom_revision: None,
                quantity: None,
                plan_start_time: format_wire_datetime(window_start),
                plan_end_time: format_wire_datetime(window_end),
                sequence: 1,
                plan_date: format_wire_date(window_start),
                unit: UNIT_FEEDING.to_string(),
                is_backup,
                input_batch: None,
                order_type: if fallback {
                    MesOrderKind::Fallback
                } else {
                    MesOrderKind::Feeding
                },
                original_work_order_nr: source_plan.to_string(),
                planned_start: window_start,
                planned_end: window_end,
            });
        }

        // One HJB per distinct maker, linked to its feeder's HWS.
        for (maker_code, order) in &makers {
            let (plan_id, fallback) = self.allocate(SequenceKind::Hjb, outcome);
            let linked_hws = order
                .input_plan_id
                .as_ref()
                .and_then(|feeder_nr| hws_by_feeder_order.get(feeder_nr))
                .or(first_hws.as_ref());

            outcome.mes_orders.push(MesOrder {
                plan_id,
                production_line: maker_code.clone(),
                batch_code: None,
                material_code: order.article_nr.clone(),
                bom_revision: None,
                quantity: Some(order.final_quantity),
                plan_start_time: format_wire_datetime(order.planned_start),
                plan_end_time: format_wire_datetime(order.planned_end),
                sequence: 1,
                plan_date: format_wire_date(order.planned_start),
                unit: UNIT_PACKING.to_string(),
                is_backup: order.is_backup,
                input_batch: linked_hws
                    .map(|hws| InputBatch::linking(hws.clone(), order.article_nr.clone())),
                order_type: if fallback {
                    MesOrderKind::Fallback
                } else {
                    MesOrderKind::Packing
                },
                original_work_order_nr: source_plan.to_string(),
                planned_start: order.planned_start,
                planned_end: order.planned_end,
            });
        }

        // Schedule summaries for packer groups: the cartesian product of
        // the group's makers and feeders.
        let has_packers = group
            .iter()
            .any(|o| o.order_type == WorkOrderType::Packing);
        if has_packers && !makers.is_empty() {
            let packer_orders: Vec<&&WorkOrder> = group
                .iter()
                .filter(|o| o.order_type == WorkOrderType::Packing)
                .collect();
            let final_quantity: i64 = packer_orders.iter().map(|o| o.final_quantity).sum();
            let quantity_total: i64 = packer_orders.iter().map(|o| o.quantity_total).sum();
            let (window_start, window_end, article, _, is_backup) = group_window(group);
            let sync_group_id = group
                .iter()
                .find_map(|o| o.sync.as_ref().map(|s| s.sync_group_id.clone()));

            for maker_code in makers.keys() {
                for feeder_code in feeders.keys() {
                    outcome.schedule_summaries.push(ScheduleSummary {
                        work_order_nr: source_plan.to_string(),
                        article_nr: article.clone(),
                        final_quantity,
                        quantity_total,
                        maker_code: maker_code.clone(),
                        feeder_code: feeder_code.clone(),
                        planned_start: window_start,
                        planned_end: window_end,
                        task_id: self.task_id.to_string(),
                        schedule_status: "COMPLETED".to_string(),
                        sync_group_id: sync_group_id.clone(),
                        is_backup,
                    });
                }
            }
        }
    }

    /// Next plan id of the given kind, plus whether the fallback path was
    /// taken because the sequence service failed.
    fn allocate(&mut self, kind: SequenceKind, outcome: &mut GenerateOutcome) -> (String, bool) {
        match self.sequence.next(kind) {
            Ok(sequence) => (format_plan_id(kind, sequence), false),
            Err(err) => {
                let suffix = self.next_fallback_suffix();
                let plan_id = format_plan_id(kind, suffix);
                warn!("sequence allocation failed ({err:#}), fallback id {plan_id}");
                outcome.fallback_count += 1;
                outcome
                    .warnings
                    .push(format!("sequence allocation failed, fallback id {plan_id}"));
                (plan_id, true)
            }
        }
    }

    /// Deterministic LCG over the run clock; collisions are acceptable in
    /// the recovery path and surfaced to the caller.
    fn next_fallback_suffix(&mut self) -> u64 {
        self.fallback_seed = self
            .fallback_seed
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.fallback_seed >> 33) % 1_000_000_000
    }
}

/// Widest window, first article, summed quantity, and backup flag of a
/// group.
fn group_window(group: &[&WorkOrder]) -> (NaiveDateTime, NaiveDateTime, String, i64, bool) {
    let start = group
        .iter()
        .map(|o| o.planned_start)
        .min()
        .expect("groups are never empty");
    let end = group
        .iter()
        .map(|o| o.planned_end)
        .max()
        .expect("groups are never empty");
    let article = group
        .iter()
        .map(|o| o.article_nr.clone())
        .next()
        .unwrap_or_default();
    let final_quantity = group.iter().map(|o| o.final_quantity).sum();
    let is_backup = group.iter().any(|o| o.is_backup);
    (start, end, article, final_quantity, is_backup)
}
