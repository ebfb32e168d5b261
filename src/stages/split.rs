//! Stage 3: splitting — decompose merged plans into per-machine work orders.
//!
//! Plans are partitioned by feeder. Within each feeder group, plans are
//! processed in start order against the feeder's booking list: a plan whose
//! window overlaps an existing booking is pushed to the latest conflicting
//! end, keeping its duration. Each group then yields one feeder order
//! aggregating the group, and each resolved plan yields one packer order
//! per maker code with the quantity divided evenly (remainder to the first
//! machine).
//!
//! When the machine-relation table is present, packer orders whose
//! `(feeder, maker)` pair is not listed are annotated with a warning but
//! still emitted.

use chrono::NaiveDateTime;
use log::{info, warn};
use std::collections::{BTreeMap, BTreeSet};

use crate::interval::{Booking, FeederSchedule, TimeSlot};
use crate::order::{AuditTrail, WorkOrder, WorkOrderType};
use crate::plan::MergedPlan;
use crate::reference::ReferenceSnapshot;

/// Result of the split stage.
#[derive(Debug, Default)]
pub struct SplitOutcome {
    pub packer_orders: Vec<WorkOrder>,
    pub feeder_orders: Vec<WorkOrder>,
    pub warnings: Vec<String>,
    /// Plans whose window was shifted to resolve a feeder conflict.
    pub conflicts_resolved: usize,
    /// Number of feeder groups processed.
    pub feeder_groups: usize,
}

impl SplitOutcome {
    /// All orders, packers first, as the next stage consumes them.
    pub fn into_orders(self) -> Vec<WorkOrder> {
        let mut orders = self.packer_orders;
        orders.extend(self.feeder_orders);
        orders
    }
}

/// The split stage. The work-order sequence counter resets per instance.
#[derive(Debug)]
pub struct Splitter {
    run_at: NaiveDateTime,
    seq: u32,
}

impl Splitter {
    /// `run_at` stamps generated `PK`/`FD` work-order numbers.
    pub fn new(run_at: NaiveDateTime) -> Self {
        Self { run_at, seq: 1 }
    }

    /// Split merged plans into feeder and packer orders.
    pub fn split(&mut self, plans: Vec<MergedPlan>, reference: &ReferenceSnapshot) -> SplitOutcome {
        let mut outcome = SplitOutcome::default();

        // Partition by feeder; BTreeMap keeps group order deterministic.
        let mut groups: BTreeMap<String, Vec<MergedPlan>> = BTreeMap::new();
        for plan in plans {
            if plan.feeder_code.trim().is_empty() {
                warn!("plan {} has no feeder code, skipped", plan.work_order_nr);
                outcome
                    .warnings
                    .push(format!("plan {} has no feeder code", plan.work_order_nr));
                continue;
            }
            groups.entry(plan.feeder_code.trim().to_string()).or_default().push(plan);
        }
        outcome.feeder_groups = groups.len();

        for (feeder_code, group) in groups {
            let resolved = self.resolve_feeder_conflicts(&feeder_code, group, &mut outcome);
            let feeder_order = self.feeder_order(&feeder_code, &resolved, &mut outcome);

            for plan in &resolved {
                self.packer_orders(plan, &feeder_order, reference, &mut outcome);
            }
            outcome.feeder_orders.push(feeder_order);
        }

        info!(
            "split: {} feeder groups -> {} packer orders + {} feeder orders, {} conflicts resolved",
            outcome.feeder_groups,
            outcome.packer_orders.len(),
            outcome.feeder_orders.len(),
            outcome.conflicts_resolved
        );
        outcome
    }

    /// Book each plan of a feeder group, pushing conflicting windows past
    /// the latest conflicting end.
    fn resolve_feeder_conflicts(
        &mut self,
        feeder_code: &str,
        mut group: Vec<MergedPlan>,
        outcome: &mut SplitOutcome,
    ) -> Vec<ResolvedPlan> {
        group.sort_by_key(|p| p.planned_start);

        let mut schedule = FeederSchedule::new();
        let mut resolved = Vec::with_capacity(group.len());

        for plan in group {
            let mut slot = TimeSlot::new(plan.planned_start, plan.planned_end);
            let mut adjusted = false;

            if let Some(latest_end) = schedule.latest_conflicting_end(&slot) {
                let duration = slot.duration();
                slot = TimeSlot::new(latest_end, latest_end + duration);
                adjusted = true;
                outcome.conflicts_resolved += 1;
                info!(
                    "feeder {feeder_code} conflict: plan {} moved to {}",
                    plan.work_order_nr, slot.start
                );
            }

            schedule.book(Booking {
                slot,
                work_order_nr: plan.work_order_nr.clone(),
                maker_code: plan.maker_code.clone(),
                article_nr: plan.article_nr.clone(),
            });
            resolved.push(ResolvedPlan {
                plan,
                slot,
                adjusted,
            });
        }

        resolved
    }

    /// One feeder order aggregating every resolved plan in the group.
    fn feeder_order(
        &mut self,
        feeder_code: &str,
        resolved: &[ResolvedPlan],
        outcome: &mut SplitOutcome,
    ) -> WorkOrder {
        let articles: BTreeSet<&str> = resolved
            .iter()
            .map(|r| r.plan.article_nr.trim())
            .filter(|a| !a.is_empty())
            .collect();
        if articles.len() > 1 {
            warn!(
                "feeder {feeder_code} carries {} distinct products",
                articles.len()
            );
            outcome.warnings.push(format!(
                "feeder {feeder_code} carries multiple products: {}",
                articles.iter().copied().collect::<Vec<_>>().join(", ")
            ));
        }

        let quantity_total: i64 = resolved.iter().map(|r| r.plan.quantity_total).sum();
        let final_quantity: i64 = resolved.iter().map(|r| r.plan.final_quantity).sum();
        let total_hours: f64 = resolved
            .iter()
            .map(|r| r.slot.duration().num_seconds() as f64 / 3600.0)
            .sum();
        let consumption_rate = if total_hours > 0.0 {
            (quantity_total as f64 / total_hours * 100.0).round() / 100.0
        } else {
            0.0
        };

        let associated_makers: BTreeSet<String> = resolved
            .iter()
            .flat_map(|r| extract_maker_codes(&r.plan.maker_code))
            .collect();

        let start = resolved.iter().map(|r| r.slot.start).min();
        let end = resolved.iter().map(|r| r.slot.end).max();
        let first = &resolved[0].plan;

        WorkOrder {
            work_order_nr: self.next_order_nr("FD"),
            source_plan: first.work_order_nr.clone(),
            order_type: WorkOrderType::Feeding,
            article_nr: first.article_nr.clone(),
            maker_code: None,
            feeder_code: feeder_code.to_string(),
            quantity_total,
            final_quantity,
            planned_start: start.unwrap_or(first.planned_start),
            planned_end: end.unwrap_or(first.planned_end),
            split_sequence: None,
            total_makers: None,
            input_plan_id: None,
            associated_makers: associated_makers.into_iter().collect(),
            tobacco_consumption_rate: consumption_rate,
            source_plans: resolved
                .iter()
                .map(|r| r.plan.work_order_nr.clone())
                .collect(),
            plan_count: resolved.len(),
            is_backup: false,
            is_synchronized: false,
            sync: None,
            audit: AuditTrail::default(),
        }
    }

    /// One packer order per maker code of a resolved plan.
    fn packer_orders(
        &mut self,
        resolved: &ResolvedPlan,
        feeder_order: &WorkOrder,
        reference: &ReferenceSnapshot,
        outcome: &mut SplitOutcome,
    ) {
        let plan = &resolved.plan;
        let makers = extract_maker_codes(&plan.maker_code);
        if makers.is_empty() {
            warn!("plan {} has no maker code", plan.work_order_nr);
            outcome
                .warnings
                .push(format!("plan {} has no maker code", plan.work_order_nr));
            return;
        }

        let k = makers.len() as i64;
        let quantity_each = plan.quantity_total / k;
        let quantity_rem = plan.quantity_total % k;
        let final_each = plan.final_quantity / k;
        let final_rem = plan.final_quantity % k;

        for (i, maker) in makers.iter().enumerate() {
            let mut audit = AuditTrail {
                schedule_adjusted: resolved.adjusted,
                ..AuditTrail::default()
            };
            if resolved.adjusted {
                audit.adjustment_reason =
                    Some(format!("feeder {} resource conflict", feeder_order.feeder_code));
            }
            if reference.has_relations() && !reference.relation_exists(&feeder_order.feeder_code, maker)
            {
                let message = if reference.is_known_feeder(&feeder_order.feeder_code) {
                    format!(
                        "feeder {} is not configured to feed maker {maker}",
                        feeder_order.feeder_code
                    )
                } else {
                    format!("feeder {} has no relation entries", feeder_order.feeder_code)
                };
                warn!("{message}");
                outcome.warnings.push(message.clone());
                audit.machine_relation_warning = Some(message);
            }

            outcome.packer_orders.push(WorkOrder {
                work_order_nr: self.next_order_nr("PK"),
                source_plan: plan.work_order_nr.clone(),
                order_type: WorkOrderType::Packing,
                article_nr: plan.article_nr.clone(),
                maker_code: Some(maker.clone()),
                feeder_code: feeder_order.feeder_code.clone(),
                quantity_total: quantity_each + if i == 0 { quantity_rem } else { 0 },
                final_quantity: final_each + if i == 0 { final_rem } else { 0 },
                planned_start: resolved.slot.start,
                planned_end: resolved.slot.end,
                split_sequence: Some(i as u32 + 1),
                total_makers: Some(makers.len() as u32),
                input_plan_id: Some(feeder_order.work_order_nr.clone()),
                associated_makers: Vec::new(),
                tobacco_consumption_rate: 0.0,
                source_plans: Vec::new(),
                plan_count: 0,
                is_backup: false,
                is_synchronized: false,
                sync: None,
                audit,
            });
        }
    }

    fn next_order_nr(&mut self, prefix: &str) -> String {
        let nr = format!(
            "{prefix}{}{:04}",
            self.run_at.format("%Y%m%d%H%M%S"),
            self.seq
        );
        self.seq += 1;
        nr
    }
}

/// A plan with its conflict-resolved window.
#[derive(Debug)]
struct ResolvedPlan {
    plan: MergedPlan,
    slot: TimeSlot,
    adjusted: bool,
}

/// Split a maker-code cell into individual codes; `,` and `;` both separate.
pub fn extract_maker_codes(maker_code: &str) -> Vec<String> {
    maker_code
        .split([',', ';'])
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}
