//! Stage 5: parallel synchronisation — align the machines of one logical
//! work order.
//!
//! Orders are grouped by their source plan (the merged plan's work-order
//! number). In a group with several machines, every packer order is
//! assigned the common window `[min(packer starts), max(packer ends)]` so
//! the makers start and finish together. Feeder orders keep their own
//! windows: the feeder charges tobacco ahead of the makers, and the
//! splitter has already enforced feeder exclusivity. A feeder window that
//! runs past the aligned packer start is recorded as a residual conflict
//! rather than moved.
//!
//! Groups with no packer orders fall back to `[max(starts), max(ends)]`.

use chrono::NaiveDateTime;
use log::{debug, info, warn};
use std::collections::BTreeMap;

use crate::interval::TimeSlot;
use crate::order::{SyncGroup, WorkOrder, WorkOrderType};

/// Result of the synchronisation stage.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub orders: Vec<WorkOrder>,
    pub groups_synchronized: usize,
    pub machines_synchronized: usize,
    pub warnings: Vec<String>,
}

/// The synchronisation stage.
#[derive(Debug)]
pub struct Synchronizer {
    run_at: NaiveDateTime,
}

impl Synchronizer {
    /// `run_at` stamps generated sync-group ids.
    pub fn new(run_at: NaiveDateTime) -> Self {
        Self { run_at }
    }

    /// Synchronise all multi-machine groups.
    pub fn synchronize(&self, orders: Vec<WorkOrder>) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();

        let mut groups: BTreeMap<String, Vec<WorkOrder>> = BTreeMap::new();
        for order in orders {
            groups.entry(order.source_plan.clone()).or_default().push(order);
        }

        for (source_plan, group) in groups {
            if group.len() == 1 {
                let mut order = group.into_iter().next().expect("group of one");
                order.is_synchronized = false;
                outcome.orders.push(order);
                continue;
            }

            outcome.groups_synchronized += 1;
            outcome.machines_synchronized += group.len();
            self.synchronize_group(&source_plan, group, &mut outcome);
        }

        info!(
            "synchronisation: {} groups aligned, {} machines",
            outcome.groups_synchronized, outcome.machines_synchronized
        );
        outcome
    }

    fn synchronize_group(
        &self,
        source_plan: &str,
        group: Vec<WorkOrder>,
        outcome: &mut SyncOutcome,
    ) {
        let packer_windows: Vec<TimeSlot> = group
            .iter()
            .filter(|o| o.order_type == WorkOrderType::Packing)
            .map(WorkOrder::slot)
            .collect();

        let window = if packer_windows.is_empty() {
            // Feeders only: the latest start still ends after itself, so
            // the fallback window is always non-empty.
            let start = group.iter().map(|o| o.planned_start).max();
            let end = group.iter().map(|o| o.planned_end).max();
            match (start, end) {
                (Some(start), Some(end)) => TimeSlot::new(start, end),
                _ => return,
            }
        } else {
            let start = packer_windows.iter().map(|w| w.start).min();
            let end = packer_windows.iter().map(|w| w.end).max();
            match (start, end) {
                (Some(start), Some(end)) => TimeSlot::new(start, end),
                _ => return,
            }
        };
        let window = self.adjust_for_rotation(&group, window);

        let sync_group_id = format!(
            "SYNC_{source_plan}_{}",
            self.run_at.format("%Y%m%d%H%M%S")
        );
        debug!(
            "sync group {sync_group_id}: {} machines, window {} - {}",
            group.len(),
            window.start,
            window.end
        );

        let total = group.len() as u32;
        let feeders_only = packer_windows.is_empty();
        for (i, mut order) in group.into_iter().enumerate() {
            let assign_window = feeders_only || order.order_type == WorkOrderType::Packing;
            if assign_window && order.slot() != window {
                order.audit.original_start = Some(order.planned_start);
                order.audit.original_end = Some(order.planned_end);
                order.set_window(window.start, window.end);
            }
            if order.order_type == WorkOrderType::Feeding
                && !feeders_only
                && order.planned_end > window.start
            {
                let message = format!(
                    "feeder {} order {} ends at {} after synchronised packer start {}",
                    order.feeder_code, order.work_order_nr, order.planned_end, window.start
                );
                warn!("{message}");
                order.audit.residual_conflict = Some(message.clone());
                outcome.warnings.push(message);
            }

            order.is_synchronized = true;
            order.sync = Some(SyncGroup {
                sync_group_id: sync_group_id.clone(),
                sync_sequence: i as u32 + 1,
                total_sync_machines: total,
            });
            outcome.orders.push(order);
        }
    }

    /// Hook for rotating-maintenance patterns across the packer machines of
    /// a group. The maintenance table does not yet flag rotation, so the
    /// window passes through unchanged.
    fn adjust_for_rotation(&self, _group: &[WorkOrder], window: TimeSlot) -> TimeSlot {
        window
    }
}
