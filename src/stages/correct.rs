//! Stage 4: time correction — speed, maintenance, and shift adjustments.
//!
//! Three sub-steps run per order, each skipped when its reference data is
//! missing:
//!
//! 1. **Speed recomputation** — recompute the duration from the machine's
//!    effective capacity (`speed × efficiency`) plus setup and changeover
//!    time; rewrite the end only when the difference exceeds the configured
//!    tolerance.
//! 2. **Maintenance avoidance** — walk the machine's active maintenance
//!    windows in calendar order. Major and overhaul windows always push the
//!    order past their end; routine windows permit compressing the order to
//!    end at the window start when at least two hours of work fit before it.
//!    A shift may surface a new conflict, which the same pass picks up.
//! 3. **Shift clamping** — move starts outside any shift to the next shift
//!    start; clamp ends to the shift end unless the order is longer than
//!    the cross-shift threshold.
//!
//! Every applied adjustment is recorded on the order's audit trail. A
//! single order never fails the stage.

use chrono::TimeDelta;
use log::{debug, info, warn};

use crate::calendar::ShiftCalendar;
use crate::config::SchedulerConfig;
use crate::order::WorkOrder;
use crate::reference::ReferenceSnapshot;

/// Correction counters, reported as the stage's custom metrics.
#[derive(Debug, Default, Clone)]
pub struct CorrectionOutcome {
    pub speed_adjusted: usize,
    pub maintenance_adjusted: usize,
    pub shift_adjusted: usize,
    pub total_adjusted: usize,
}

/// The time-correction stage. Holds the per-run reference snapshot and
/// config; correcting a single order borrows them immutably, so orders can
/// be corrected in parallel.
pub struct TimeCorrector<'a> {
    reference: &'a ReferenceSnapshot,
    config: &'a SchedulerConfig,
    calendar: Option<ShiftCalendar>,
}

impl<'a> TimeCorrector<'a> {
    pub fn new(reference: &'a ReferenceSnapshot, config: &'a SchedulerConfig) -> Self {
        let calendar = match ShiftCalendar::from_shifts(reference.shifts()) {
            Ok(calendar) => calendar,
            Err(err) => {
                warn!("shift configuration unparseable, shift clamping skipped: {err:#}");
                None
            }
        };
        Self {
            reference,
            config,
            calendar,
        }
    }

    /// Correct a batch sequentially. The parallel execution path in the
    /// orchestrator maps [`Self::correct_order`] instead.
    pub fn correct_all(&self, orders: Vec<WorkOrder>) -> (Vec<WorkOrder>, CorrectionOutcome) {
        let corrected: Vec<WorkOrder> = orders
            .into_iter()
            .map(|order| self.correct_order(order))
            .collect();
        let outcome = Self::tally(&corrected);
        info!(
            "time correction: {} speed, {} maintenance, {} shift adjustments over {} orders",
            outcome.speed_adjusted,
            outcome.maintenance_adjusted,
            outcome.shift_adjusted,
            corrected.len()
        );
        (corrected, outcome)
    }

    /// Derive the stage counters from the orders' audit flags.
    pub fn tally(orders: &[WorkOrder]) -> CorrectionOutcome {
        let mut outcome = CorrectionOutcome::default();
        for order in orders {
            if order.audit.speed_adjusted {
                outcome.speed_adjusted += 1;
            }
            if order.audit.maintenance_adjusted {
                outcome.maintenance_adjusted += 1;
            }
            if order.audit.shift_adjusted {
                outcome.shift_adjusted += 1;
            }
            if order.audit.speed_adjusted
                || order.audit.maintenance_adjusted
                || order.audit.shift_adjusted
            {
                outcome.total_adjusted += 1;
            }
        }
        outcome
    }

    /// Apply all three sub-steps to one order.
    pub fn correct_order(&self, mut order: WorkOrder) -> WorkOrder {
        self.correct_speed(&mut order);
        self.avoid_maintenance(&mut order);
        self.clamp_to_shifts(&mut order);
        order
    }

    /// §1: speed-based duration recomputation.
    fn correct_speed(&self, order: &mut WorkOrder) {
        let machine = order.machine_code().to_string();
        if machine.is_empty() || order.article_nr.is_empty() || order.final_quantity <= 0 {
            return;
        }
        let Some(speed) = self.reference.speed_for(&machine, &order.article_nr) else {
            debug!("no speed entry for {machine}/{}", order.article_nr);
            return;
        };

        let effective_capacity = speed.speed * speed.efficiency_fraction();
        if effective_capacity <= 0.0 {
            warn!("machine {machine} has zero effective capacity, speed step skipped");
            return;
        }

        let production_hours = order.final_quantity as f64 / effective_capacity;
        let setup_minutes = speed
            .setup_minutes
            .unwrap_or(self.config.setup_minutes_default)
            + speed
                .changeover_minutes
                .unwrap_or(self.config.changeover_minutes_default);
        let calculated_end = order.planned_start
            + TimeDelta::seconds((production_hours * 3600.0).round() as i64)
            + TimeDelta::minutes(setup_minutes);

        let diff = (calculated_end - order.planned_end).num_seconds().abs();
        if diff > self.config.speed_tolerance_minutes * 60 {
            debug!(
                "speed adjustment for {}: end {} -> {calculated_end} ({effective_capacity:.1}/h)",
                order.work_order_nr, order.planned_end
            );
            order.audit.speed_adjusted = true;
            order.audit.original_planned_end = Some(order.planned_end);
            order.audit.speed_adjustment_hours =
                (calculated_end - order.planned_end).num_seconds() as f64 / 3600.0;
            order.audit.effective_capacity = effective_capacity;
            order.audit.production_hours = production_hours;
            order.planned_end = calculated_end;
        }
    }

    /// §2: maintenance avoidance.
    fn avoid_maintenance(&self, order: &mut WorkOrder) {
        let machine = order.machine_code().to_string();
        let windows: Vec<_> = self
            .reference
            .maintenance_for(&machine)
            .into_iter()
            .filter(|m| m.plan_status.is_active())
            .collect();
        if windows.is_empty() {
            return;
        }

        let original_start = order.planned_start;
        let mut start = order.planned_start;
        let mut end = order.planned_end;
        let mut conflicts = 0u32;

        // Calendar order; a shift only ever moves the window later, so
        // re-checking the remaining windows covers conflicts the shift
        // created.
        for window in &windows {
            let overlaps = start < window.maint_end_time && window.maint_start_time < end;
            if !overlaps {
                continue;
            }
            conflicts += 1;
            let duration = end - start;

            if window.maintenance_type.is_blocking() {
                start = window.maint_end_time;
                end = start + duration;
                debug!(
                    "{}: {:?} maintenance on {machine}, shifted to {start}",
                    order.work_order_nr, window.maintenance_type
                );
            } else if start < window.maint_start_time
                && window.maint_start_time - start >= TimeDelta::hours(2)
            {
                // Enough work fits before a routine window: truncate.
                end = window.maint_start_time;
                debug!(
                    "{}: compressed to end at routine maintenance start {end}",
                    order.work_order_nr
                );
            } else {
                start = window.maint_end_time;
                end = start + duration;
                debug!("{}: shifted past maintenance to {start}", order.work_order_nr);
            }
        }

        if conflicts > 0 {
            order.audit.maintenance_adjusted = true;
            order.audit.maintenance_conflicts_resolved = conflicts;
            order.audit.maintenance_adjustment_hours =
                (start - original_start).num_seconds() as f64 / 3600.0;
            order.set_window(start, end);
        }
    }

    /// §3: shift clamping.
    fn clamp_to_shifts(&self, order: &mut WorkOrder) {
        let Some(calendar) = &self.calendar else {
            return;
        };

        let mut start = order.planned_start;
        let mut end = order.planned_end;
        let mut adjusted = false;

        if calendar.shift_containing(start).is_none() {
            let next_start = calendar.next_shift_start(start);
            let duration = end - start;
            start = next_start;
            end = next_start + duration;
            adjusted = true;
            debug!(
                "{}: start outside shifts, moved to {start}",
                order.work_order_nr
            );
        }

        if let Some(span) = calendar.shift_containing(start) {
            let shift_end = calendar.shift_end_at(start, span);
            if end > shift_end {
                let duration_hours = (end - start).num_seconds() as f64 / 3600.0;
                if duration_hours > self.config.shift_clamp_max_hours {
                    order.audit.cross_shift_allowed = true;
                    debug!(
                        "{}: {duration_hours:.1}h run allowed to span shifts",
                        order.work_order_nr
                    );
                } else {
                    end = shift_end;
                    order.audit.duration_adjusted = true;
                    adjusted = true;
                    debug!(
                        "{}: end clamped to {} shift end {end}",
                        order.work_order_nr, span.name
                    );
                }
            }
        }

        if adjusted {
            order.audit.shift_adjusted = true;
            order.set_window(start, end);
        }
    }
}
