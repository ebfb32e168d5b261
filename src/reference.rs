//! Read-only reference data consumed by the pipeline.
//!
//! Four tables drive time correction and the splitter's soft checks:
//! machine speeds, maintenance plans, shift configuration, and
//! feeder-to-maker machine relations. The orchestrator loads one
//! [`ReferenceSnapshot`] through the [`ReferencePort`] at the start of a run
//! and treats it as immutable for the remainder of the run.
//!
//! Missing entries are an expected condition, not an error: lookups return
//! `Option`/empty slices and the affected correction substep is skipped.

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wildcard key accepted in the speed table for machine-wide or
/// product-wide defaults.
pub const WILDCARD: &str = "*";

/// One row of the machine-speed table, keyed by `(machine_code, article_nr)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MachineSpeed {
    pub machine_code: String,
    pub article_nr: String,
    /// Nominal output in pieces/hour.
    pub speed: f64,
    /// Efficiency, stored either as a ratio (`0.85`) or a percentage (`85`).
    pub efficiency_rate: f64,
    pub setup_minutes: Option<i64>,
    pub changeover_minutes: Option<i64>,
    pub effective_from: Option<NaiveDateTime>,
    pub effective_to: Option<NaiveDateTime>,
}

impl MachineSpeed {
    /// Efficiency as a fraction in `[0, 1]`: values above 1 are treated as
    /// percentages and divided by 100.
    pub fn efficiency_fraction(&self) -> f64 {
        if self.efficiency_rate > 1.0 {
            self.efficiency_rate / 100.0
        } else {
            self.efficiency_rate
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceType {
    Routine,
    Major,
    Overhaul,
}

impl MaintenanceType {
    /// Major and overhaul windows can never be worked around by
    /// compressing; the order must be shifted past them.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Major | Self::Overhaul)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

impl MaintenanceStatus {
    /// Only planned and in-progress windows constrain scheduling.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Planned | Self::InProgress)
    }
}

/// One maintenance window on a machine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaintenancePlan {
    pub machine_code: String,
    pub maint_start_time: NaiveDateTime,
    pub maint_end_time: NaiveDateTime,
    pub maintenance_type: MaintenanceType,
    pub plan_status: MaintenanceStatus,
}

/// One shift of the plant calendar. Times are `HH:MM` on a 24-hour clock;
/// an end of `24:00` means midnight of the next day, and an end at or
/// before the start wraps past midnight (night shifts).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Shift {
    pub name: String,
    pub start_time: String,
    pub end_time: String,
}

impl Shift {
    pub fn new(name: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_time: start.into(),
            end_time: end.into(),
        }
    }
}

/// One feeder-to-maker pairing; smaller `priority` is preferred.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MachineRelation {
    pub feeder_code: String,
    pub maker_code: String,
    pub priority: i32,
}

/// Immutable per-run snapshot of the four reference tables.
#[derive(Clone, Debug, Default)]
pub struct ReferenceSnapshot {
    speeds: HashMap<(String, String), MachineSpeed>,
    maintenance: HashMap<String, Vec<MaintenancePlan>>,
    shifts: Vec<Shift>,
    relations: HashMap<String, Vec<MachineRelation>>,
}

impl ReferenceSnapshot {
    pub fn new(
        speeds: Vec<MachineSpeed>,
        maintenance: Vec<MaintenancePlan>,
        shifts: Vec<Shift>,
        relations: Vec<MachineRelation>,
    ) -> Self {
        let mut snapshot = Self {
            shifts,
            ..Self::default()
        };
        for speed in speeds {
            snapshot
                .speeds
                .insert((speed.machine_code.clone(), speed.article_nr.clone()), speed);
        }
        for plan in maintenance {
            snapshot
                .maintenance
                .entry(plan.machine_code.clone())
                .or_default()
                .push(plan);
        }
        for relation in relations {
            snapshot
                .relations
                .entry(relation.feeder_code.clone())
                .or_default()
                .push(relation);
        }
        for makers in snapshot.relations.values_mut() {
            makers.sort_by_key(|r| r.priority);
        }
        snapshot
    }

    /// Look up the speed entry for `(machine, article)`, falling back to a
    /// machine-wide default, then a product-wide default, then a global one.
    pub fn speed_for(&self, machine: &str, article: &str) -> Option<&MachineSpeed> {
        let keys = [
            (machine, article),
            (machine, WILDCARD),
            (WILDCARD, article),
            (WILDCARD, WILDCARD),
        ];
        keys.iter()
            .find_map(|(m, a)| self.speeds.get(&((*m).to_string(), (*a).to_string())))
    }

    /// Maintenance windows for a machine, in calendar order.
    pub fn maintenance_for(&self, machine: &str) -> Vec<&MaintenancePlan> {
        let mut windows: Vec<&MaintenancePlan> = self
            .maintenance
            .get(machine)
            .map(|v| v.iter().collect())
            .unwrap_or_default();
        windows.sort_by_key(|m| (m.maint_start_time, m.maint_end_time));
        windows
    }

    pub fn shifts(&self) -> &[Shift] {
        &self.shifts
    }

    /// True when the relation table carries any entries at all; the soft
    /// machine-relation check only runs in that case.
    pub fn has_relations(&self) -> bool {
        !self.relations.is_empty()
    }

    pub fn is_known_feeder(&self, feeder: &str) -> bool {
        self.relations.contains_key(feeder)
    }

    /// True when the relation table pairs `feeder` with `maker`.
    pub fn relation_exists(&self, feeder: &str, maker: &str) -> bool {
        self.relations
            .get(feeder)
            .is_some_and(|makers| makers.iter().any(|r| r.maker_code == maker))
    }

    /// Maker codes allowed for a feeder, best priority first.
    pub fn allowed_makers(&self, feeder: &str) -> Vec<&str> {
        self.relations
            .get(feeder)
            .map(|makers| makers.iter().map(|r| r.maker_code.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Port through which the orchestrator obtains its per-run snapshot.
///
/// Production adapters read the `aps_*` configuration tables; tests use
/// [`InMemoryReference`].
pub trait ReferencePort: Send + Sync {
    fn snapshot(&self) -> Result<ReferenceSnapshot>;
}

/// In-memory reference store with a fluent setup API.
#[derive(Clone, Debug, Default)]
pub struct InMemoryReference {
    speeds: Vec<MachineSpeed>,
    maintenance: Vec<MaintenancePlan>,
    shifts: Vec<Shift>,
    relations: Vec<MachineRelation>,
}

impl InMemoryReference {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_speed(mut self, speed: MachineSpeed) -> Self {
        self.speeds.push(speed);
        self
    }

    #[must_use]
    pub fn with_maintenance(mut self, plan: MaintenancePlan) -> Self {
        self.maintenance.push(plan);
        self
    }

    #[must_use]
    pub fn with_shift(mut self, shift: Shift) -> Self {
        self.shifts.push(shift);
        self
    }

    #[must_use]
    pub fn with_shifts(mut self, shifts: Vec<Shift>) -> Self {
        self.shifts.extend(shifts);
        self
    }

    #[must_use]
    pub fn with_relation(mut self, relation: MachineRelation) -> Self {
        self.relations.push(relation);
        self
    }
}

impl ReferencePort for InMemoryReference {
    fn snapshot(&self) -> Result<ReferenceSnapshot> {
        Ok(ReferenceSnapshot::new(
            self.speeds.clone(),
            self.maintenance.clone(),
            self.shifts.clone(),
            self.relations.clone(),
        ))
    }
}
