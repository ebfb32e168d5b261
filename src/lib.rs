//! # Leafline
//!
//! An **advanced planning & scheduling (APS) core** for cigarette
//! manufacturing plants. Leafline takes a batch of ten-day ("decade")
//! production plans and turns them into executable MES work orders whose
//! start and end times respect machine-speed differences, maintenance
//! windows, shift calendars, and feeder exclusivity.
//!
//! ## The pipeline
//!
//! Scheduling runs as a linear chain of six stages; each consumes the
//! previous stage's output plus read-only reference data snapshotted at the
//! start of the run:
//!
//! 1. **Preprocessing** — drop empty rows, map fields, coerce quantities,
//!    validate work-order numbers.
//! 2. **Merging** — fuse plans that share month, product, maker group, and
//!    feeder (special brands never merge).
//! 3. **Splitting** — one packer order per maker, one feeder order per
//!    feeder group, with feeder time conflicts resolved by shifting.
//! 4. **Time correction** — recompute durations from machine speeds, dodge
//!    maintenance windows, clamp to the shift calendar.
//! 5. **Parallel synchronisation** — machines executing one logical work
//!    order start and finish together.
//! 6. **Work-order generation** — emit MES-shaped `HWS` (feeder) and `HJB`
//!    (packer) records linked by input batch, plus gantt-friendly schedule
//!    summaries.
//!
//! ## Quick Start
//!
//! ```no_run
//! use leafline::{InMemoryReference, InMemorySequence, Scheduler};
//! use leafline::testing::PlanRowBuilder;
//!
//! let scheduler = Scheduler::new(
//!     Box::new(InMemoryReference::new()),
//!     Box::new(InMemorySequence::new()),
//! );
//!
//! let rows = vec![
//!     PlanRowBuilder::new("W0001")
//!         .article("HNZJHYLC001")
//!         .makers("C1,C2")
//!         .feeder("F001")
//!         .window("2024-10-16 08:00", "2024-10-16 20:00")
//!         .quantity_total(600)
//!         .final_quantity(300)
//!         .build(),
//! ];
//!
//! let result = scheduler.run(rows);
//! assert!(result.success);
//! for order in &result.mes_orders {
//!     println!("{} on {} ({})", order.plan_id, order.production_line, order.unit);
//! }
//! ```
//!
//! ## Ports
//!
//! Two collaborators are external and injected at construction:
//!
//! - [`ReferencePort`] supplies the per-run snapshot of machine speeds,
//!   maintenance plans, shift configuration, and feeder–maker relations.
//!   [`InMemoryReference`] is the built-in implementation for tests and
//!   single-node use.
//! - [`SequencePort`] allocates the strictly increasing MES identifier
//!   suffixes behind `HWS…`/`HJB…` plan ids. [`InMemorySequence`] provides
//!   atomic in-process counters; durable adapters live outside this crate.
//!
//! Missing reference data never fails a run: the affected correction
//! substep is skipped and the order passes through with its window
//! unchanged.
//!
//! ## Configuration
//!
//! [`SchedulerConfig`] carries the stage toggles (`merge_enabled`,
//! `split_enabled`, `correction_enabled`, `parallel_enabled`), the
//! special-brand set, speed-correction tolerances, the cross-shift
//! threshold, and the overall run deadline. Defaults match the plant's
//! production settings.
//!
//! ## Execution modes
//!
//! The pipeline is sequential stage to stage. Within time correction,
//! orders are independent; [`ExecMode::Parallel`] fans them out over a
//! Rayon pool while preserving order, so both modes produce identical
//! output. Final MES orders are sorted by `plan_id` either way.
//!
//! ## Feature Flags
//!
//! - `metrics` - Enable the [`metrics`] collector module (enabled by default)
//! - `parallel` - Enable the Rayon-backed execution mode (enabled by default)
//!
//! ## Testing Your Schedules
//!
//! The [`testing`] module ships builders ([`testing::PlanRowBuilder`]),
//! scenario fixtures, and scheduling-specific assertions such as
//! [`testing::assert_no_feeder_overlap`] and
//! [`testing::assert_input_batch_linkage`]:
//!
//! ```no_run
//! use leafline::testing::*;
//! use leafline::{InMemoryReference, InMemorySequence, Scheduler};
//!
//! let scheduler = Scheduler::new(
//!     Box::new(reference_with_default_shifts()),
//!     Box::new(InMemorySequence::new()),
//! );
//! let result = scheduler.run(mergeable_rows());
//! assert_plan_id_formats(&result.mes_orders);
//! assert_input_batch_linkage(&result.mes_orders);
//! ```
//!
//! ## Module Overview
//!
//! - [`plan`] - Raw rows, preprocessed plans, merged plans, backup orders
//! - [`order`] - The work-order record flowing through split → correct → sync
//! - [`mes`] - MES wire shapes: `MesOrder`, `InputBatch`, `ScheduleSummary`
//! - [`stages`] - The six pipeline stages, independently testable
//! - [`pipeline`] - The orchestrator, stage metrics, cancellation
//! - [`reference`] - Reference-data port and in-memory store
//! - [`sequence`] - MES identifier sequence port
//! - [`interval`] - Time slots and the feeder booking list
//! - [`calendar`] - Shift-calendar arithmetic
//! - [`config`] - Scheduler configuration
//! - [`validation`] - Row validation and error collection
//! - [`testing`] - Builders, assertions, and fixtures
//! - [`metrics`] - Metrics collection and reporting (feature: `metrics`)

pub mod calendar;
pub mod config;
pub mod interval;
pub mod mes;
pub mod order;
pub mod pipeline;
pub mod plan;
pub mod reference;
pub mod sequence;
pub mod stages;
pub mod testing;
pub mod validation;

#[cfg(feature = "metrics")]
pub mod metrics;

// General re-exports
pub use config::SchedulerConfig;
pub use interval::{Booking, FeederSchedule, TimeSlot};
pub use mes::{InputBatch, MesOrder, MesOrderKind, ScheduleSummary};
pub use order::{AuditTrail, SyncGroup, WorkOrder, WorkOrderType};
pub use pipeline::{CancelToken, ExecMode, PipelineResult, Scheduler, Stage, StageMetrics};
pub use plan::{BackupOrder, MachineType, MergedPlan, PlanRow, PreprocessedPlan};
pub use reference::{
    InMemoryReference, MachineRelation, MachineSpeed, MaintenancePlan, MaintenanceStatus,
    MaintenanceType, ReferencePort, ReferenceSnapshot, Shift,
};
pub use sequence::{InMemorySequence, SequenceKind, SequencePort, format_plan_id};
pub use validation::{RowError, RowValidationReport, ValidationError, validate_rows};
