//! Pipeline orchestration: the six stages wired end to end.
//!
//! A [`Scheduler`] owns the two external ports (reference data and the MES
//! identifier sequence) and a [`SchedulerConfig`]. One call to
//! [`Scheduler::run`] takes a batch of raw plan rows through preprocessing,
//! merging, splitting, time correction, synchronisation, and MES
//! generation, and returns a [`PipelineResult`] with the emitted orders,
//! schedule summaries, per-stage metrics, and every warning or row error
//! collected along the way.
//!
//! The pipeline is sequential stage-to-stage; within the time-correction
//! stage, [`ExecMode::Parallel`] fans orders out across a Rayon pool (the
//! orders are independent) and preserves their order, so output is
//! deterministic in both modes. Final MES output is additionally sorted by
//! `plan_id`.
//!
//! Cancellation is cooperative: a [`CancelToken`] is checked at stage
//! boundaries, and a cancelled run returns with `cancelled = true` and no
//! outputs. An overall deadline (default one hour) is enforced the same
//! way.

use chrono::{Local, NaiveDateTime};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::mes::{MesOrder, ScheduleSummary};
use crate::order::{AuditTrail, WorkOrder, WorkOrderType};
use crate::plan::{BackupOrder, MergedPlan, PlanRow};
use crate::reference::ReferencePort;
use crate::sequence::SequencePort;
use crate::stages::{Generator, Merger, Preprocessor, Splitter, Synchronizer, TimeCorrector};
use crate::validation::{RowError, RowValidationReport, validate_rows};

/// Execution mode for the per-order work inside the time-correction stage.
#[derive(Clone, Copy, Debug)]
pub enum ExecMode {
    Sequential,
    Parallel { threads: Option<usize> },
}

impl Default for ExecMode {
    fn default() -> Self {
        Self::Sequential
    }
}

/// Cooperative cancellation signal, checked between units of work.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// The pipeline stages, in execution order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preprocessing,
    Merging,
    Splitting,
    TimeCorrection,
    Synchronization,
    Generation,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Preprocessing => "preprocessing",
            Self::Merging => "merging",
            Self::Splitting => "splitting",
            Self::TimeCorrection => "time_correction",
            Self::Synchronization => "synchronization",
            Self::Generation => "generation",
        }
    }
}

/// Execution counters for one stage of one run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StageMetrics {
    pub stage: String,
    pub input_count: usize,
    pub output_count: usize,
    pub duration_seconds: f64,
    pub error_count: usize,
    pub custom_metrics: HashMap<String, serde_json::Value>,
}

/// Everything one pipeline run produced.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    pub cancelled: bool,
    /// Key under which orders and summaries are persisted, unique per run.
    pub task_id: String,
    /// Final MES orders, sorted by `plan_id`.
    pub mes_orders: Vec<MesOrder>,
    pub schedule_summaries: Vec<ScheduleSummary>,
    /// Cross-month backup orders from the merge stage; informational only.
    pub backup_orders: Vec<BackupOrder>,
    pub stage_metrics: Vec<StageMetrics>,
    pub warnings: Vec<String>,
    pub row_errors: Vec<RowError>,
    pub stages_completed: usize,
    pub error: Option<String>,
}

/// The pipeline orchestrator.
pub struct Scheduler {
    reference: Box<dyn ReferencePort>,
    sequence: Box<dyn SequencePort>,
    config: SchedulerConfig,
    mode: ExecMode,
}

impl Scheduler {
    pub fn new(reference: Box<dyn ReferencePort>, sequence: Box<dyn SequencePort>) -> Self {
        Self {
            reference,
            sequence,
            config: SchedulerConfig::default(),
            mode: ExecMode::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ExecMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Pre-flight check of the required row fields, without scheduling.
    pub fn validate_rows(&self, rows: &[PlanRow]) -> RowValidationReport {
        validate_rows(rows)
    }

    /// Run the full pipeline.
    pub fn run(&self, rows: Vec<PlanRow>) -> PipelineResult {
        self.run_with_token(rows, &CancelToken::new())
    }

    /// Run the full pipeline under a cancellation token.
    pub fn run_with_token(&self, rows: Vec<PlanRow>, token: &CancelToken) -> PipelineResult {
        let run_at = Local::now().naive_local();
        self.run_at(rows, token, run_at)
    }

    /// Run with an explicit clock, which stamps generated identifiers.
    pub fn run_at(
        &self,
        rows: Vec<PlanRow>,
        token: &CancelToken,
        run_at: NaiveDateTime,
    ) -> PipelineResult {
        let started = Instant::now();
        let mut result = PipelineResult {
            task_id: format!("task-{}", Uuid::new_v4()),
            ..PipelineResult::default()
        };
        info!(
            "pipeline {}: {} rows, deadline {:?}",
            result.task_id,
            rows.len(),
            self.config.deadline
        );

        let snapshot = match self.reference.snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!("reference snapshot failed: {err:#}");
                result.error = Some(format!("reference snapshot failed: {err:#}"));
                return result;
            }
        };

        macro_rules! checkpoint {
            () => {
                if token.is_cancelled() {
                    result.cancelled = true;
                    return result;
                }
                if started.elapsed() > self.config.deadline {
                    result.error = Some("pipeline deadline exceeded".to_string());
                    return result;
                }
            };
        }

        // Stage 1: preprocessing.
        checkpoint!();
        let input_count = rows.len();
        let stage_start = Instant::now();
        let preprocessed = Preprocessor::new().preprocess(&rows);
        result.row_errors = preprocessed.errors.clone();
        result.stage_metrics.push(StageMetrics {
            stage: Stage::Preprocessing.name().to_string(),
            input_count,
            output_count: preprocessed.plans.len(),
            duration_seconds: stage_start.elapsed().as_secs_f64(),
            error_count: preprocessed.errors.len(),
            custom_metrics: HashMap::from([
                ("rejected".to_string(), preprocessed.rejected.into()),
                ("dropped_empty".to_string(), preprocessed.dropped_empty.into()),
            ]),
        });
        result.stages_completed = 1;
        let plans = preprocessed.plans;

        // Stage 2: merging.
        checkpoint!();
        let merged = if self.config.merge_enabled {
            let input_count = plans.len();
            let stage_start = Instant::now();
            let outcome = Merger::new(run_at).merge(plans, &self.config);
            result.stage_metrics.push(StageMetrics {
                stage: Stage::Merging.name().to_string(),
                input_count,
                output_count: outcome.plans.len(),
                duration_seconds: stage_start.elapsed().as_secs_f64(),
                error_count: 0,
                custom_metrics: HashMap::from([
                    ("merged_groups".to_string(), outcome.merged_groups.into()),
                    (
                        "backup_orders".to_string(),
                        outcome.backup_orders.len().into(),
                    ),
                ]),
            });
            result.backup_orders = outcome.backup_orders;
            outcome.plans
        } else {
            plans.into_iter().map(MergedPlan::from_plan).collect()
        };
        result.stages_completed = 2;

        // Stage 3: splitting.
        checkpoint!();
        let orders = if self.config.split_enabled {
            let input_count = merged.len();
            let stage_start = Instant::now();
            let outcome = Splitter::new(run_at).split(merged, &snapshot);
            result.warnings.extend(outcome.warnings.iter().cloned());
            result.stage_metrics.push(StageMetrics {
                stage: Stage::Splitting.name().to_string(),
                input_count,
                output_count: outcome.packer_orders.len() + outcome.feeder_orders.len(),
                duration_seconds: stage_start.elapsed().as_secs_f64(),
                error_count: 0,
                custom_metrics: HashMap::from([
                    ("feeder_groups".to_string(), outcome.feeder_groups.into()),
                    (
                        "conflicts_resolved".to_string(),
                        outcome.conflicts_resolved.into(),
                    ),
                ]),
            });
            outcome.into_orders()
        } else {
            merged.into_iter().map(passthrough_order).collect()
        };
        result.stages_completed = 3;

        // Stage 4: time correction.
        checkpoint!();
        let corrected = if self.config.correction_enabled {
            let input_count = orders.len();
            let stage_start = Instant::now();
            let corrector = TimeCorrector::new(&snapshot, &self.config);
            let corrected = self.correct(&corrector, orders, token);
            let outcome = TimeCorrector::tally(&corrected);
            result.stage_metrics.push(StageMetrics {
                stage: Stage::TimeCorrection.name().to_string(),
                input_count,
                output_count: corrected.len(),
                duration_seconds: stage_start.elapsed().as_secs_f64(),
                error_count: 0,
                custom_metrics: HashMap::from([
                    ("speed_adjusted".to_string(), outcome.speed_adjusted.into()),
                    (
                        "maintenance_adjusted".to_string(),
                        outcome.maintenance_adjusted.into(),
                    ),
                    ("shift_adjusted".to_string(), outcome.shift_adjusted.into()),
                    ("total_adjusted".to_string(), outcome.total_adjusted.into()),
                ]),
            });
            corrected
        } else {
            orders
        };
        result.stages_completed = 4;

        // Stage 5: synchronisation.
        checkpoint!();
        let synchronized = if self.config.parallel_enabled {
            let input_count = corrected.len();
            let stage_start = Instant::now();
            let outcome = Synchronizer::new(run_at).synchronize(corrected);
            result.warnings.extend(outcome.warnings.iter().cloned());
            result.stage_metrics.push(StageMetrics {
                stage: Stage::Synchronization.name().to_string(),
                input_count,
                output_count: outcome.orders.len(),
                duration_seconds: stage_start.elapsed().as_secs_f64(),
                error_count: 0,
                custom_metrics: HashMap::from([
                    (
                        "sync_groups_created".to_string(),
                        outcome.groups_synchronized.into(),
                    ),
                    (
                        "machines_synchronized".to_string(),
                        outcome.machines_synchronized.into(),
                    ),
                ]),
            });
            outcome.orders
        } else {
            corrected
        };
        result.stages_completed = 5;

        // Stage 6: generation.
        checkpoint!();
        let input_count = synchronized.len();
        let stage_start = Instant::now();
        let mut generator = Generator::new(self.sequence.as_ref(), &result.task_id, run_at);
        let outcome = generator.generate(&synchronized);
        result.warnings.extend(outcome.warnings.iter().cloned());
        result.stage_metrics.push(StageMetrics {
            stage: Stage::Generation.name().to_string(),
            input_count,
            output_count: outcome.mes_orders.len(),
            duration_seconds: stage_start.elapsed().as_secs_f64(),
            error_count: 0,
            custom_metrics: HashMap::from([
                ("fallback_ids".to_string(), outcome.fallback_count.into()),
                (
                    "schedule_summaries".to_string(),
                    outcome.schedule_summaries.len().into(),
                ),
            ]),
        });
        result.stages_completed = 6;

        result.mes_orders = outcome.mes_orders;
        result.schedule_summaries = outcome.schedule_summaries;
        result.success = true;
        info!(
            "pipeline {} finished: {} MES orders, {} summaries in {:.2}s",
            result.task_id,
            result.mes_orders.len(),
            result.schedule_summaries.len(),
            started.elapsed().as_secs_f64()
        );
        result
    }

    /// Run the time corrector in the configured execution mode. The
    /// sequential path checks the token per order, so cancellation lands
    /// after the current unit of work.
    #[cfg(feature = "parallel")]
    fn correct(
        &self,
        corrector: &TimeCorrector<'_>,
        orders: Vec<WorkOrder>,
        token: &CancelToken,
    ) -> Vec<WorkOrder> {
        use rayon::prelude::*;
        match self.mode {
            ExecMode::Sequential => correct_seq(corrector, orders, token),
            ExecMode::Parallel { threads } => {
                let threads = threads.unwrap_or_else(|| num_cpus::get().max(2));
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build_global()
                    .ok();
                // A parallel map preserves input order.
                orders
                    .into_par_iter()
                    .map(|order| corrector.correct_order(order))
                    .collect()
            }
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn correct(
        &self,
        corrector: &TimeCorrector<'_>,
        orders: Vec<WorkOrder>,
        token: &CancelToken,
    ) -> Vec<WorkOrder> {
        correct_seq(corrector, orders, token)
    }
}

fn correct_seq(
    corrector: &TimeCorrector<'_>,
    orders: Vec<WorkOrder>,
    token: &CancelToken,
) -> Vec<WorkOrder> {
    let mut corrected = Vec::with_capacity(orders.len());
    for order in orders {
        if token.is_cancelled() {
            break;
        }
        corrected.push(corrector.correct_order(order));
    }
    corrected
}

/// With splitting disabled, a merged plan passes through as a single packer
/// order; the generator still decomposes its maker list.
fn passthrough_order(plan: MergedPlan) -> WorkOrder {
    WorkOrder {
        work_order_nr: plan.work_order_nr.clone(),
        source_plan: plan.work_order_nr,
        order_type: WorkOrderType::Packing,
        article_nr: plan.article_nr,
        maker_code: Some(plan.maker_code),
        feeder_code: plan.feeder_code,
        quantity_total: plan.quantity_total,
        final_quantity: plan.final_quantity,
        planned_start: plan.planned_start,
        planned_end: plan.planned_end,
        split_sequence: None,
        total_makers: None,
        input_plan_id: None,
        associated_makers: Vec::new(),
        tobacco_consumption_rate: 0.0,
        source_plans: Vec::new(),
        plan_count: 0,
        is_backup: false,
        is_synchronized: false,
        sync: None,
        audit: AuditTrail::default(),
    }
}
