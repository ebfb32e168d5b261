//! Stage 2: merging — fuse equivalent decade plans.
//!
//! Two plans merge iff they fall in the same calendar month, agree on
//! article, maker group, and feeder after trimming, and the article is not
//! a special brand. Equivalence classes are computed with a union-find over
//! all pairs; classes of size one pass through unchanged, larger classes
//! are fused (quantities summed, window widened to `[min(start),
//! max(end)]`) under a fresh `M<yyyymmdd><seq>` number.
//!
//! Plans that would have merged except for the month rule feed the backup
//! branch: per-month backup orders (`B<yyyymmdd><seq>`) surfaced to the
//! caller but never scheduled.

use chrono::NaiveDateTime;
use log::{debug, info};
use std::collections::BTreeMap;

use crate::config::SchedulerConfig;
use crate::plan::{BackupOrder, MergedPlan, PreprocessedPlan};

/// Result of the merge stage.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub plans: Vec<MergedPlan>,
    /// Cross-month backup orders; not part of the schedule.
    pub backup_orders: Vec<BackupOrder>,
    /// Number of classes that actually fused more than one plan.
    pub merged_groups: usize,
}

/// The merge stage. Sequence counters reset per instance, i.e. per run.
#[derive(Debug)]
pub struct Merger {
    run_at: NaiveDateTime,
    merge_seq: u32,
    backup_seq: u32,
}

impl Merger {
    /// `run_at` stamps generated work-order numbers.
    pub fn new(run_at: NaiveDateTime) -> Self {
        Self {
            run_at,
            merge_seq: 1,
            backup_seq: 1,
        }
    }

    /// Fuse equivalent plans and collect cross-month backups.
    pub fn merge(&mut self, plans: Vec<PreprocessedPlan>, config: &SchedulerConfig) -> MergeOutcome {
        if plans.is_empty() {
            return MergeOutcome::default();
        }

        let classes = equivalence_classes(&plans, |a, b| can_merge(a, b, config, true));
        let mut merged = Vec::with_capacity(classes.len());
        let mut merged_groups = 0;

        for class in classes {
            if class.len() > 1 {
                merged_groups += 1;
                let group: Vec<PreprocessedPlan> =
                    class.iter().map(|&i| plans[i].clone()).collect();
                let plan = self.fuse(group);
                info!(
                    "merged {} plans into {} ({} boxes)",
                    plan.merged_count, plan.work_order_nr, plan.final_quantity
                );
                merged.push(plan);
            } else {
                merged.push(MergedPlan::from_plan(plans[class[0]].clone()));
            }
        }

        // Backup numbering runs after the mainline so fused plans keep the
        // low merge-sequence numbers.
        let backup_orders = self.collect_backup_orders(&plans, config);

        info!(
            "merge: {} plans in, {} out, {} groups fused, {} backup orders",
            plans.len(),
            merged.len(),
            merged_groups,
            backup_orders.len()
        );
        MergeOutcome {
            plans: merged,
            backup_orders,
            merged_groups,
        }
    }

    /// Fuse a class of equivalent plans, sorted by start time.
    fn fuse(&mut self, mut group: Vec<PreprocessedPlan>) -> MergedPlan {
        group.sort_by_key(|p| p.planned_start);

        let work_order_nr = format!("M{}{:04}", self.run_at.format("%Y%m%d"), self.merge_seq);
        self.merge_seq += 1;

        let first = &group[0];
        MergedPlan {
            work_order_nr,
            article_nr: first.article_nr.clone(),
            package_type: first.package_type.clone(),
            specification: first.specification.clone(),
            quantity_total: group.iter().map(|p| p.quantity_total).sum(),
            final_quantity: group.iter().map(|p| p.final_quantity).sum(),
            maker_code: first.maker_code.clone(),
            feeder_code: first.feeder_code.clone(),
            planned_start: group
                .iter()
                .map(|p| p.planned_start)
                .min()
                .unwrap_or(first.planned_start),
            planned_end: group
                .iter()
                .map(|p| p.planned_end)
                .max()
                .unwrap_or(first.planned_end),
            is_merged: true,
            merged_from: group.iter().map(|p| p.work_order_nr.clone()).collect(),
            merged_count: group.len(),
        }
    }

    /// Find groups equivalent up to the month rule but spanning months, and
    /// emit one backup order per month bucket.
    fn collect_backup_orders(
        &mut self,
        plans: &[PreprocessedPlan],
        config: &SchedulerConfig,
    ) -> Vec<BackupOrder> {
        let classes = equivalence_classes(plans, |a, b| can_merge(a, b, config, false));
        let mut backups = Vec::new();

        for class in classes {
            let months: std::collections::BTreeSet<(i32, u32)> =
                class.iter().map(|&i| plans[i].start_month()).collect();
            if months.len() < 2 {
                continue;
            }

            debug!("cross-month group spanning {} months", months.len());
            let mut buckets: BTreeMap<(i32, u32), Vec<&PreprocessedPlan>> = BTreeMap::new();
            for &i in &class {
                buckets.entry(plans[i].start_month()).or_default().push(&plans[i]);
            }

            for ((year, month), bucket) in buckets {
                let fused = self.fuse(bucket.iter().map(|&p| p.clone()).collect());
                let work_order_nr =
                    format!("B{}{:04}", self.run_at.format("%Y%m%d"), self.backup_seq);
                backups.push(BackupOrder {
                    work_order_nr,
                    article_nr: fused.article_nr,
                    maker_code: fused.maker_code,
                    feeder_code: fused.feeder_code,
                    quantity_total: fused.quantity_total,
                    final_quantity: fused.final_quantity,
                    planned_start: fused.planned_start,
                    planned_end: fused.planned_end,
                    backup_reason: format!("cross-month order, backup for {year}-{month:02}"),
                    backup_sequence: self.backup_seq,
                    covers: fused.merged_from,
                });
                self.backup_seq += 1;
            }
        }

        backups
    }
}

/// The merge equivalence relation. `check_month` is relaxed by the backup
/// branch to spot cross-month groups.
fn can_merge(
    a: &PreprocessedPlan,
    b: &PreprocessedPlan,
    config: &SchedulerConfig,
    check_month: bool,
) -> bool {
    if check_month && a.start_month() != b.start_month() {
        debug!(
            "plans {} and {} span months, not merged",
            a.work_order_nr, b.work_order_nr
        );
        return false;
    }
    let article = a.article_nr.trim();
    if article != b.article_nr.trim() {
        return false;
    }
    if a.maker_code.trim() != b.maker_code.trim() {
        return false;
    }
    if a.feeder_code.trim() != b.feeder_code.trim() {
        return false;
    }
    if config.special_brands.contains(article) {
        debug!("special brand {article}, never merged");
        return false;
    }
    true
}

/// Union-find over all pairs. O(n²) pair checks are fine for decade-plan
/// batch sizes (at most a few thousand rows).
fn equivalence_classes<F>(plans: &[PreprocessedPlan], related: F) -> Vec<Vec<usize>>
where
    F: Fn(&PreprocessedPlan, &PreprocessedPlan) -> bool,
{
    let n = plans.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if related(&plans[i], &plans[j]) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[ri] = rj;
                }
            }
        }
    }

    let mut classes: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        classes.entry(root).or_default().push(i);
    }
    classes.into_values().collect()
}
