//! Scheduler configuration.
//!
//! Every knob the pipeline exposes, with the defaults the plant runs on.
//! Stage flags let callers execute a partial pipeline (e.g. splitting
//! already-merged plans); the remaining options tune the time corrector
//! and the merger's special-brand handling.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Article codes that are never merged, regardless of equivalence.
/// Currently the two spellings of 利群（新版印尼）.
pub fn default_special_brands() -> HashSet<String> {
    ["利群（新版印尼）", "利群(新版印尼)"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Configuration for a pipeline run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Run the merge stage; when false, preprocessed plans pass through
    /// one-to-one.
    pub merge_enabled: bool,
    /// Run the split stage; when false, merged plans pass through as
    /// packer orders only.
    pub split_enabled: bool,
    /// Run speed / maintenance / shift correction.
    pub correction_enabled: bool,
    /// Run parallel synchronisation.
    pub parallel_enabled: bool,

    /// Article codes excluded from merging.
    pub special_brands: HashSet<String>,
    /// Orders longer than this many hours may span shifts instead of being
    /// clamped to the shift end.
    pub shift_clamp_max_hours: f64,
    /// Fallback setup time when the speed table has none, in minutes.
    pub setup_minutes_default: i64,
    /// Fallback changeover time when the speed table has none, in minutes.
    pub changeover_minutes_default: i64,
    /// Minimum difference between the recomputed and the planned end before
    /// the speed correction rewrites the window, in minutes.
    pub speed_tolerance_minutes: i64,

    /// Overall wall-clock budget for one run.
    pub deadline: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            merge_enabled: true,
            split_enabled: true,
            correction_enabled: true,
            parallel_enabled: true,
            special_brands: default_special_brands(),
            shift_clamp_max_hours: 24.0,
            setup_minutes_default: 30,
            changeover_minutes_default: 15,
            speed_tolerance_minutes: 30,
            deadline: Duration::from_secs(3600),
        }
    }
}

impl SchedulerConfig {
    /// All stage flags off: the generator still runs and emits one MES
    /// order per input row's machine decomposition.
    pub fn passthrough() -> Self {
        Self {
            merge_enabled: false,
            split_enabled: false,
            correction_enabled: false,
            parallel_enabled: false,
            ..Self::default()
        }
    }
}
