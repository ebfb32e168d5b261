//! MES identifier sequence port.
//!
//! Emitted MES orders carry `plan_id`s of the form `H<kind><9-digit>`, where
//! the kind is `WS` (feeder) or `JB` (packer) and the suffix comes from a
//! per-kind strictly increasing counter. The counter is the single point of
//! cross-run contention, so production adapters must allocate atomically
//! (and durably, to survive restarts); [`InMemorySequence`] provides the
//! in-process equivalent for tests and single-node use.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// The two MES order-number families.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceKind {
    /// Feeder orders: `HWS…`.
    Hws,
    /// Packer orders: `HJB…`.
    Hjb,
}

impl SequenceKind {
    /// Two-letter kind code embedded in the plan id.
    pub fn code(self) -> &'static str {
        match self {
            Self::Hws => "WS",
            Self::Hjb => "JB",
        }
    }
}

/// Render a plan id: `H` + kind code + zero-padded 9-digit sequence.
pub fn format_plan_id(kind: SequenceKind, sequence: u64) -> String {
    format!("H{}{:09}", kind.code(), sequence)
}

/// Port producing the next per-kind sequence number.
pub trait SequencePort: Send + Sync {
    /// Strictly increasing within a kind. May fail when the backing store
    /// is unavailable; the generator then falls back to random suffixes.
    fn next(&self, kind: SequenceKind) -> Result<u64>;
}

/// Atomic in-process sequence. Monotonic across concurrent runs sharing the
/// instance; not durable across restarts.
#[derive(Debug, Default)]
pub struct InMemorySequence {
    hws: AtomicU64,
    hjb: AtomicU64,
}

impl InMemorySequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting from given values, e.g. restored from storage.
    pub fn starting_at(hws: u64, hjb: u64) -> Self {
        Self {
            hws: AtomicU64::new(hws),
            hjb: AtomicU64::new(hjb),
        }
    }
}

impl SequencePort for InMemorySequence {
    fn next(&self, kind: SequenceKind) -> Result<u64> {
        let counter = match kind {
            SequenceKind::Hws => &self.hws,
            SequenceKind::Hjb => &self.hjb,
        };
        Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
