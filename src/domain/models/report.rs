use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::sequence::{Unit, UnitSequence};

/// Counters and timing collected over one reduction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionStats {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub initial_len: usize,
    pub final_len: usize,
    /// Partition rounds executed (transitions plus granularity increases)
    pub rounds: usize,
    /// Oracle invocations, excluding cache hits
    pub oracle_calls: u64,
    pub cache_hits: u64,
    /// Oracle calls that exceeded the timeout and were counted as pass
    pub timeouts: u64,
}

impl ReductionStats {
    /// Fraction of the initial units removed by the reduction.
    #[allow(clippy::cast_precision_loss)]
    pub fn reduction_ratio(&self) -> f64 {
        if self.initial_len == 0 {
            return 0.0;
        }
        let removed = self.initial_len.saturating_sub(self.final_len);
        removed as f64 / self.initial_len as f64
    }
}

/// Result of a successful reduction.
#[derive(Debug, Clone)]
pub struct ReductionReport<U: Unit> {
    /// The 1-minimal failing candidate
    pub output: UnitSequence<U>,
    pub stats: ReductionStats,
}
