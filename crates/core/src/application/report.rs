// Run Report - what each instance did and what the monitor delivered

use serde::Serialize;
use std::collections::BTreeMap;

/// How one instance ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InstanceOutcome {
    /// Source returned after producing its output
    Exhausted,
    /// Consumed its sentinel and exited
    Terminated { processed: u64, skipped: u64 },
    /// Gave up waiting on its input (timeout policy `exit`)
    TimedOut { processed: u64, skipped: u64 },
    /// Unrecoverable error
    Failed { reason: String },
    /// Panicked; isolated by the task boundary
    Panicked { reason: String },
}

impl InstanceOutcome {
    pub fn consumed_sentinel(&self) -> bool {
        matches!(self, InstanceOutcome::Terminated { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            InstanceOutcome::Failed { .. } | InstanceOutcome::Panicked { .. }
        )
    }

    /// Payloads handled successfully
    pub fn processed(&self) -> u64 {
        match self {
            InstanceOutcome::Terminated { processed, .. }
            | InstanceOutcome::TimedOut { processed, .. } => *processed,
            _ => 0,
        }
    }
}

/// Outcome of one retired pool
#[derive(Debug, Clone, Serialize)]
pub struct PoolReport {
    pub name: String,
    pub outcomes: Vec<InstanceOutcome>,
    pub retired_at: i64,
}

impl PoolReport {
    pub fn instances(&self) -> usize {
        self.outcomes.len()
    }

    pub fn sentinels_consumed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.consumed_sentinel()).count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }
}

/// Summary of a whole pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: String,
    pub started_at: i64,
    pub finished_at: i64,
    /// Pools in retirement order
    pub pools: Vec<PoolReport>,
    /// Sentinels injected per queue
    pub sentinels: BTreeMap<String, usize>,
}

impl PipelineReport {
    pub fn elapsed_ms(&self) -> i64 {
        self.finished_at - self.started_at
    }

    pub fn pool(&self, name: &str) -> Option<&PoolReport> {
        self.pools.iter().find(|p| p.name == name)
    }

    pub fn sentinels_for(&self, queue: &str) -> usize {
        self.sentinels.get(queue).copied().unwrap_or(0)
    }

    pub fn failures(&self) -> usize {
        self.pools.iter().map(PoolReport::failures).sum()
    }
}
