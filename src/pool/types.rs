/*!
 * Pool Types
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a job failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The handler returned an error
    Failed,
    /// The handler panicked
    Panicked,
}

/// A job failure reported on the fault channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerFault {
    pub worker: usize,
    pub kind: FaultKind,
    pub message: String,
}

impl fmt::Display for WorkerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            FaultKind::Failed => "failed",
            FaultKind::Panicked => "panicked",
        };
        write!(f, "worker {} job {}: {}", self.worker, verb, self.message)
    }
}

/// Counters accumulated while the pool runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    /// Faults dropped because the fault channel was closed by a consumer
    pub faults_unreported: u64,
}

/// Summary returned by `WorkerPool::join`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReport {
    pub name: String,
    pub workers: usize,
    pub stats: PoolStats,
}

/// Everything a `run` produced
#[derive(Debug, Clone)]
pub struct PoolOutcome<R> {
    /// Results in arrival order
    pub results: Vec<R>,
    pub faults: Vec<WorkerFault>,
    pub report: PoolReport,
}
