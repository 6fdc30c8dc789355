// Per-user step-function series derived from the event table
//
// Running and waiting series are both thin applications of the shared
// IntervalSweeper; they differ only in which interval of each job is swept.
// Users are independent, so each tracker partitions by user and sweeps the
// partitions separately.

mod concurrency;
mod waiting;

pub use concurrency::ConcurrencyTracker;
pub use waiting::WaitTimeTracker;

use crate::event::{milli_to_gb, EventTable};
use crate::sweep::{IntervalSweeper, StepSeries};
use serde::Serialize;
use std::collections::BTreeMap;

/// User name to step series
pub type UserSeries = BTreeMap<String, StepSeries>;

/// Which per-user series to report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    /// Jobs running
    Running,
    /// Jobs waiting
    Waiting,
    /// Memory in use (GB)
    Memory,
}

impl SeriesKind {
    pub fn name(self) -> &'static str {
        match self {
            SeriesKind::Running => "running",
            SeriesKind::Waiting => "waiting",
            SeriesKind::Memory => "memory",
        }
    }

    /// Convert a raw sample value to its reported unit
    pub fn scale(self, value: i64) -> f64 {
        match self {
            SeriesKind::Memory => milli_to_gb(value),
            SeriesKind::Running | SeriesKind::Waiting => value as f64,
        }
    }
}

/// Every per-user series the usage model needs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraceSeries {
    /// Jobs running per user
    pub running: UserSeries,
    /// Memory in use per user (milli-GB)
    pub running_mem: UserSeries,
    /// Jobs waiting per user
    pub waiting: UserSeries,
}

impl TraceSeries {
    pub fn get(&self, kind: SeriesKind) -> &UserSeries {
        match kind {
            SeriesKind::Running => &self.running,
            SeriesKind::Waiting => &self.waiting,
            SeriesKind::Memory => &self.running_mem,
        }
    }

    /// Sweep all per-user series for a trace
    pub fn build(events: &EventTable, sweeper: IntervalSweeper) -> Self {
        let concurrency = ConcurrencyTracker::new(sweeper);
        let waiting = WaitTimeTracker::new(sweeper);
        Self {
            running: concurrency.running_jobs(events),
            running_mem: concurrency.running_mem(events),
            waiting: waiting.waiting_jobs(events),
        }
    }
}
