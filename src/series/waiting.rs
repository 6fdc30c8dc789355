// Waiting-job series: sweep of each job's [submit, start) interval
//
// Jobs that start the instant they are submitted have an empty wait
// interval; the sweeper drops it, so they never show up as waiting.

use super::UserSeries;
use crate::event::EventTable;
use crate::sweep::{IntervalSweeper, KeyedInterval};

/// Answers "how many jobs is this user waiting on at t"
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitTimeTracker {
    sweeper: IntervalSweeper,
}

impl WaitTimeTracker {
    pub fn new(sweeper: IntervalSweeper) -> Self {
        Self { sweeper }
    }

    /// Waiting-job count per user
    pub fn waiting_jobs(&self, events: &EventTable) -> UserSeries {
        let intervals = events
            .iter()
            .map(|e| {
                let (lo, hi) = e.wait_interval();
                KeyedInterval::count(e.user.clone(), lo, hi)
            })
            .collect();
        self.sweeper.sweep_by_key(intervals)
    }
}
