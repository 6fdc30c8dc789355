// Running-job series: sweep of each job's [start, end) interval

use super::UserSeries;
use crate::event::EventTable;
use crate::sweep::{IntervalSweeper, KeyedInterval};

/// Answers "how many jobs (and how much memory) is this user running at t"
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcurrencyTracker {
    sweeper: IntervalSweeper,
}

impl ConcurrencyTracker {
    pub fn new(sweeper: IntervalSweeper) -> Self {
        Self { sweeper }
    }

    /// Running-job count per user
    pub fn running_jobs(&self, events: &EventTable) -> UserSeries {
        let intervals = events
            .iter()
            .map(|e| {
                let (lo, hi) = e.run_interval();
                KeyedInterval::count(e.user.clone(), lo, hi)
            })
            .collect();
        self.sweeper.sweep_by_key(intervals)
    }

    /// Running memory per user, in milli-GB
    ///
    /// Uses each job's actual footprint rather than count x average.
    pub fn running_mem(&self, events: &EventTable) -> UserSeries {
        let intervals = events
            .iter()
            .map(|e| {
                let (lo, hi) = e.run_interval();
                KeyedInterval::weighted(e.user.clone(), lo, hi, e.mem_milli())
            })
            .collect();
        self.sweeper.sweep_by_key(intervals)
    }

    /// Peak aggregate running memory across all users, in milli-GB
    pub fn peak_running_mem(events: &EventTable) -> i64 {
        IntervalSweeper::sweep(events.iter().map(|e| {
            let (lo, hi) = e.run_interval();
            (lo, hi, e.mem_milli())
        }))
        .peak()
    }
}
