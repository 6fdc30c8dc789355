//! Fair-share usage and starvation model
//!
//! Each scheduling cycle divides cluster memory equally among the users that
//! are active in it (holding at least one running or waiting job at some
//! point of the cycle). Every change point of a user's running or waiting
//! series is then scored against the fair share of its enclosing cycle:
//!
//! | Field | Definition |
//! |-------|-----------|
//! | fair_share_mem | capacity / active users in the cycle |
//! | fair_ratio | (running - fair) / fair, undefined when fair is 0 |
//! | starved_mem_gb | max(0, fair - running) while the user has waiting jobs |
//! | starved_mem_log10 | log10(starved), undefined when starved is 0 |
//!
//! Cycles without active users have no denominator; samples falling in them
//! are dropped (inner join on cycle).

use crate::error::{Result, TraceError};
use crate::event::{milli_to_gb, EventTable};
use crate::series::TraceSeries;
use crate::sweep::{IntervalSweeper, KeyedInterval, StepSeries};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Fairness state of one user at one change point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub user: String,
    pub time_ms: u64,
    /// `time_ms / cycle_time_ms`
    pub cycle: u64,
    pub running_jobs: i64,
    pub waiting_jobs: i64,
    /// Memory in use (GB)
    pub running_mem: f64,
    /// Equal share of cluster memory for this cycle (GB)
    pub fair_share_mem: f64,
    pub fair_ratio: Option<f64>,
    pub starved_mem_gb: f64,
    pub starved_mem_log10: Option<f64>,
}

impl UsageRecord {
    pub fn is_starved(&self) -> bool {
        self.starved_mem_gb > 0.0
    }
}

/// Usage records ordered by (user, time)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTable {
    records: Vec<UsageRecord>,
    /// Samples discarded because their cycle had no active users
    dropped_samples: usize,
}

impl UsageTable {
    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dropped_samples(&self) -> usize {
        self.dropped_samples
    }

    /// Records with a positive memory deficit
    pub fn starved(&self) -> impl Iterator<Item = &UsageRecord> {
        self.records.iter().filter(|r| r.is_starved())
    }

    /// Records for a single user, in time order
    pub fn for_user<'a>(&'a self, user: &'a str) -> impl Iterator<Item = &'a UsageRecord> {
        self.records.iter().filter(move |r| r.user == user)
    }
}

/// Joins per-user series against a per-cycle fair-share model
#[derive(Debug, Clone, Copy)]
pub struct UsageAggregator {
    cycle_time_ms: u64,
    cluster_mem_gb: f64,
    sweeper: IntervalSweeper,
}

impl UsageAggregator {
    /// # Errors
    /// `InvalidParameter` when `cycle_time_ms` is zero or the capacity is
    /// negative or not finite.
    pub fn new(cycle_time_ms: u64, cluster_mem_gb: f64) -> Result<Self> {
        if cycle_time_ms == 0 {
            return Err(TraceError::InvalidParameter(
                "cycle_time_ms must be positive, got 0".to_string(),
            ));
        }
        if !cluster_mem_gb.is_finite() || cluster_mem_gb < 0.0 {
            return Err(TraceError::InvalidParameter(format!(
                "cluster_mem_gb must be a non-negative number, got {}",
                cluster_mem_gb
            )));
        }
        Ok(Self {
            cycle_time_ms,
            cluster_mem_gb,
            sweeper: IntervalSweeper::default(),
        })
    }

    pub fn with_sweeper(mut self, sweeper: IntervalSweeper) -> Self {
        self.sweeper = sweeper;
        self
    }

    pub fn cycle_time_ms(&self) -> u64 {
        self.cycle_time_ms
    }

    pub fn cluster_mem_gb(&self) -> f64 {
        self.cluster_mem_gb
    }

    /// Number of active users per cycle, as a step series over cycle indices
    ///
    /// A user is active in cycle `c` when one of its `[submit, end)` spans
    /// intersects `[c * cycle, (c + 1) * cycle)`. Spans are first merged per
    /// user, mapped to inclusive cycle ranges, and ranges sharing a cycle are
    /// fused so a user is counted once per cycle.
    pub fn active_users(&self, events: &EventTable) -> StepSeries {
        let presence = self.sweeper.sweep_by_key(
            events
                .iter()
                .map(|e| KeyedInterval::count(e.user.as_str(), e.submit_time_ms, e.end_time_ms))
                .collect(),
        );

        let cycle = self.cycle_time_ms;
        let mut ranges: Vec<(u64, u64, i64)> = Vec::new();
        for series in presence.values() {
            let mut current: Option<(u64, u64)> = None;
            let mut open_since: Option<u64> = None;
            for sample in series.samples() {
                match (open_since, sample.value > 0) {
                    (None, true) => open_since = Some(sample.time_ms),
                    (Some(lo), false) => {
                        open_since = None;
                        let (first, last) = (lo / cycle, (sample.time_ms - 1) / cycle);
                        current = match current {
                            Some((a, b)) if first <= b + 1 => Some((a, b.max(last))),
                            Some((a, b)) => {
                                ranges.push((a, b + 1, 1));
                                Some((first, last))
                            }
                            None => Some((first, last)),
                        };
                    }
                    _ => {}
                }
            }
            if let Some((a, b)) = current {
                ranges.push((a, b + 1, 1));
            }
        }

        IntervalSweeper::sweep(ranges)
    }

    /// Score every change point of every user's series
    pub fn aggregate(&self, events: &EventTable, series: &TraceSeries) -> UsageTable {
        let active = self.active_users(events);
        let empty = StepSeries::default();

        let users: Vec<&String> = series
            .running
            .keys()
            .chain(series.waiting.keys())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        let score_user = |user: &&String| -> (Vec<UsageRecord>, usize) {
            let running = series.running.get(*user).unwrap_or(&empty);
            let running_mem = series.running_mem.get(*user).unwrap_or(&empty);
            let waiting = series.waiting.get(*user).unwrap_or(&empty);
            self.score_user(user, running, running_mem, waiting, &active)
        };

        let per_user: Vec<(Vec<UsageRecord>, usize)> = if self.sweeper.is_parallel() {
            users.par_iter().map(score_user).collect()
        } else {
            users.iter().map(score_user).collect()
        };

        let mut records = Vec::new();
        let mut dropped_samples = 0;
        for (user_records, dropped) in per_user {
            records.extend(user_records);
            dropped_samples += dropped;
        }

        if dropped_samples > 0 {
            debug!(dropped_samples, "dropped samples in cycles without active users");
        }
        info!(records = records.len(), users = users.len(), "aggregated usage");

        UsageTable {
            records,
            dropped_samples,
        }
    }

    fn score_user(
        &self,
        user: &str,
        running: &StepSeries,
        running_mem: &StepSeries,
        waiting: &StepSeries,
        active: &StepSeries,
    ) -> (Vec<UsageRecord>, usize) {
        let mut times: Vec<u64> = running
            .samples()
            .iter()
            .chain(waiting.samples())
            .map(|s| s.time_ms)
            .collect();
        times.sort_unstable();
        times.dedup();

        let mut records = Vec::with_capacity(times.len());
        let mut dropped = 0;
        for time_ms in times {
            let cycle = time_ms / self.cycle_time_ms;
            let active_users = active.value_at(cycle);
            if active_users <= 0 {
                dropped += 1;
                continue;
            }
            let fair_share_mem = self.cluster_mem_gb / active_users as f64;
            let running_mem = milli_to_gb(running_mem.value_at(time_ms));
            let waiting_jobs = waiting.value_at(time_ms);

            let fair_ratio = (fair_share_mem > 0.0)
                .then(|| (running_mem - fair_share_mem) / fair_share_mem);
            let starved_mem_gb = if waiting_jobs > 0 {
                (fair_share_mem - running_mem).max(0.0)
            } else {
                0.0
            };
            let starved_mem_log10 = (starved_mem_gb > 0.0).then(|| starved_mem_gb.log10());

            records.push(UsageRecord {
                user: user.to_string(),
                time_ms,
                cycle,
                running_jobs: running.value_at(time_ms),
                waiting_jobs,
                running_mem,
                fair_share_mem,
                fair_ratio,
                starved_mem_gb,
                starved_mem_log10,
            });
        }
        (records, dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::test_support::{job, table};

    fn aggregate(events: &EventTable, cycle: u64, capacity: f64) -> UsageTable {
        let sweeper = IntervalSweeper::new(false);
        let series = TraceSeries::build(events, sweeper);
        UsageAggregator::new(cycle, capacity)
            .unwrap()
            .with_sweeper(sweeper)
            .aggregate(events, &series)
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            UsageAggregator::new(0, 10.0),
            Err(TraceError::InvalidParameter(_))
        ));
        assert!(UsageAggregator::new(100, -1.0).is_err());
        assert!(UsageAggregator::new(100, f64::INFINITY).is_err());
        assert!(UsageAggregator::new(100, 0.0).is_ok());
    }

    #[test]
    fn test_active_users_per_cycle() {
        let events = table(vec![
            job("A", 4.0, 0, 0, 100),
            job("A", 4.0, 50, 100, 150),
            job("B", 8.0, 0, 0, 200),
        ]);
        let agg = UsageAggregator::new(100, 16.0)
            .unwrap()
            .with_sweeper(IntervalSweeper::new(false));
        let active = agg.active_users(&events);
        assert_eq!(active.value_at(0), 2);
        assert_eq!(active.value_at(1), 2);
        assert_eq!(active.value_at(2), 0);
    }

    #[test]
    fn test_user_counted_once_per_cycle() {
        // two disjoint spans inside the same cycle
        let events = table(vec![job("A", 1.0, 0, 0, 10), job("A", 1.0, 20, 20, 30)]);
        let agg = UsageAggregator::new(100, 1.0).unwrap();
        let active = agg.active_users(&events);
        assert_eq!(active.value_at(0), 1);
    }

    #[test]
    fn test_fair_share_and_starvation() {
        let events = table(vec![
            job("A", 4.0, 0, 0, 100),
            job("A", 4.0, 50, 100, 150),
            job("B", 8.0, 0, 0, 200),
        ]);
        let usage = aggregate(&events, 100, 16.0);

        let a: Vec<_> = usage.for_user("A").collect();
        let times: Vec<u64> = a.iter().map(|r| r.time_ms).collect();
        assert_eq!(times, vec![0, 50, 100, 150]);

        // t=50: A runs 4 GB with one job waiting, fair share 16/2 = 8
        let r = a[1];
        assert_eq!(r.cycle, 0);
        assert_eq!(r.running_jobs, 1);
        assert_eq!(r.waiting_jobs, 1);
        assert_eq!(r.fair_share_mem, 8.0);
        assert_eq!(r.fair_ratio, Some(-0.5));
        assert_eq!(r.starved_mem_gb, 4.0);
        assert!((r.starved_mem_log10.unwrap() - 4.0f64.log10()).abs() < 1e-12);

        // t=100: wait over, no starvation
        let r = a[2];
        assert_eq!(r.waiting_jobs, 0);
        assert_eq!(r.starved_mem_gb, 0.0);
        assert_eq!(r.starved_mem_log10, None);
    }

    #[test]
    fn test_samples_in_inactive_cycle_dropped() {
        // A's only job ends exactly at a cycle boundary; nobody is active in cycle 1
        let events = table(vec![job("A", 2.0, 0, 0, 100)]);
        let usage = aggregate(&events, 100, 10.0);
        assert_eq!(usage.len(), 1);
        assert_eq!(usage.records()[0].time_ms, 0);
        assert_eq!(usage.dropped_samples(), 1);
    }

    #[test]
    fn test_zero_capacity_has_no_ratio() {
        let events = table(vec![job("A", 0.0, 0, 10, 100)]);
        let usage = aggregate(&events, 1000, 0.0);
        assert!(!usage.is_empty());
        for r in usage.records() {
            assert_eq!(r.fair_ratio, None);
            assert_eq!(r.starved_mem_gb, 0.0);
            assert_eq!(r.starved_mem_log10, None);
        }
    }

    #[test]
    fn test_fair_share_recomputed_per_cycle() {
        // B only active in cycle 0, so A gets the full cluster in cycle 1
        let events = table(vec![
            job("A", 1.0, 0, 0, 150),
            job("A", 1.0, 120, 130, 190),
            job("B", 1.0, 0, 0, 50),
        ]);
        let usage = aggregate(&events, 100, 12.0);
        let a: Vec<_> = usage.for_user("A").collect();
        let at = |t: u64| a.iter().find(|r| r.time_ms == t).unwrap();
        assert_eq!(at(0).fair_share_mem, 6.0);
        assert_eq!(at(120).fair_share_mem, 12.0);
        assert_eq!(at(120).starved_mem_gb, 11.0);
    }

    #[test]
    fn test_never_nan() {
        let events = table(vec![
            job("A", 0.0, 0, 5, 10),
            job("B", 3.0, 0, 0, 10),
        ]);
        for capacity in [0.0, 1.0, 3.0] {
            let usage = aggregate(&events, 7, capacity);
            for r in usage.records() {
                assert!(!r.fair_share_mem.is_nan());
                assert!(r.fair_ratio.map_or(true, |v| v.is_finite()));
                assert!(r.starved_mem_log10.map_or(true, |v| v.is_finite()));
            }
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let events = table(
            (0..60u64)
                .map(|i| {
                    let user = ["A", "B", "C", "D"][(i % 4) as usize];
                    job(user, (i % 5) as f64, i * 7, i * 7 + i % 13, i * 7 + i % 13 + 40)
                })
                .collect(),
        );
        let series = TraceSeries::build(&events, IntervalSweeper::new(false));
        let seq = UsageAggregator::new(25, 32.0)
            .unwrap()
            .with_sweeper(IntervalSweeper::new(false))
            .aggregate(&events, &series);
        let par = UsageAggregator::new(25, 32.0)
            .unwrap()
            .with_sweeper(IntervalSweeper::new(true))
            .aggregate(&events, &series);
        assert_eq!(seq, par);
    }
}
