//! Point-in-time system state
//!
//! Answers "what was running and waiting at T" straight from the event
//! table, without building any time series. A query outside the trace range
//! is a normal, empty snapshot.

use crate::error::{Result, TraceError};
use crate::event::{milli_to_gb, Event, EventTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Cluster state at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointInTimeSnapshot {
    pub time_ms: f64,
    /// Host to GB in use by running jobs
    pub per_host: BTreeMap<String, f64>,
    /// User to GB in use by running jobs
    pub per_user: BTreeMap<String, f64>,
    /// Jobs with `submit <= T < start`
    pub waiting: Vec<Event>,
    /// Jobs with `start <= T < end`
    pub running: Vec<Event>,
}

impl PointInTimeSnapshot {
    /// Total memory in use (GB)
    pub fn running_mem_gb(&self) -> f64 {
        milli_to_gb(self.running.iter().map(Event::mem_milli).sum())
    }

    /// Running job count per user
    pub fn running_jobs_by_user(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.running {
            *counts.entry(e.user.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Waiting job count per user
    pub fn waiting_jobs_by_user(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.waiting {
            *counts.entry(e.user.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Nothing running and nothing waiting
    pub fn is_idle(&self) -> bool {
        self.running.is_empty() && self.waiting.is_empty()
    }
}

/// Snapshot queries over one event table
#[derive(Debug, Clone, Copy)]
pub struct PointInTimeAnalyzer<'a> {
    events: &'a EventTable,
}

impl<'a> PointInTimeAnalyzer<'a> {
    pub fn new(events: &'a EventTable) -> Self {
        Self { events }
    }

    /// Snapshot at `t` milliseconds
    ///
    /// # Errors
    /// `InvalidParameter` when `t` is negative, NaN or infinite.
    pub fn at(&self, t: f64) -> Result<PointInTimeSnapshot> {
        if !t.is_finite() || t < 0.0 {
            return Err(TraceError::InvalidParameter(format!(
                "query time must be a non-negative finite number of ms, got {}",
                t
            )));
        }
        Ok(self.snapshot(t))
    }

    /// Snapshot at an integer millisecond
    pub fn at_ms(&self, t: u64) -> PointInTimeSnapshot {
        self.snapshot(t as f64)
    }

    fn snapshot(&self, t: f64) -> PointInTimeSnapshot {
        let mut waiting = Vec::new();
        let mut running = Vec::new();
        for e in self.events {
            if e.is_waiting_at(t) {
                waiting.push(e.clone());
            } else if e.is_running_at(t) {
                running.push(e.clone());
            }
        }

        let mut host_milli: BTreeMap<&str, i64> = BTreeMap::new();
        let mut user_milli: BTreeMap<&str, i64> = BTreeMap::new();
        for e in &running {
            *host_milli.entry(e.host.as_str()).or_default() += e.mem_milli();
            *user_milli.entry(e.user.as_str()).or_default() += e.mem_milli();
        }
        let to_gb = |m: BTreeMap<&str, i64>| -> BTreeMap<String, f64> {
            m.into_iter()
                .map(|(k, v)| (k.to_string(), milli_to_gb(v)))
                .collect()
        };
        let per_host = to_gb(host_milli);
        let per_user = to_gb(user_milli);

        debug!(
            time_ms = t,
            running = running.len(),
            waiting = waiting.len(),
            "point-in-time snapshot"
        );

        PointInTimeSnapshot {
            time_ms: t,
            per_host,
            per_user,
            waiting,
            running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::test_support::{job, table};

    fn scenario() -> EventTable {
        let mut b = job("B", 8.0, 0, 0, 200);
        b.host = "h2".to_string();
        table(vec![
            job("A", 4.0, 0, 0, 100),
            job("A", 4.0, 50, 100, 150),
            b,
        ])
    }

    #[test]
    fn test_snapshot_mid_trace() {
        let events = scenario();
        let snap = PointInTimeAnalyzer::new(&events).at(60.0).unwrap();
        assert_eq!(snap.running.len(), 2);
        assert_eq!(snap.per_user["A"], 4.0);
        assert_eq!(snap.per_user["B"], 8.0);
        assert_eq!(snap.per_host["h1"], 4.0);
        assert_eq!(snap.per_host["h2"], 8.0);
        assert_eq!(snap.running_mem_gb(), 12.0);
        // A's second job was submitted at 50 and is still queued
        assert_eq!(snap.waiting.len(), 1);
        assert_eq!(snap.waiting[0].user, "A");
    }

    #[test]
    fn test_snapshot_at_boundary_is_half_open() {
        let events = scenario();
        let snap = PointInTimeAnalyzer::new(&events).at_ms(100);
        // first A job ended at 100, second started at 100
        let a_jobs: Vec<_> = snap.running.iter().filter(|e| e.user == "A").collect();
        assert_eq!(a_jobs.len(), 1);
        assert_eq!(a_jobs[0].start_time_ms, 100);
        assert!(snap.waiting.is_empty());
    }

    #[test]
    fn test_snapshot_before_trace_is_empty() {
        let events = table(vec![job("A", 4.0, 10, 20, 30)]);
        let snap = PointInTimeAnalyzer::new(&events).at(5.0).unwrap();
        assert!(snap.is_idle());
        assert!(snap.per_host.is_empty());
        assert!(snap.per_user.is_empty());
        assert_eq!(snap.running_mem_gb(), 0.0);
    }

    #[test]
    fn test_snapshot_after_trace_is_empty() {
        let events = scenario();
        let snap = PointInTimeAnalyzer::new(&events).at(1.0e9).unwrap();
        assert!(snap.is_idle());
        assert!(snap.per_user.is_empty());
    }

    #[test]
    fn test_fractional_query_time() {
        let events = table(vec![job("A", 1.0, 10, 20, 30)]);
        let analyzer = PointInTimeAnalyzer::new(&events);
        assert_eq!(analyzer.at(19.5).unwrap().waiting.len(), 1);
        assert_eq!(analyzer.at(29.999).unwrap().running.len(), 1);
    }

    #[test]
    fn test_invalid_query_time() {
        let events = scenario();
        let analyzer = PointInTimeAnalyzer::new(&events);
        assert!(matches!(
            analyzer.at(-1.0),
            Err(TraceError::InvalidParameter(_))
        ));
        assert!(analyzer.at(f64::NAN).is_err());
        assert!(analyzer.at(f64::INFINITY).is_err());
    }

    #[test]
    fn test_job_counts_by_user() {
        let events = table(vec![
            job("A", 1.0, 0, 0, 10),
            job("A", 1.0, 0, 0, 10),
            job("B", 1.0, 0, 5, 10),
        ]);
        let snap = PointInTimeAnalyzer::new(&events).at_ms(2);
        assert_eq!(snap.running_jobs_by_user()["A"], 2);
        assert_eq!(snap.waiting_jobs_by_user()["B"], 1);
    }
}
