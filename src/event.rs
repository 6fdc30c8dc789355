//! Canonical job events
//!
//! An `Event` is one simulated job after normalization. All timestamps are
//! milliseconds since trace start and satisfy `submit <= start <= end`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Memory is aggregated in thousandths of a GB so sums stay exact and do not
/// depend on summation order.
pub const MILLI_GB: f64 = 1000.0;

/// Convert an aggregated milli-GB amount back to GB
pub fn milli_to_gb(milli: i64) -> f64 {
    milli as f64 / MILLI_GB
}

/// Where a job was when the simulation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Started and finished inside the trace
    Completed,
    /// Started but still running at the horizon (end closed at horizon)
    Running,
    /// Never started (start and end closed at horizon)
    Pending,
}

impl JobState {
    /// Whether the job was ever placed on a host
    pub fn started(self) -> bool {
        !matches!(self, JobState::Pending)
    }
}

/// One job from the scheduler trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub job_id: String,
    pub user: String,
    pub host: String,
    /// Memory footprint (GB)
    pub mem: f64,
    pub submit_time_ms: u64,
    pub start_time_ms: u64,
    pub end_time_ms: u64,
    /// Scheduling delay: `start_time_ms - submit_time_ms`
    pub overhead_ms: u64,
    pub state: JobState,
}

impl Event {
    /// Memory footprint in milli-GB
    pub fn mem_milli(&self) -> i64 {
        (self.mem * MILLI_GB).round() as i64
    }

    /// Waiting interval `[submit, start)`
    pub fn wait_interval(&self) -> (u64, u64) {
        (self.submit_time_ms, self.start_time_ms)
    }

    /// Running interval `[start, end)`
    pub fn run_interval(&self) -> (u64, u64) {
        (self.start_time_ms, self.end_time_ms)
    }

    /// Job is waiting at `t` (`submit <= t < start`)
    pub fn is_waiting_at(&self, t: f64) -> bool {
        self.submit_time_ms as f64 <= t && t < self.start_time_ms as f64
    }

    /// Job is running at `t` (`start <= t < end`)
    pub fn is_running_at(&self, t: f64) -> bool {
        self.start_time_ms as f64 <= t && t < self.end_time_ms as f64
    }
}

/// Validated, deterministically ordered event table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTable {
    events: Vec<Event>,
    horizon_ms: u64,
}

impl EventTable {
    /// Build a table from already-validated events, sorting them canonically
    pub(crate) fn from_events(mut events: Vec<Event>, horizon_ms: u64) -> Self {
        events.sort_by(|a, b| {
            a.start_time_ms
                .cmp(&b.start_time_ms)
                .then(a.submit_time_ms.cmp(&b.submit_time_ms))
                .then(a.end_time_ms.cmp(&b.end_time_ms))
                .then_with(|| a.user.cmp(&b.user))
                .then_with(|| a.host.cmp(&b.host))
                .then_with(|| a.job_id.cmp(&b.job_id))
                .then(a.mem.total_cmp(&b.mem))
        });
        Self { events, horizon_ms }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Largest timestamp present in the trace
    pub fn horizon_ms(&self) -> u64 {
        self.horizon_ms
    }

    /// Earliest submission time, if any
    pub fn first_submit_ms(&self) -> Option<u64> {
        self.events.iter().map(|e| e.submit_time_ms).min()
    }

    /// Latest end time, if any
    pub fn last_end_ms(&self) -> Option<u64> {
        self.events.iter().map(|e| e.end_time_ms).max()
    }

    /// Distinct users in sorted order
    pub fn users(&self) -> BTreeSet<&str> {
        self.events.iter().map(|e| e.user.as_str()).collect()
    }

    /// Distinct hosts in sorted order
    pub fn hosts(&self) -> BTreeSet<&str> {
        self.events.iter().map(|e| e.host.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a EventTable {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Completed job with `host = "h1"` and a generated id
    pub fn job(user: &str, mem: f64, submit: u64, start: u64, end: u64) -> Event {
        Event {
            job_id: format!("{}-{}-{}", user, submit, start),
            user: user.to_string(),
            host: "h1".to_string(),
            mem,
            submit_time_ms: submit,
            start_time_ms: start,
            end_time_ms: end,
            overhead_ms: start - submit,
            state: JobState::Completed,
        }
    }

    pub fn table(events: Vec<Event>) -> EventTable {
        let horizon = events.iter().map(|e| e.end_time_ms).max().unwrap_or(0);
        EventTable::from_events(events, horizon)
    }
}
