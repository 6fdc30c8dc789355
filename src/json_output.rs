//! JSON output format for analysis tables
//!
//! Thin report envelopes around the library types so every document carries
//! the parameters it was computed with.

use crate::error::Result;
use crate::event::Event;
use crate::scorecard::ScoreCard;
use crate::series::{SeriesKind, UserSeries};
use crate::usage::UsageRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scorecard plus the capacity it was computed against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonScorecardReport {
    /// Trace file the run was read from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    pub cluster_mem_gb: f64,
    pub scorecard: ScoreCard,
}

/// Usage table with its fair-share parameters
#[derive(Debug, Clone, Serialize)]
pub struct JsonUsageReport<'a> {
    pub cycle_time_ms: u64,
    pub cluster_mem_gb: f64,
    pub dropped_samples: usize,
    pub records: &'a [UsageRecord],
}

/// A single change point, in reported units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JsonSample {
    pub time_ms: u64,
    pub value: f64,
}

/// Per-user series of one kind
#[derive(Debug, Clone, Serialize)]
pub struct JsonSeriesReport {
    pub series: SeriesKind,
    pub users: BTreeMap<String, Vec<JsonSample>>,
}

impl JsonSeriesReport {
    pub fn new(series: &UserSeries, kind: SeriesKind) -> Self {
        let users = series
            .iter()
            .map(|(user, steps)| {
                let samples = steps
                    .samples()
                    .iter()
                    .map(|s| JsonSample {
                        time_ms: s.time_ms,
                        value: kind.scale(s.value),
                    })
                    .collect();
                (user.clone(), samples)
            })
            .collect();
        Self {
            series: kind,
            users,
        }
    }
}

/// Canonical events with the trace horizon
#[derive(Debug, Clone, Serialize)]
pub struct JsonEventsReport<'a> {
    pub horizon_ms: u64,
    pub events: &'a [Event],
}

/// Pretty-printed JSON for any serializable report
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
