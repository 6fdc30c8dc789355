//! Single-run scorecard and cross-run comparison
//!
//! Reduces a run's tables to one record so two scheduling policies can be
//! compared metric by metric.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | completion_rate | completed jobs / all jobs |
//! | makespan_ms | last end - first submit |
//! | overhead_cycles_* | (start - submit) / cycle_time_ms over started jobs |
//! | concurrency_median | time-weighted median of per-user running jobs |
//! | starvation_* | over usage records with a positive deficit |
//! | fair_ratio_median | over usage records with a defined ratio |

use crate::error::{Result, TraceError};
use crate::event::{EventTable, JobState};
use crate::series::TraceSeries;
use crate::stats::{median, time_weighted_mean, time_weighted_median, Summary};
use crate::usage::UsageTable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate metrics for one scheduler run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub cycle_time_ms: u64,
    pub job_count: usize,
    pub completed_jobs: usize,
    /// Fraction of jobs completing inside the trace (0.0..1.0)
    pub completion_rate: f64,
    pub user_count: usize,
    pub host_count: usize,
    pub makespan_ms: u64,
    pub overhead_cycles_median: f64,
    pub overhead_cycles_mean: f64,
    pub overhead_cycles_p95: f64,
    pub concurrency_median: f64,
    pub concurrency_mean: f64,
    pub concurrency_peak: i64,
    pub starvation_total_gb: f64,
    pub starvation_median_gb: f64,
    pub starvation_median_log10: Option<f64>,
    pub starved_records: usize,
    pub fair_ratio_median: Option<f64>,
}

impl ScoreCard {
    /// Comparable metrics in report order
    pub fn metrics(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("job_count", Some(self.job_count as f64)),
            ("completed_jobs", Some(self.completed_jobs as f64)),
            ("completion_rate", Some(self.completion_rate)),
            ("makespan_ms", Some(self.makespan_ms as f64)),
            ("overhead_cycles_median", Some(self.overhead_cycles_median)),
            ("overhead_cycles_mean", Some(self.overhead_cycles_mean)),
            ("overhead_cycles_p95", Some(self.overhead_cycles_p95)),
            ("concurrency_median", Some(self.concurrency_median)),
            ("concurrency_mean", Some(self.concurrency_mean)),
            ("concurrency_peak", Some(self.concurrency_peak as f64)),
            ("starvation_total_gb", Some(self.starvation_total_gb)),
            ("starvation_median_gb", Some(self.starvation_median_gb)),
            ("starvation_median_log10", self.starvation_median_log10),
            ("fair_ratio_median", self.fair_ratio_median),
        ]
    }

    /// Compare a baseline run `a` against a candidate run `b`
    ///
    /// # Example
    /// ```ignore
    /// let comparison = ScoreCard::compare(&baseline, &candidate);
    /// for delta in &comparison.deltas {
    ///     println!("{}: {:?}", delta.metric, delta.relative);
    /// }
    /// ```
    pub fn compare(a: &ScoreCard, b: &ScoreCard) -> RunComparison {
        let deltas = a
            .metrics()
            .into_iter()
            .zip(b.metrics())
            .map(|((metric, baseline), (_, candidate))| MetricDelta {
                metric: metric.to_string(),
                baseline,
                candidate,
                relative: relative_change(baseline, candidate),
            })
            .collect();
        RunComparison { deltas }
    }
}

/// `(b - a) / a`, undefined when either side is missing or `a` is zero
pub fn relative_change(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) if a != 0.0 => Some((b - a) / a),
        _ => None,
    }
}

impl fmt::Display for ScoreCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Run Scorecard (cycle = {} ms) ===", self.cycle_time_ms)?;
        writeln!(
            f,
            "Jobs:              {} ({} completed, {:.1}%)",
            self.job_count,
            self.completed_jobs,
            self.completion_rate * 100.0
        )?;
        writeln!(f, "Users / hosts:     {} / {}", self.user_count, self.host_count)?;
        writeln!(f, "Makespan:          {} ms", self.makespan_ms)?;
        writeln!(
            f,
            "Overhead (cycles): median {:.3}, mean {:.3}, p95 {:.3}",
            self.overhead_cycles_median, self.overhead_cycles_mean, self.overhead_cycles_p95
        )?;
        writeln!(
            f,
            "Concurrency:       median {:.2}, mean {:.2}, peak {}",
            self.concurrency_median, self.concurrency_mean, self.concurrency_peak
        )?;
        writeln!(
            f,
            "Starvation:        total {:.3} GB, median {:.3} GB over {} records",
            self.starvation_total_gb, self.starvation_median_gb, self.starved_records
        )?;
        match self.starvation_median_log10 {
            Some(v) => writeln!(f, "Starvation log10:  median {:.3}", v)?,
            None => writeln!(f, "Starvation log10:  -")?,
        }
        match self.fair_ratio_median {
            Some(v) => write!(f, "Fair ratio:        median {:.3}", v),
            None => write!(f, "Fair ratio:        -"),
        }
    }
}

/// One metric across two runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub metric: String,
    pub baseline: Option<f64>,
    pub candidate: Option<f64>,
    /// `(candidate - baseline) / baseline`
    pub relative: Option<f64>,
}

/// Per-metric comparison of two scorecards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunComparison {
    pub deltas: Vec<MetricDelta>,
}

impl RunComparison {
    pub fn get(&self, metric: &str) -> Option<&MetricDelta> {
        self.deltas.iter().find(|d| d.metric == metric)
    }
}

impl fmt::Display for RunComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v));
        writeln!(
            f,
            "{:<24} {:>14} {:>14} {:>10}",
            "metric", "baseline", "candidate", "change"
        )?;
        writeln!(f, "{}", "-".repeat(65))?;
        for d in &self.deltas {
            let change = d
                .relative
                .map_or_else(|| "-".to_string(), |r| format!("{:+.1}%", r * 100.0));
            writeln!(
                f,
                "{:<24} {:>14} {:>14} {:>10}",
                d.metric,
                cell(d.baseline),
                cell(d.candidate),
                change
            )?;
        }
        Ok(())
    }
}

/// Builds a `ScoreCard` from the outputs of one analysis
#[derive(Debug, Clone, Copy)]
pub struct ScoreCardBuilder {
    cycle_time_ms: u64,
}

impl ScoreCardBuilder {
    pub fn new(cycle_time_ms: u64) -> Result<Self> {
        if cycle_time_ms == 0 {
            return Err(TraceError::InvalidParameter(
                "cycle_time_ms must be positive, got 0".to_string(),
            ));
        }
        Ok(Self { cycle_time_ms })
    }

    /// Reduce events, series and usage records to a scorecard
    pub fn build(&self, events: &EventTable, series: &TraceSeries, usage: &UsageTable) -> ScoreCard {
        let job_count = events.len();
        let completed_jobs = events
            .iter()
            .filter(|e| e.state == JobState::Completed)
            .count();
        let completion_rate = if job_count == 0 {
            0.0
        } else {
            completed_jobs as f64 / job_count as f64
        };

        let makespan_ms = match (events.first_submit_ms(), events.last_end_ms()) {
            (Some(first), Some(last)) => last.saturating_sub(first),
            _ => 0,
        };

        let cycle = self.cycle_time_ms as f64;
        let overheads: Vec<f64> = events
            .iter()
            .filter(|e| e.state.started())
            .map(|e| e.overhead_ms as f64 / cycle)
            .collect();
        let overhead = Summary::of(&overheads);

        let segments: Vec<(f64, u64)> = series
            .running
            .values()
            .flat_map(|s| s.segments().map(|(v, d)| (v as f64, d)))
            .collect();
        let concurrency_peak = series.running.values().map(|s| s.peak()).max().unwrap_or(0);

        let starved: Vec<f64> = usage.starved().map(|r| r.starved_mem_gb).collect();
        let starved_log10: Vec<f64> = usage.starved().filter_map(|r| r.starved_mem_log10).collect();
        let ratios: Vec<f64> = usage.records().iter().filter_map(|r| r.fair_ratio).collect();

        ScoreCard {
            cycle_time_ms: self.cycle_time_ms,
            job_count,
            completed_jobs,
            completion_rate,
            user_count: events.users().len(),
            host_count: events.hosts().len(),
            makespan_ms,
            overhead_cycles_median: overhead.median,
            overhead_cycles_mean: overhead.mean,
            overhead_cycles_p95: overhead.p95,
            concurrency_median: time_weighted_median(&segments),
            concurrency_mean: time_weighted_mean(&segments),
            concurrency_peak,
            starvation_total_gb: starved.iter().fold(0.0, |acc, v| acc + v),
            starvation_median_gb: median(&starved),
            starvation_median_log10: (!starved_log10.is_empty()).then(|| median(&starved_log10)),
            starved_records: starved.len(),
            fair_ratio_median: (!ratios.is_empty()).then(|| median(&ratios)),
        }
    }
}
