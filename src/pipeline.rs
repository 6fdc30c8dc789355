//! End-to-end analysis of one trace
//!
//! Runs normalize -> series -> usage -> scorecard once and keeps every
//! intermediate table, so callers can render any of them or issue snapshot
//! queries against the same events.

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::event::{milli_to_gb, EventTable};
use crate::normalize::{normalize, RawTable};
use crate::scorecard::{ScoreCard, ScoreCardBuilder};
use crate::series::{ConcurrencyTracker, TraceSeries};
use crate::snapshot::{PointInTimeAnalyzer, PointInTimeSnapshot};
use crate::sweep::IntervalSweeper;
use crate::usage::{UsageAggregator, UsageTable};
use tracing::info;

/// Every table produced for one trace
#[derive(Debug, Clone)]
pub struct Analysis {
    pub config: AnalysisConfig,
    /// Capacity actually used for fair share (explicit or inferred)
    pub cluster_mem_gb: f64,
    pub events: EventTable,
    pub series: TraceSeries,
    pub usage: UsageTable,
    pub scorecard: ScoreCard,
}

impl Analysis {
    /// Point-in-time query against the analyzed events
    pub fn snapshot_at(&self, t: f64) -> Result<PointInTimeSnapshot> {
        PointInTimeAnalyzer::new(&self.events).at(t)
    }
}

/// Cluster capacity for fair share: configured, or the observed peak
pub fn resolve_capacity(events: &EventTable, config: &AnalysisConfig) -> f64 {
    match config.cluster_mem_gb {
        Some(capacity) => capacity,
        None => {
            let inferred = milli_to_gb(ConcurrencyTracker::peak_running_mem(events));
            info!(cluster_mem_gb = inferred, "inferred cluster capacity from peak usage");
            inferred
        }
    }
}

/// Normalize a raw table and analyze it
pub fn analyze(raw: &RawTable, config: &AnalysisConfig) -> Result<Analysis> {
    config.validate()?;
    let events = normalize(raw, &config.columns)?;
    analyze_events(events, config)
}

/// Analyze an already-normalized event table
pub fn analyze_events(events: EventTable, config: &AnalysisConfig) -> Result<Analysis> {
    config.validate()?;
    let sweeper = IntervalSweeper::new(config.parallel);
    let cluster_mem_gb = resolve_capacity(&events, config);

    let series = TraceSeries::build(&events, sweeper);
    let usage = UsageAggregator::new(config.cycle_time_ms, cluster_mem_gb)?
        .with_sweeper(sweeper)
        .aggregate(&events, &series);
    let scorecard = ScoreCardBuilder::new(config.cycle_time_ms)?.build(&events, &series, &usage);

    info!(
        jobs = scorecard.job_count,
        users = scorecard.user_count,
        usage_records = usage.len(),
        "analysis complete"
    );

    Ok(Analysis {
        config: config.clone(),
        cluster_mem_gb,
        events,
        series,
        usage,
        scorecard,
    })
}
