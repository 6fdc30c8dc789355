//! CSV output for analysis tables
//!
//! One writer per table, each emitting a header row followed by one row per
//! record. Undefined metrics (`None`) are written as empty cells. Tables
//! serialized straight from their record type only get a header when they
//! have at least one row.

use crate::error::Result;
use crate::event::EventTable;
use crate::scorecard::{RunComparison, ScoreCard};
use crate::series::{SeriesKind, UserSeries};
use crate::snapshot::PointInTimeSnapshot;
use crate::usage::{UsageRecord, UsageTable};
use csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::io::Write;

/// One change point of a per-user series
#[derive(Debug, Serialize)]
struct SeriesRow<'a> {
    user: &'a str,
    series: &'static str,
    time_ms: u64,
    value: f64,
}

/// One line of a snapshot: an aggregate or a job
#[derive(Debug, Serialize)]
struct SnapshotRow<'a> {
    time_ms: f64,
    scope: &'static str,
    name: &'a str,
    user: Option<&'a str>,
    mem_gb: f64,
}

fn finish<W: Write>(mut writer: Writer<W>) -> Result<()> {
    writer.flush()?;
    Ok(())
}

/// Canonical event table
pub fn write_events<W: Write>(events: &EventTable, out: W) -> Result<()> {
    let mut writer = Writer::from_writer(out);
    for event in events {
        writer.serialize(event)?;
    }
    finish(writer)
}

/// Per-user series as `user,series,time_ms,value` rows
pub fn write_series<W: Write>(series: &UserSeries, kind: SeriesKind, out: W) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(["user", "series", "time_ms", "value"])?;
    for (user, steps) in series {
        for sample in steps.samples() {
            writer.serialize(SeriesRow {
                user,
                series: kind.name(),
                time_ms: sample.time_ms,
                value: kind.scale(sample.value),
            })?;
        }
    }
    finish(writer)
}

/// Usage table
pub fn write_usage<W: Write>(usage: &UsageTable, out: W) -> Result<()> {
    write_usage_records(usage.records(), out)
}

/// A selection of usage records (e.g. only starved ones)
pub fn write_usage_records<W: Write>(records: &[UsageRecord], out: W) -> Result<()> {
    let mut writer = Writer::from_writer(out);
    for record in records {
        writer.serialize(record)?;
    }
    finish(writer)
}

/// Single scorecard row
pub fn write_scorecard<W: Write>(card: &ScoreCard, out: W) -> Result<()> {
    let mut writer = Writer::from_writer(out);
    writer.serialize(card)?;
    finish(writer)
}

/// Per-metric comparison rows
pub fn write_comparison<W: Write>(comparison: &RunComparison, out: W) -> Result<()> {
    let mut writer = Writer::from_writer(out);
    for delta in &comparison.deltas {
        writer.serialize(delta)?;
    }
    finish(writer)
}

/// Snapshot aggregates followed by waiting and running jobs
pub fn write_snapshot<W: Write>(snapshot: &PointInTimeSnapshot, out: W) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(["time_ms", "scope", "name", "user", "mem_gb"])?;
    let t = snapshot.time_ms;
    for (host, mem_gb) in &snapshot.per_host {
        writer.serialize(SnapshotRow {
            time_ms: t,
            scope: "host",
            name: host,
            user: None,
            mem_gb: *mem_gb,
        })?;
    }
    for (user, mem_gb) in &snapshot.per_user {
        writer.serialize(SnapshotRow {
            time_ms: t,
            scope: "user",
            name: user,
            user: Some(user),
            mem_gb: *mem_gb,
        })?;
    }
    for (scope, jobs) in [("waiting", &snapshot.waiting), ("running", &snapshot.running)] {
        for job in jobs {
            writer.serialize(SnapshotRow {
                time_ms: t,
                scope,
                name: &job.job_id,
                user: Some(&job.user),
                mem_gb: job.mem,
            })?;
        }
    }
    finish(writer)
}
