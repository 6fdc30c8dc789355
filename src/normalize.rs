//! Trace normalization: raw rows to canonical events
//!
//! Validation is all-or-nothing. A missing column or a single bad row fails
//! the whole trace, since silently dropping jobs would skew every fairness
//! metric computed downstream.

use crate::config::ColumnMapping;
use crate::error::{Result, TraceError};
use crate::event::{Event, EventTable, JobState};
use tracing::{debug, info};

/// Largest accepted per-job footprint; keeps milli-GB sums inside `i64`
const MAX_MEM_GB: f64 = 1e9;

/// Timestamps beyond 2^53 ms are not exactly representable when read as f64
const MAX_TIME_MS: f64 = 9_007_199_254_740_992.0;

/// A header row plus string cells, as read from the trace file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }
}

/// Resolved positions of the logical columns inside a `RawTable`
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    job_id: Option<usize>,
    user: usize,
    host: usize,
    mem: usize,
    submit: usize,
    start: usize,
    end: usize,
}

impl ColumnIndex {
    fn resolve(headers: &[String], mapping: &ColumnMapping) -> Result<Self> {
        let mut missing = Vec::new();
        let mut required = |name: &str, aliases: &[String]| {
            let idx = ColumnMapping::resolve(aliases, headers);
            if idx.is_none() {
                missing.push(name.to_string());
            }
            idx.unwrap_or(usize::MAX)
        };

        let user = required("user", &mapping.user);
        let host = required("host", &mapping.host);
        let mem = required("mem", &mapping.mem);
        let submit = required("submit_time_ms", &mapping.submit_time_ms);
        let start = required("start_time_ms", &mapping.start_time_ms);
        let end = required("end_time_ms", &mapping.end_time_ms);

        if !missing.is_empty() {
            return Err(TraceError::Schema { missing });
        }

        Ok(Self {
            job_id: ColumnMapping::resolve(&mapping.job_id, headers),
            user,
            host,
            mem,
            submit,
            start,
            end,
        })
    }
}

/// A row that parsed cleanly but may still have open start/end times
struct ParsedRow {
    job_id: String,
    user: String,
    host: String,
    mem: f64,
    submit: u64,
    start: Option<u64>,
    end: Option<u64>,
}

fn parse_time(raw: &str, row: usize, column: &str) -> Result<Option<u64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| TraceError::integrity(row, format!("{} is not a number: {:?}", column, raw)))?;
    if !value.is_finite() || value < 0.0 || value > MAX_TIME_MS {
        return Err(TraceError::integrity(
            row,
            format!("{} must be a non-negative finite time, got {}", column, raw),
        ));
    }
    Ok(Some(value.round() as u64))
}

fn parse_row(cells: &[String], cols: &ColumnIndex, row: usize) -> Result<ParsedRow> {
    let cell = |idx: usize| cells.get(idx).map(|s| s.trim()).unwrap_or("");

    let user = cell(cols.user);
    if user.is_empty() {
        return Err(TraceError::integrity(row, "user is empty"));
    }

    let mem_raw = cell(cols.mem);
    let mem: f64 = mem_raw
        .parse()
        .map_err(|_| TraceError::integrity(row, format!("mem is not a number: {:?}", mem_raw)))?;
    if !mem.is_finite() || mem < 0.0 {
        return Err(TraceError::integrity(
            row,
            format!("mem must be non-negative, got {}", mem_raw),
        ));
    }
    if mem > MAX_MEM_GB {
        return Err(TraceError::integrity(
            row,
            format!("mem exceeds {} GB, got {}", MAX_MEM_GB, mem_raw),
        ));
    }

    let submit = parse_time(cell(cols.submit), row, "submit_time_ms")?
        .ok_or_else(|| TraceError::integrity(row, "submit_time_ms is empty"))?;
    let start = parse_time(cell(cols.start), row, "start_time_ms")?;
    let end = parse_time(cell(cols.end), row, "end_time_ms")?;

    match (start, end) {
        (None, Some(_)) => {
            return Err(TraceError::integrity(
                row,
                "end_time_ms present without start_time_ms",
            ))
        }
        (Some(start), _) if submit > start => {
            return Err(TraceError::integrity(
                row,
                format!("submit_time_ms ({}) > start_time_ms ({})", submit, start),
            ))
        }
        (Some(start), Some(end)) if start > end => {
            return Err(TraceError::integrity(
                row,
                format!("start_time_ms ({}) > end_time_ms ({})", start, end),
            ))
        }
        _ => {}
    }

    let job_id = cols
        .job_id
        .map(cell)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("row-{}", row));

    Ok(ParsedRow {
        job_id,
        user: user.to_string(),
        host: cell(cols.host).to_string(),
        mem,
        submit,
        start,
        end,
    })
}

/// Validate raw rows and produce the canonical event table
///
/// Rows with an empty `start_time_ms` are jobs still pending when the
/// simulation stopped; rows with an empty `end_time_ms` are still running.
/// Both are closed at the trace horizon (the largest timestamp present).
///
/// # Errors
/// - `Schema` if any required column is missing (all missing names listed)
/// - `EmptyInput` if the table has no data rows
/// - `DataIntegrity` on the first row violating `submit <= start <= end`,
///   carrying negative/unparsable memory, or unparsable times
///
/// # Example
/// ```
/// use simtrace::config::ColumnMapping;
/// use simtrace::normalize::{normalize, RawTable};
///
/// let headers = ["user", "host", "mem", "submit_time_ms", "start_time_ms", "end_time_ms"]
///     .iter().map(|s| s.to_string()).collect();
/// let rows = vec![["A", "h1", "4", "0", "10", "100"].iter().map(|s| s.to_string()).collect()];
///
/// let table = normalize(&RawTable::new(headers, rows), &ColumnMapping::default()).unwrap();
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.events()[0].overhead_ms, 10);
/// ```
pub fn normalize(raw: &RawTable, mapping: &ColumnMapping) -> Result<EventTable> {
    let cols = ColumnIndex::resolve(&raw.headers, mapping)?;

    if raw.rows.is_empty() {
        return Err(TraceError::EmptyInput);
    }

    let parsed = raw
        .rows
        .iter()
        .enumerate()
        .map(|(i, cells)| parse_row(cells, &cols, i + 1))
        .collect::<Result<Vec<_>>>()?;

    let horizon_ms = parsed
        .iter()
        .flat_map(|p| [Some(p.submit), p.start, p.end])
        .flatten()
        .max()
        .unwrap_or(0);

    let mut open_jobs = 0usize;
    let events: Vec<Event> = parsed
        .into_iter()
        .map(|p| {
            let (start, end, state) = match (p.start, p.end) {
                (Some(start), Some(end)) => (start, end, JobState::Completed),
                (Some(start), None) => (start, horizon_ms, JobState::Running),
                _ => (horizon_ms, horizon_ms, JobState::Pending),
            };
            if state != JobState::Completed {
                open_jobs += 1;
            }
            Event {
                job_id: p.job_id,
                user: p.user,
                host: p.host,
                mem: p.mem,
                submit_time_ms: p.submit,
                start_time_ms: start,
                end_time_ms: end,
                overhead_ms: start - p.submit,
                state,
            }
        })
        .collect();

    debug!(
        open_jobs,
        horizon_ms, "closed in-flight jobs at trace horizon"
    );
    info!(events = events.len(), "normalized trace");

    Ok(EventTable::from_events(events, horizon_ms))
}
