//! Trace file ingestion
//!
//! Reads a headered CSV into a `RawTable`. All cells stay strings here;
//! typing and validation belong to the normalizer.

use crate::error::Result;
use crate::normalize::RawTable;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Read a trace CSV from disk
pub fn read_raw_table(path: &Path) -> Result<RawTable> {
    let file = File::open(path)?;
    let table = read_raw_table_from_reader(file)?;
    debug!(path = %path.display(), rows = table.rows.len(), "read trace file");
    Ok(table)
}

/// Read a trace CSV from any reader
///
/// Rows must have as many fields as the header; ragged rows are a CSV error.
pub fn read_raw_table_from_reader<R: Read>(reader: R) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in rdr.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }

    Ok(RawTable::new(headers, rows))
}
