//! simtrace - Fairness, concurrency and starvation analytics for cluster-scheduler traces
//!
//! This library turns the job log of a scheduler simulation into per-user
//! step-function series, fair-share usage records, a run scorecard and
//! point-in-time snapshots, so scheduling policies can be compared on the
//! same workload.
//!
//! # Example
//! ```
//! use simtrace::config::AnalysisConfig;
//! use simtrace::pipeline::analyze;
//! use simtrace::trace_io::read_raw_table_from_reader;
//!
//! let csv = "user,host,mem,submit_time_ms,start_time_ms,end_time_ms\n\
//!            A,h1,4,0,0,100\n\
//!            A,h1,4,50,100,150\n\
//!            B,h2,8,0,0,200\n";
//! let raw = read_raw_table_from_reader(csv.as_bytes()).unwrap();
//! let analysis = analyze(&raw, &AnalysisConfig::default()).unwrap();
//! assert_eq!(analysis.scorecard.job_count, 3);
//! assert_eq!(analysis.series.waiting["A"].value_at(60), 1);
//! ```

pub mod cli;
pub mod config;
pub mod csv_output;
pub mod error;
pub mod event;
pub mod json_output;
pub mod normalize;
pub mod pipeline;
pub mod scorecard;
pub mod series;
pub mod snapshot;
pub mod stats;
pub mod sweep;
pub mod trace_io;
pub mod usage;

pub use error::{Result, TraceError};
