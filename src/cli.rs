//! CLI argument parsing for simtrace

use crate::series::SeriesKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for analysis tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "simtrace")]
#[command(version)]
#[command(
    about = "Fairness, concurrency and starvation analytics for cluster-scheduler simulator traces",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Analysis config file (TOML)
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Scheduling cycle length in milliseconds (overrides config)
    #[arg(long = "cycle-time-ms", value_name = "MS", global = true)]
    pub cycle_time_ms: Option<u64>,

    /// Cluster memory capacity in GB (overrides config; inferred when unset)
    #[arg(long = "cluster-mem-gb", value_name = "GB", global = true)]
    pub cluster_mem_gb: Option<f64>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Run per-user sweeps on a single thread
    #[arg(long = "sequential", global = true)]
    pub sequential: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the canonical event table
    Events {
        /// Trace CSV file
        trace: PathBuf,
    },
    /// Print per-user step series
    Series {
        /// Trace CSV file
        trace: PathBuf,
        /// Which series to print
        #[arg(long = "kind", value_enum, default_value = "running")]
        kind: SeriesKind,
        /// Restrict output to one user
        #[arg(long = "user", value_name = "USER")]
        user: Option<String>,
    },
    /// Print per-(user, cycle) fair-share and starvation records
    Usage {
        /// Trace CSV file
        trace: PathBuf,
        /// Only print records with a positive starvation deficit
        #[arg(long = "starved-only")]
        starved_only: bool,
    },
    /// Print the run scorecard
    Scorecard {
        /// Trace CSV file
        trace: PathBuf,
    },
    /// Print the cluster state at one instant
    Snapshot {
        /// Trace CSV file
        trace: PathBuf,
        /// Query time in milliseconds
        #[arg(long = "at", value_name = "T", allow_negative_numbers = true)]
        at: f64,
    },
    /// Compare the scorecards of two runs
    Compare {
        /// Baseline trace CSV file
        baseline: PathBuf,
        /// Candidate trace CSV file
        candidate: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_scorecard() {
        let cli = Cli::parse_from(["simtrace", "scorecard", "run.csv"]);
        assert_eq!(
            cli.command,
            Command::Scorecard {
                trace: PathBuf::from("run.csv")
            }
        );
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(!cli.sequential);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "simtrace",
            "usage",
            "run.csv",
            "--cycle-time-ms",
            "250",
            "--cluster-mem-gb",
            "64",
            "--format",
            "csv",
        ]);
        assert_eq!(cli.cycle_time_ms, Some(250));
        assert_eq!(cli.cluster_mem_gb, Some(64.0));
        assert_eq!(cli.format, OutputFormat::Csv);
    }

    #[test]
    fn test_cli_series_kind_default() {
        let cli = Cli::parse_from(["simtrace", "series", "run.csv"]);
        match cli.command {
            Command::Series { kind, user, .. } => {
                assert_eq!(kind, SeriesKind::Running);
                assert!(user.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_series_kind_waiting() {
        let cli = Cli::parse_from(["simtrace", "series", "run.csv", "--kind", "waiting"]);
        assert!(matches!(
            cli.command,
            Command::Series {
                kind: SeriesKind::Waiting,
                ..
            }
        ));
    }

    #[test]
    fn test_cli_snapshot_requires_time() {
        assert!(Cli::try_parse_from(["simtrace", "snapshot", "run.csv"]).is_err());
        let cli = Cli::parse_from(["simtrace", "snapshot", "run.csv", "--at", "60.5"]);
        assert!(matches!(cli.command, Command::Snapshot { at, .. } if at == 60.5));
    }

    #[test]
    fn test_cli_snapshot_accepts_negative_time() {
        let cli = Cli::parse_from(["simtrace", "snapshot", "run.csv", "--at", "-5"]);
        assert!(matches!(cli.command, Command::Snapshot { at, .. } if at == -5.0));
    }

    #[test]
    fn test_cli_compare_two_traces() {
        let cli = Cli::parse_from(["simtrace", "--sequential", "compare", "a.csv", "b.csv"]);
        assert!(cli.sequential);
        assert_eq!(
            cli.command,
            Command::Compare {
                baseline: PathBuf::from("a.csv"),
                candidate: PathBuf::from("b.csv"),
            }
        );
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["simtrace"]).is_err());
    }

    #[test]
    fn test_cli_config_path() {
        let cli = Cli::parse_from(["simtrace", "events", "run.csv", "--config", "a.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("a.toml")));
    }
}
