//! Analysis configuration
//!
//! Loaded from a TOML file (`--config analysis.toml`) and overridden by CLI
//! flags. Every field has a default so an empty file is a valid config.

use crate::error::{Result, TraceError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters for one analysis run
///
/// # Example
/// ```
/// use simtrace::config::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.cycle_time_ms, 1000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Length of one scheduling round in milliseconds
    ///
    /// Fair share is recomputed once per cycle, and scheduling overhead is
    /// reported in cycle units.
    pub cycle_time_ms: u64,

    /// Total cluster memory capacity in GB
    ///
    /// When unset, capacity is inferred as the peak aggregate running memory
    /// observed in the trace.
    pub cluster_mem_gb: Option<f64>,

    /// Run per-user sweeps on the rayon thread pool
    pub parallel: bool,

    /// Header aliases for the trace's logical columns
    pub columns: ColumnMapping,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cycle_time_ms: 1000,
            cluster_mem_gb: None,
            parallel: true,
            columns: ColumnMapping::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load a config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AnalysisConfig =
            toml::from_str(text).map_err(|e| TraceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.cycle_time_ms == 0 {
            return Err(TraceError::InvalidParameter(
                "cycle_time_ms must be positive, got 0".to_string(),
            ));
        }

        if let Some(capacity) = self.cluster_mem_gb {
            if !capacity.is_finite() || capacity <= 0.0 {
                return Err(TraceError::InvalidParameter(format!(
                    "cluster_mem_gb must be a positive number, got {}",
                    capacity
                )));
            }
        }

        Ok(())
    }
}

/// Accepted header names for each logical trace column
///
/// Matching is case-insensitive and ignores surrounding whitespace. The first
/// header that matches any alias wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub job_id: Vec<String>,
    pub user: Vec<String>,
    pub host: Vec<String>,
    pub mem: Vec<String>,
    pub submit_time_ms: Vec<String>,
    pub start_time_ms: Vec<String>,
    pub end_time_ms: Vec<String>,
}

fn aliases(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            job_id: aliases(&["job_id", "uuid", "job", "id"]),
            user: aliases(&["user", "username", "owner"]),
            host: aliases(&["host", "hostname", "node"]),
            mem: aliases(&["mem", "mem_gb", "memory"]),
            submit_time_ms: aliases(&["submit_time_ms", "submit_time", "submit_ms"]),
            start_time_ms: aliases(&["start_time_ms", "start_time", "start_ms"]),
            end_time_ms: aliases(&["end_time_ms", "end_time", "end_ms"]),
        }
    }
}

impl ColumnMapping {
    /// Find the index of the first header matching one of `aliases`
    pub fn resolve(aliases: &[String], headers: &[String]) -> Option<usize> {
        headers.iter().position(|header| {
            let header = header.trim();
            aliases.iter().any(|alias| alias.eq_ignore_ascii_case(header))
        })
    }
}
