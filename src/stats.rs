//! Summary statistics for scorecard reductions
//!
//! Plain sample statistics (mean, percentiles with linear interpolation) and
//! their time-weighted counterparts for step functions, where each value
//! counts in proportion to how long it was held.

use serde::{Deserialize, Serialize};

/// Distribution summary of a set of samples
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64, // P50
    pub p95: f64,
}

impl Summary {
    /// Summarize `values`; all fields are zero for an empty input
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let sorted = sorted(values);
        Self {
            count: sorted.len(),
            mean: mean(&sorted),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            median: percentile(&sorted, 50.0),
            p95: percentile(&sorted, 95.0),
        }
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Arithmetic mean, 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate percentile from sorted data (linear interpolation between ranks)
pub fn percentile(sorted_data: &[f64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    if sorted_data.len() == 1 {
        return sorted_data[0];
    }

    let index = (percentile / 100.0) * (sorted_data.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted_data[lower]
    } else {
        let weight = index - lower as f64;
        sorted_data[lower] * (1.0 - weight) + sorted_data[upper] * weight
    }
}

/// Median of unsorted data, 0.0 for an empty slice
pub fn median(values: &[f64]) -> f64 {
    percentile(&sorted(values), 50.0)
}

/// Median of a step function given as `(value, duration)` segments
///
/// The smallest value at which the accumulated duration reaches half of the
/// total. When the halfway mark falls exactly on a boundary between two
/// values, their midpoint is returned. Zero-duration segments carry no
/// weight; an input with no duration yields 0.0.
pub fn time_weighted_median(segments: &[(f64, u64)]) -> f64 {
    let mut weighted: Vec<(f64, u64)> = segments.iter().copied().filter(|(_, d)| *d > 0).collect();
    if weighted.is_empty() {
        return 0.0;
    }
    weighted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let total: u128 = weighted.iter().map(|(_, d)| *d as u128).sum();
    let mut acc: u128 = 0;
    for (i, (value, duration)) in weighted.iter().enumerate() {
        acc += *duration as u128;
        // compare 2 * acc against total to stay in integers
        if 2 * acc > total {
            return *value;
        }
        if 2 * acc == total {
            return match weighted[i + 1..].iter().find(|(v, _)| v != value) {
                Some((next, _)) => (value + next) / 2.0,
                None => *value,
            };
        }
    }
    weighted[weighted.len() - 1].0
}

/// Mean of a step function given as `(value, duration)` segments
pub fn time_weighted_mean(segments: &[(f64, u64)]) -> f64 {
    let total: u128 = segments.iter().map(|(_, d)| *d as u128).sum();
    if total == 0 {
        return 0.0;
    }
    let weighted: f64 = segments.iter().map(|(v, d)| v * *d as f64).sum();
    weighted / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&data, 50.0), 2.5);
        assert_eq!(percentile(&data, 0.0), 1.0);
        assert_eq!(percentile(&data, 100.0), 4.0);
    }

    #[test]
    fn test_median_odd_length() {
        assert_eq!(median(&[9.0, 1.0, 5.0, 3.0, 7.0]), 5.0);
    }

    #[test]
    fn test_median_empty() {
        assert_eq!(median(&[]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_summary() {
        let s = Summary::of(&[4.0, 0.0, 2.0]);
        assert_eq!(s.count, 3);
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.min, 0.0);
        assert_eq!(s.max, 4.0);
        assert_eq!(s.median, 2.0);
        assert_eq!(Summary::of(&[]), Summary::default());
    }

    #[test]
    fn test_time_weighted_median_dominant_value() {
        // value 1 held for 90ms, value 10 for 10ms
        assert_eq!(time_weighted_median(&[(10.0, 10), (1.0, 90)]), 1.0);
    }

    #[test]
    fn test_time_weighted_median_differs_from_sample_median() {
        // samples 0,5,5 have median 5 but 0 was held far longer
        let segs = [(0.0, 1000), (5.0, 1), (5.0, 1)];
        assert_eq!(time_weighted_median(&segs), 0.0);
    }

    #[test]
    fn test_time_weighted_median_exact_half() {
        assert_eq!(time_weighted_median(&[(1.0, 50), (3.0, 50)]), 2.0);
    }

    #[test]
    fn test_time_weighted_median_ignores_zero_duration() {
        assert_eq!(time_weighted_median(&[(100.0, 0), (2.0, 5)]), 2.0);
        assert_eq!(time_weighted_median(&[(100.0, 0)]), 0.0);
    }

    #[test]
    fn test_time_weighted_mean() {
        assert_eq!(time_weighted_mean(&[(1.0, 30), (3.0, 10)]), 1.5);
        assert_eq!(time_weighted_mean(&[]), 0.0);
    }
}
