//! Interval sweep throughput benchmark
//!
//! Measures the sweep-line engine and the full analysis pipeline on synthetic
//! traces with heavily overlapping jobs. Both should scale as O(n log n) in
//! the number of jobs.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench sweep_throughput
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simtrace::config::AnalysisConfig;
use simtrace::normalize::RawTable;
use simtrace::pipeline::analyze;
use simtrace::sweep::{IntervalSweeper, KeyedInterval};

/// Seeded random trace: `jobs` rows spread over `users` users
fn synthetic_trace(jobs: usize, users: usize) -> RawTable {
    let headers = ["user", "host", "mem", "submit_time_ms", "start_time_ms", "end_time_ms"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut rng = StdRng::seed_from_u64(42);
    let rows = (0..jobs)
        .map(|i| {
            let submit = (i as u64) * 10 + rng.gen_range(0..50);
            let start = submit + rng.gen_range(0..500);
            let end = start + rng.gen_range(1..=5_000);
            vec![
                format!("u{}", rng.gen_range(0..users)),
                format!("h{}", rng.gen_range(0..16)),
                format!("{}", rng.gen_range(1..=32)),
                submit.to_string(),
                start.to_string(),
                end.to_string(),
            ]
        })
        .collect();
    RawTable::new(headers, rows)
}

fn keyed_intervals(n: usize, keys: u64) -> Vec<KeyedInterval<u64>> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..n as u64)
        .map(|i| {
            let lo = i * 3;
            KeyedInterval::count(rng.gen_range(0..keys), lo, lo + rng.gen_range(1..=1_000))
        })
        .collect()
}

/// Benchmark: single-key sweep over overlapping intervals
fn bench_sweep_single_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep_single_key");

    for n in [1_000usize, 10_000, 100_000] {
        let intervals: Vec<(u64, u64, i64)> = keyed_intervals(n, 1)
            .into_iter()
            .map(|iv| (iv.lo, iv.hi, iv.weight))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &intervals, |b, intervals| {
            b.iter(|| black_box(IntervalSweeper::sweep(intervals.iter().copied())));
        });
    }

    group.finish();
}

/// Benchmark: per-key sweep, sequential vs rayon
fn bench_sweep_by_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep_by_key");
    let intervals = keyed_intervals(100_000, 64);

    for parallel in [false, true] {
        let sweeper = IntervalSweeper::new(parallel);
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_function(label, |b| {
            b.iter(|| black_box(sweeper.sweep_by_key(intervals.clone())));
        });
    }

    group.finish();
}

/// Benchmark: normalize, series, usage and scorecard end to end
fn bench_full_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_analysis");
    group.sample_size(20);

    for jobs in [1_000usize, 10_000] {
        let raw = synthetic_trace(jobs, 20);
        let config = AnalysisConfig {
            cycle_time_ms: 100,
            ..AnalysisConfig::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(jobs), &raw, |b, raw| {
            b.iter(|| black_box(analyze(raw, &config)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_sweep_single_key,
    bench_sweep_by_key,
    bench_full_analysis
);
criterion_main!(benches);
