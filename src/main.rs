use anyhow::{Context, Result};
use clap::Parser;
use simtrace::cli::{Cli, Command, OutputFormat};
use simtrace::config::AnalysisConfig;
use simtrace::csv_output;
use simtrace::event::EventTable;
use simtrace::json_output::{
    to_json, JsonEventsReport, JsonScorecardReport, JsonSeriesReport, JsonUsageReport,
};
use simtrace::pipeline::{analyze, Analysis};
use simtrace::scorecard::ScoreCard;
use simtrace::series::{SeriesKind, UserSeries};
use simtrace::snapshot::PointInTimeSnapshot;
use simtrace::trace_io::read_raw_table;
use simtrace::usage::UsageRecord;
use std::io::Write;
use std::path::Path;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
///
/// `--debug` turns on everything; otherwise `RUST_LOG` is honored when set.
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    } else if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Config file (if any) with CLI overrides applied
fn build_config(args: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(cycle) = args.cycle_time_ms {
        config.cycle_time_ms = cycle;
    }
    if let Some(capacity) = args.cluster_mem_gb {
        config.cluster_mem_gb = Some(capacity);
    }
    if args.sequential {
        config.parallel = false;
    }
    config.validate()?;
    debug!(?config, "resolved analysis config");
    Ok(config)
}

fn load(path: &Path, config: &AnalysisConfig) -> Result<Analysis> {
    let raw = read_raw_table(path)
        .with_context(|| format!("Failed to read trace: {}", path.display()))?;
    let analysis =
        analyze(&raw, config).with_context(|| format!("Failed to analyze: {}", path.display()))?;
    Ok(analysis)
}

fn print_events(events: &EventTable) {
    println!("=== Events ({} jobs, horizon {} ms) ===", events.len(), events.horizon_ms());
    println!(
        "{:<16} {:<10} {:<10} {:>8} {:>10} {:>10} {:>10} {:>10}  state",
        "job_id", "user", "host", "mem_gb", "submit", "start", "end", "overhead"
    );
    for e in events {
        println!(
            "{:<16} {:<10} {:<10} {:>8.3} {:>10} {:>10} {:>10} {:>10}  {:?}",
            e.job_id,
            e.user,
            e.host,
            e.mem,
            e.submit_time_ms,
            e.start_time_ms,
            e.end_time_ms,
            e.overhead_ms,
            e.state
        );
    }
}

fn print_series(series: &UserSeries, kind: SeriesKind) {
    println!("=== {} series ===", kind.name());
    for (user, steps) in series {
        println!("{} (peak {}):", user, kind.scale(steps.peak()));
        for sample in steps.samples() {
            println!("  {:>12} ms  {}", sample.time_ms, kind.scale(sample.value));
        }
    }
}

fn print_usage(records: &[UsageRecord], dropped: usize, cluster_mem_gb: f64) {
    let cell = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.3}", v));
    println!(
        "=== Usage ({} records, capacity {:.3} GB, {} samples outside active cycles) ===",
        records.len(),
        cluster_mem_gb,
        dropped
    );
    println!(
        "{:<10} {:>12} {:>8} {:>8} {:>8} {:>10} {:>10} {:>8} {:>10} {:>8}",
        "user", "time_ms", "cycle", "running", "waiting", "mem_gb", "fair_gb", "ratio", "starved", "log10"
    );
    for r in records {
        println!(
            "{:<10} {:>12} {:>8} {:>8} {:>8} {:>10.3} {:>10.3} {:>8} {:>10.3} {:>8}",
            r.user,
            r.time_ms,
            r.cycle,
            r.running_jobs,
            r.waiting_jobs,
            r.running_mem,
            r.fair_share_mem,
            cell(r.fair_ratio),
            r.starved_mem_gb,
            cell(r.starved_mem_log10)
        );
    }
}

fn print_snapshot(snapshot: &PointInTimeSnapshot) {
    println!("=== Snapshot at {} ms ===", snapshot.time_ms);
    if snapshot.is_idle() {
        println!("(idle: nothing running or waiting)");
        return;
    }
    println!("Memory in use: {:.3} GB", snapshot.running_mem_gb());
    println!("Per host:");
    for (host, gb) in &snapshot.per_host {
        println!("  {:<16} {:>10.3} GB", host, gb);
    }
    println!("Per user:");
    let waiting = snapshot.waiting_jobs_by_user();
    let running = snapshot.running_jobs_by_user();
    for (user, gb) in &snapshot.per_user {
        println!(
            "  {:<16} {:>10.3} GB  {} running",
            user,
            gb,
            running.get(user.as_str()).copied().unwrap_or(0)
        );
    }
    if !waiting.is_empty() {
        println!("Waiting:");
        for job in &snapshot.waiting {
            println!(
                "  {:<16} {:<10} {:>8.3} GB  submitted {} ms",
                job.job_id, job.user, job.mem, job.submit_time_ms
            );
        }
    }
}

fn print_scorecard(card: &ScoreCard, cluster_mem_gb: f64) {
    println!("{}", card);
    println!("Capacity:          {:.3} GB", cluster_mem_gb);
}

fn run(args: &Cli, config: &AnalysisConfig) -> Result<()> {
    let out = || std::io::stdout().lock();

    match &args.command {
        Command::Events { trace } => {
            let analysis = load(trace, config)?;
            let events = &analysis.events;
            match args.format {
                OutputFormat::Text => print_events(events),
                OutputFormat::Json => println!(
                    "{}",
                    to_json(&JsonEventsReport {
                        horizon_ms: events.horizon_ms(),
                        events: events.events(),
                    })?
                ),
                OutputFormat::Csv => csv_output::write_events(events, out())?,
            }
        }
        Command::Series { trace, kind, user } => {
            let analysis = load(trace, config)?;
            let all = analysis.series.get(*kind);
            let selected: UserSeries = match user {
                Some(user) => all
                    .iter()
                    .filter(|(name, _)| *name == user)
                    .map(|(name, steps)| (name.clone(), steps.clone()))
                    .collect(),
                None => all.clone(),
            };
            match args.format {
                OutputFormat::Text => print_series(&selected, *kind),
                OutputFormat::Json => {
                    println!("{}", to_json(&JsonSeriesReport::new(&selected, *kind))?)
                }
                OutputFormat::Csv => csv_output::write_series(&selected, *kind, out())?,
            }
        }
        Command::Usage {
            trace,
            starved_only,
        } => {
            let analysis = load(trace, config)?;
            let records: Vec<UsageRecord> = if *starved_only {
                analysis.usage.starved().cloned().collect()
            } else {
                analysis.usage.records().to_vec()
            };
            let dropped = analysis.usage.dropped_samples();
            match args.format {
                OutputFormat::Text => print_usage(&records, dropped, analysis.cluster_mem_gb),
                OutputFormat::Json => println!(
                    "{}",
                    to_json(&JsonUsageReport {
                        cycle_time_ms: config.cycle_time_ms,
                        cluster_mem_gb: analysis.cluster_mem_gb,
                        dropped_samples: dropped,
                        records: &records,
                    })?
                ),
                OutputFormat::Csv if *starved_only => {
                    csv_output::write_usage_records(&records, out())?
                }
                OutputFormat::Csv => csv_output::write_usage(&analysis.usage, out())?,
            }
        }
        Command::Scorecard { trace } => {
            let analysis = load(trace, config)?;
            match args.format {
                OutputFormat::Text => print_scorecard(&analysis.scorecard, analysis.cluster_mem_gb),
                OutputFormat::Json => println!(
                    "{}",
                    to_json(&JsonScorecardReport {
                        trace: Some(trace.display().to_string()),
                        cluster_mem_gb: analysis.cluster_mem_gb,
                        scorecard: analysis.scorecard.clone(),
                    })?
                ),
                OutputFormat::Csv => csv_output::write_scorecard(&analysis.scorecard, out())?,
            }
        }
        Command::Snapshot { trace, at } => {
            let analysis = load(trace, config)?;
            let snapshot = analysis.snapshot_at(*at)?;
            match args.format {
                OutputFormat::Text => print_snapshot(&snapshot),
                OutputFormat::Json => println!("{}", to_json(&snapshot)?),
                OutputFormat::Csv => csv_output::write_snapshot(&snapshot, out())?,
            }
        }
        Command::Compare {
            baseline,
            candidate,
        } => {
            let a = load(baseline, config)?;
            let b = load(candidate, config)?;
            let comparison = ScoreCard::compare(&a.scorecard, &b.scorecard);
            match args.format {
                OutputFormat::Text => {
                    println!("Baseline:  {}", baseline.display());
                    println!("Candidate: {}", candidate.display());
                    println!();
                    print!("{}", comparison);
                }
                OutputFormat::Json => println!("{}", to_json(&comparison)?),
                OutputFormat::Csv => csv_output::write_comparison(&comparison, out())?,
            }
        }
    }

    std::io::stdout().flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = build_config(&args)?;
    run(&args, &config)
}
