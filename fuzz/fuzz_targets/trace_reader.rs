#![no_main]

use libfuzzer_sys::fuzz_target;
use simtrace::config::AnalysisConfig;
use simtrace::pipeline::analyze;
use simtrace::trace_io::read_raw_table_from_reader;

fuzz_target!(|data: &[u8]| {
    // Arbitrary CSV bytes must either analyze cleanly or return an error
    if let Ok(raw) = read_raw_table_from_reader(data) {
        let config = AnalysisConfig {
            cycle_time_ms: 100,
            parallel: false,
            ..AnalysisConfig::default()
        };
        if let Ok(analysis) = analyze(&raw, &config) {
            let _ = analysis.snapshot_at(0.0);
        }
    }
});
