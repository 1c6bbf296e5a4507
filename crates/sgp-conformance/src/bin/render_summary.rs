#![forbid(unsafe_code)]

use sgp_conformance::HarnessConfig;
use sgp_conformance::aggregate::{Summary, load_metrics};
use sgp_conformance::render::{ReportConfig, Theme, render_text, write_reports};
use sgp_runtime::BatchTally;
use std::path::PathBuf;

const USAGE: &str = "Usage: cargo run -p sgp-conformance --bin render_summary -- \
[--metrics <test_metrics.json>] [--report-root <dir>] [--theme light|dark]... \
[--worst <n>] [--title <text>]";

fn main() {
    if let Err(err) = run() {
        eprintln!("render_summary failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut cfg = HarnessConfig::default_paths();
    let mut metrics_path: Option<PathBuf> = None;
    let mut report = ReportConfig::default();
    let mut themes = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--metrics" => metrics_path = Some(PathBuf::from(value("--metrics")?)),
            "--report-root" => cfg.report_root = PathBuf::from(value("--report-root")?),
            "--theme" => themes.push(Theme::parse(&value("--theme")?).map_err(|err| err.to_string())?),
            "--worst" => {
                let raw = value("--worst")?;
                report.worst_offenders = raw
                    .parse()
                    .map_err(|err| format!("invalid --worst '{raw}': {err}"))?;
            }
            "--title" => report.title = value("--title")?,
            "--help" | "-h" => {
                println!("{USAGE}");
                return Ok(());
            }
            unknown => return Err(format!("unknown argument: {unknown}")),
        }
    }
    if !themes.is_empty() {
        report.themes = themes;
    }

    let metrics_path = metrics_path.unwrap_or_else(|| cfg.metrics_path());
    let results = load_metrics(&metrics_path).map_err(|err| err.to_string())?;
    let tally = BatchTally {
        succeeded: results.len(),
        ..BatchTally::default()
    };
    let summary = Summary::build(&results, tally, &report);
    let files = write_reports(&cfg.report_root, &summary, &report).map_err(|err| err.to_string())?;

    print!("{}", render_text(&summary));
    for file in files {
        println!("wrote {}", file.display());
    }
    Ok(())
}
