#![forbid(unsafe_code)]

use sgp_conformance::HarnessConfig;
use sgp_conformance::aggregate::Summary;
use sgp_conformance::catalog::Catalog;
use sgp_conformance::comparator::run_comparison;
use sgp_conformance::render::{ReportConfig, Theme, render_text, write_reports};
use std::path::PathBuf;

const USAGE: &str = "Usage: cargo run -p sgp-conformance --bin compare_candidates -- \
[--dataset-root <dir>] [--candidate-root <dir>] [--report-root <dir>] [--only <family,...>] \
[--theme light|dark]... [--worst <n>] [--title <text>] [--log-path <path>]";

fn main() {
    if let Err(err) = run() {
        eprintln!("compare_candidates failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut cfg = HarnessConfig::default_paths();
    let mut report = ReportConfig::default();
    let mut themes = Vec::new();
    let mut only: Option<String> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--dataset-root" => cfg.dataset_root = PathBuf::from(value("--dataset-root")?),
            "--candidate-root" => cfg.candidate_root = PathBuf::from(value("--candidate-root")?),
            "--report-root" => cfg.report_root = PathBuf::from(value("--report-root")?),
            "--only" => only = Some(value("--only")?),
            "--theme" => themes.push(Theme::parse(&value("--theme")?).map_err(|err| err.to_string())?),
            "--worst" => {
                let raw = value("--worst")?;
                report.worst_offenders = raw
                    .parse()
                    .map_err(|err| format!("invalid --worst '{raw}': {err}"))?;
            }
            "--title" => report.title = value("--title")?,
            "--log-path" => cfg.log_path = Some(PathBuf::from(value("--log-path")?)),
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

    let mut catalog = Catalog::standard();
    if let Some(only) = &only {
        let families: Vec<&str> = only.split(',').map(str::trim).collect();
        catalog = catalog.only_families(&families);
    }

    let mut ledger = cfg.ledger();
    let comparison = run_comparison(&cfg, &catalog, &mut ledger).map_err(|err| err.to_string())?;
    let summary = Summary::build(&comparison.results, comparison.tally, &report);
    let files = write_reports(&cfg.report_root, &summary, &report).map_err(|err| err.to_string())?;
    if let Some(err) = ledger.sink_error() {
        eprintln!("event log disabled: {err}");
    }

    print!("{}", render_text(&summary));
    for file in files {
        println!("wrote {}", file.display());
    }
    if comparison.tally.exit_code() != 0 {
        std::process::exit(1);
    }
    Ok(())
}
