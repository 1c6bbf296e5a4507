#![forbid(unsafe_code)]

use sgp_conformance::candidate::run_candidates;
use sgp_conformance::catalog::Catalog;
use sgp_conformance::{CandidateCommand, HarnessConfig};
use std::path::PathBuf;

const USAGE: &str = "Usage: cargo run -p sgp-conformance --bin run_candidate -- \
--program <path> [--arg <value>]... [--dataset-root <dir>] [--candidate-root <dir>] \
[--only <family,...>] [--log-path <path>]";

fn main() {
    if let Err(err) = run() {
        eprintln!("run_candidate failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut cfg = HarnessConfig::default_paths();
    let mut program: Option<PathBuf> = None;
    let mut fixed_args = Vec::new();
    let mut only: Option<String> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--program" => program = Some(PathBuf::from(value("--program")?)),
            "--arg" => fixed_args.push(value("--arg")?),
            "--dataset-root" => cfg.dataset_root = PathBuf::from(value("--dataset-root")?),
            "--candidate-root" => cfg.candidate_root = PathBuf::from(value("--candidate-root")?),
            "--only" => only = Some(value("--only")?),
            "--log-path" => cfg.log_path = Some(PathBuf::from(value("--log-path")?)),
            "--help" | "-h" => {
                println!("{USAGE}");
                return Ok(());
            }
            unknown => return Err(format!("unknown argument: {unknown}")),
        }
    }
    let program = program.ok_or_else(|| format!("--program is required\n{USAGE}"))?;
    cfg.candidate = Some(CandidateCommand {
        program,
        args: fixed_args,
    });

    let mut catalog = Catalog::standard();
    if let Some(only) = &only {
        let families: Vec<&str> = only.split(',').map(str::trim).collect();
        catalog = catalog.only_families(&families);
    }

    let mut ledger = cfg.ledger();
    let tally = run_candidates(&cfg, &catalog, &mut ledger).map_err(|err| err.to_string())?;
    if let Some(err) = ledger.sink_error() {
        eprintln!("event log disabled: {err}");
    }
    println!(
        "candidate run: total={} succeeded={} skipped={} failed={}",
        tally.total(),
        tally.succeeded,
        tally.skipped,
        tally.failed
    );
    if tally.exit_code() != 0 {
        std::process::exit(1);
    }
    Ok(())
}
