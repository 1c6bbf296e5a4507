#![forbid(unsafe_code)]

use sgp_conformance::HarnessConfig;
use sgp_conformance::catalog::Catalog;
use sgp_conformance::generator::run_generation;
use sgp_conformance::oracle::{NativeOracle, PythonOracle, ReferenceOracle};
use std::path::PathBuf;

const USAGE: &str = "Usage: cargo run -p sgp-conformance --bin generate_reference -- \
[--oracle python|native] [--python <interpreter>] [--dataset-root <dir>] [--seed <u64>] \
[--only <family,...>] [--log-path <path>]";

fn main() {
    if let Err(err) = run() {
        eprintln!("generate_reference failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut cfg = HarnessConfig::default_paths();
    let mut oracle_name = "python".to_string();
    let mut only: Option<String> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--oracle" => oracle_name = value("--oracle")?,
            "--python" => cfg.oracle.python = value("--python")?,
            "--dataset-root" => cfg.dataset_root = PathBuf::from(value("--dataset-root")?),
            "--seed" => {
                let raw = value("--seed")?;
                cfg.base_seed = raw
                    .parse()
                    .map_err(|err| format!("invalid --seed '{raw}': {err}"))?;
            }
            "--only" => only = Some(value("--only")?),
            "--log-path" => cfg.log_path = Some(PathBuf::from(value("--log-path")?)),
            "--help" | "-h" => {
                println!("{USAGE}");
                return Ok(());
            }
            unknown => return Err(format!("unknown argument: {unknown}")),
        }
    }

    let mut catalog = Catalog::standard();
    if let Some(only) = &only {
        let families: Vec<&str> = only.split(',').map(str::trim).collect();
        catalog = catalog.only_families(&families);
    }

    let python_oracle;
    let oracle: &dyn ReferenceOracle = match oracle_name.as_str() {
        "python" => {
            python_oracle = PythonOracle::new(&cfg.oracle, cfg.dataset_root.join(".oracle"));
            &python_oracle
        }
        "native" => {
            let supported = catalog.filtered(|case| NativeOracle.supports(&case.transform));
            if supported.len() < catalog.len() {
                println!(
                    "native oracle: {} case(s) outside the native subset left out",
                    catalog.len() - supported.len()
                );
            }
            catalog = supported;
            &NativeOracle
        }
        other => return Err(format!("--oracle must be python|native, got '{other}'")),
    };

    let mut ledger = cfg.ledger();
    let report = run_generation(&cfg, &catalog, oracle, &mut ledger).map_err(|err| err.to_string())?;
    if let Some(err) = ledger.sink_error() {
        eprintln!("event log disabled: {err}");
    }

    println!(
        "reference generation ({}): total={} succeeded={} failed={}",
        oracle.name(),
        report.tally.total(),
        report.tally.succeeded,
        report.tally.failed
    );
    println!("wrote {}", cfg.manifest_path().display());
    if report.tally.exit_code() != 0 {
        std::process::exit(1);
    }
    Ok(())
}
