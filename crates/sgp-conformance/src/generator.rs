use crate::catalog::{Catalog, TestCase};
use crate::oracle::{OracleJob, OracleOutcome, ReferenceOracle};
use crate::{HarnessConfig, HarnessError};
use serde::{Deserialize, Serialize};
use sgp_artifact::NumericArtifact;
use sgp_io::ArtifactStore;
use sgp_runtime::{BatchTally, CaseStatus, EventLedger};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_SCHEMA_VERSION: u8 = 1;
const STAGE: &str = "generate";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    /// Relative to the dataset root, `/`-separated.
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestCase {
    pub id: String,
    pub status: CaseStatus,
    pub error: Option<String>,
    pub files: Vec<ManifestFile>,
}

/// Listing of every generated file. Holds no timestamps, so identical runs
/// produce identical manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationManifest {
    pub schema_version: u8,
    pub base_seed: u64,
    pub oracle: String,
    pub cases: Vec<ManifestCase>,
}

#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub tally: BatchTally,
    pub manifest: GenerationManifest,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn manifest_entry(root: &Path, path: &Path) -> Result<ManifestFile, HarnessError> {
    let bytes = fs::read(path).map_err(|err| HarnessError::artifact_io(path, err))?;
    let relative = path.strip_prefix(root).unwrap_or(path);
    let path = relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    Ok(ManifestFile {
        path,
        sha256: sha256_hex(&bytes),
        bytes: bytes.len() as u64,
    })
}

/// Writes the inputs and params of one case; returns the files written.
fn persist_inputs(
    store: &ArtifactStore,
    case: &TestCase,
    inputs: &[NumericArtifact],
) -> Result<Vec<PathBuf>, HarnessError> {
    let mut written = Vec::new();
    for (spec, artifact) in case.inputs.iter().zip(inputs) {
        written.extend(store.write(&case.family, &case.name, &spec.role(), artifact)?);
    }
    written.push(store.write_params(&case.family, &case.name, &case.transform.params())?);
    Ok(written)
}

fn remove_outputs(store: &ArtifactStore, case: &TestCase) -> Result<(), HarnessError> {
    for output in &case.outputs {
        store.remove(&case.family, &case.name, &output.role())?;
    }
    Ok(())
}

/// Checks the oracle answer against the declared outputs and writes it.
fn persist_outputs(
    store: &ArtifactStore,
    case: &TestCase,
    outcome: OracleOutcome,
) -> Result<Vec<PathBuf>, HarnessError> {
    let generation = |message: String| HarnessError::Generation {
        case_id: case.id(),
        message,
    };
    let outputs = outcome.map_err(generation)?;
    if outputs.len() != case.outputs.len() {
        return Err(generation(format!(
            "oracle returned {} outputs, {} declared",
            outputs.len(),
            case.outputs.len()
        )));
    }
    for (spec, artifact) in case.outputs.iter().zip(&outputs) {
        if artifact.kind() != spec.kind {
            return Err(generation(format!(
                "{} is {}, declared {}",
                spec.label(),
                artifact.kind().as_str(),
                spec.kind.as_str()
            )));
        }
    }
    let mut written = Vec::new();
    for (spec, artifact) in case.outputs.iter().zip(&outputs) {
        written.extend(store.write(&case.family, &case.name, &spec.role(), artifact)?);
    }
    Ok(written)
}

struct CaseRecord {
    status: CaseStatus,
    error: Option<String>,
    files: Vec<PathBuf>,
}

impl CaseRecord {
    fn failed(err: &HarnessError) -> Self {
        Self {
            status: CaseStatus::Fail,
            error: Some(err.to_string()),
            files: Vec::new(),
        }
    }
}

/// Logs the failure and clears stale outputs. A cleanup error is logged
/// against the same case; it never escapes the case.
fn fail_case(
    store: &ArtifactStore,
    case: &TestCase,
    err: &HarnessError,
    ledger: &mut EventLedger,
) -> CaseRecord {
    let id = case.id();
    ledger.error(STAGE, &id, err.reason_code(), err.to_string());
    if let Err(cleanup) = remove_outputs(store, case) {
        ledger.error(
            STAGE,
            &id,
            cleanup.reason_code(),
            format!("stale outputs not removed: {cleanup}"),
        );
    }
    CaseRecord::failed(err)
}

/// Synthesizes inputs, asks the oracle for references in one batch and
/// persists everything under the dataset root. A failing case is logged,
/// counted and left without outputs; the rest of the batch continues.
pub fn run_generation(
    config: &HarnessConfig,
    catalog: &Catalog,
    oracle: &dyn ReferenceOracle,
    ledger: &mut EventLedger,
) -> Result<GenerationReport, HarnessError> {
    let store = config.dataset_store();
    let mut records: Vec<Option<CaseRecord>> = Vec::with_capacity(catalog.len());
    let mut jobs = Vec::new();
    let mut job_slots = Vec::new();
    let mut input_files: Vec<Vec<PathBuf>> = Vec::with_capacity(catalog.len());

    for case in catalog.cases() {
        let id = case.id();
        let prepared = case
            .materialize_inputs(config.base_seed)
            .and_then(|inputs| persist_inputs(&store, case, &inputs).map(|files| (inputs, files)));
        match prepared {
            Ok((inputs, files)) => {
                input_files.push(files);
                if oracle.supports(&case.transform) {
                    job_slots.push(records.len());
                    jobs.push(OracleJob { case, inputs });
                    records.push(None);
                } else {
                    let err = HarnessError::Generation {
                        case_id: id.clone(),
                        message: format!(
                            "{} oracle does not support op '{}'",
                            oracle.name(),
                            case.transform.op()
                        ),
                    };
                    records.push(Some(fail_case(&store, case, &err, ledger)));
                }
            }
            Err(err) => {
                input_files.push(Vec::new());
                records.push(Some(fail_case(&store, case, &err, ledger)));
            }
        }
    }

    let outcomes = match oracle.evaluate(&jobs) {
        Ok(outcomes) if outcomes.len() == jobs.len() => outcomes,
        Ok(outcomes) => {
            let message = format!("oracle answered {} of {} cases", outcomes.len(), jobs.len());
            jobs.iter().map(|_| Err(message.clone())).collect()
        }
        Err(err) => {
            ledger.error(STAGE, "*", err.reason_code(), err.to_string());
            jobs.iter().map(|_| Err(err.to_string())).collect()
        }
    };

    for ((job, slot), outcome) in jobs.iter().zip(&job_slots).zip(outcomes) {
        let case = job.case;
        let id = case.id();
        let record = match persist_outputs(&store, case, outcome) {
            Ok(files) => {
                ledger.info(STAGE, &id, format!("wrote {} output file(s)", files.len()));
                CaseRecord {
                    status: CaseStatus::Success,
                    error: None,
                    files,
                }
            }
            Err(err) => fail_case(&store, case, &err, ledger),
        };
        records[*slot] = Some(record);
    }

    let mut tally = BatchTally::default();
    let mut cases = Vec::with_capacity(catalog.len());
    for ((case, record), inputs) in catalog.cases().iter().zip(records).zip(input_files) {
        let mut record = record.unwrap_or(CaseRecord {
            status: CaseStatus::Fail,
            error: Some("case was not evaluated".to_string()),
            files: Vec::new(),
        });
        let mut files = Vec::new();
        for path in inputs.iter().chain(&record.files) {
            match manifest_entry(store.root(), path) {
                Ok(entry) => files.push(entry),
                Err(err) => {
                    ledger.error(STAGE, &case.id(), err.reason_code(), err.to_string());
                    record.status = CaseStatus::Fail;
                    record.error.get_or_insert_with(|| err.to_string());
                }
            }
        }
        tally.record(record.status);
        cases.push(ManifestCase {
            id: case.id(),
            status: record.status,
            error: record.error,
            files,
        });
    }

    let manifest = GenerationManifest {
        schema_version: MANIFEST_SCHEMA_VERSION,
        base_seed: config.base_seed,
        oracle: oracle.name().to_string(),
        cases,
    };
    write_manifest(&config.manifest_path(), &manifest)?;
    ledger.info(
        STAGE,
        "*",
        format!(
            "generated {} case(s): {} ok, {} failed",
            tally.total(),
            tally.succeeded,
            tally.failed
        ),
    );
    Ok(GenerationReport { tally, manifest })
}

pub fn write_manifest(path: &Path, manifest: &GenerationManifest) -> Result<(), HarnessError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| HarnessError::artifact_io(parent, err))?;
    }
    let mut payload = serde_json::to_string_pretty(manifest)?;
    payload.push('\n');
    fs::write(path, payload).map_err(|err| HarnessError::artifact_io(path, err))
}

pub fn load_manifest(path: &Path) -> Result<GenerationManifest, HarnessError> {
    let raw = fs::read_to_string(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            HarnessError::MissingArtifact {
                path: path.to_path_buf(),
            }
        } else {
            HarnessError::artifact_io(path, err)
        }
    })?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::{load_manifest, run_generation, sha256_hex};
    use crate::HarnessConfig;
    use crate::catalog::{Catalog, Transform};
    use crate::oracle::{NativeOracle, OracleJob, OracleOutcome, ReferenceOracle};
    use crate::HarnessError;
    use sgp_runtime::{CaseStatus, EventLedger, EventLevel};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_root(name: &str) -> PathBuf {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock after epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("sgp_generator_{name}_{ts}"))
    }

    struct RejectingOracle;

    impl ReferenceOracle for RejectingOracle {
        fn name(&self) -> &'static str {
            "rejecting"
        }

        fn evaluate(&self, jobs: &[OracleJob<'_>]) -> Result<Vec<OracleOutcome>, HarnessError> {
            Ok(jobs
                .iter()
                .map(|job| match job.case.transform {
                    Transform::Correlate { ref mode } if mode == "valid" => {
                        Err("ValueError: rejected".to_string())
                    }
                    _ => crate::oracle::evaluate_native(&job.case.transform, &job.inputs),
                })
                .collect())
        }
    }

    #[test]
    fn sha256_is_lower_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn failed_case_leaves_no_outputs_and_batch_continues() {
        let root = temp_root("reject");
        let config = HarnessConfig::rooted_at(&root);
        let catalog = Catalog::standard().only_families(&["correlate"]);
        let mut ledger = EventLedger::new();
        let report =
            run_generation(&config, &catalog, &RejectingOracle, &mut ledger).expect("batch runs");
        assert_eq!(report.tally.failed, 2);
        assert_eq!(report.tally.succeeded, catalog.len() - 2);
        assert!(ledger.count(EventLevel::Error) >= 2);

        let store = config.dataset_store();
        assert!(!store.exists("correlate", "basic_valid", "output"));
        assert!(store.exists("correlate", "basic_valid", "input_in1"));
        assert!(store.exists("correlate", "basic_full", "output"));

        let failed = report
            .manifest
            .cases
            .iter()
            .find(|case| case.id == "correlate/basic_valid")
            .expect("listed");
        assert_eq!(failed.status, CaseStatus::Fail);
        assert!(failed.error.as_deref().is_some_and(|e| e.contains("rejected")));
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn unremovable_stale_output_fails_only_its_case() {
        let root = temp_root("stuck");
        let config = HarnessConfig::rooted_at(&root);
        let catalog = Catalog::standard().only_families(&["sosfilt", "ode"]);
        let store = config.dataset_store();
        let stuck = store.path_for("sosfilt", "butter4_lowpass_0p2", "output");
        std::fs::create_dir_all(stuck.join("occupied")).expect("directory in place of output");

        let mut ledger = EventLedger::new();
        let report =
            run_generation(&config, &catalog, &NativeOracle, &mut ledger).expect("batch runs");
        assert_eq!(report.tally.failed, 1);
        assert_eq!(report.tally.succeeded, 1);
        assert!(store.exists("ode", "rk4_gaussian_decay", "output"));
        assert!(
            ledger
                .events()
                .iter()
                .any(|event| event.message.starts_with("stale outputs not removed"))
        );
        assert!(config.manifest_path().is_file());
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn unsupported_cases_fail_without_aborting() {
        let root = temp_root("unsupported");
        let config = HarnessConfig::rooted_at(&root);
        let catalog = Catalog::standard().only_families(&["sosfilt", "ode"]);
        let mut ledger = EventLedger::new();
        let report =
            run_generation(&config, &catalog, &NativeOracle, &mut ledger).expect("batch runs");
        assert_eq!(report.tally.failed, 1);
        assert_eq!(report.tally.succeeded, 1);
        let manifest = load_manifest(&config.manifest_path()).expect("manifest written");
        assert_eq!(manifest, report.manifest);
        assert_eq!(manifest.oracle, "native");
        std::fs::remove_dir_all(&root).ok();
    }
}
