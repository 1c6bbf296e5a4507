//! Out-of-process adapter for the implementation under test.
//!
//! Invocation: `{program} {args...} {op} --output {prefix} {inputs...} {key=value...}`.
//! The process writes `{prefix}_output[_name].txt` files, or prints a single
//! output on stdout. Anything short of usable output skips the case.

use crate::catalog::{Catalog, TestCase};
use crate::{CandidateCommand, HarnessConfig, HarnessError};
use sgp_io::ArtifactStore;
use sgp_runtime::{BatchTally, CaseStatus, EventLedger};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

const STAGE: &str = "candidate";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    Produced { files: Vec<PathBuf> },
    Skipped { reason_code: &'static str, message: String },
}

impl CandidateOutcome {
    #[must_use]
    pub fn status(&self) -> CaseStatus {
        match self {
            Self::Produced { .. } => CaseStatus::Success,
            Self::Skipped { .. } => CaseStatus::Skip,
        }
    }

    fn skipped(reason_code: &'static str, message: impl Into<String>) -> Self {
        Self::Skipped {
            reason_code,
            message: message.into(),
        }
    }
}

/// Arguments after the program name, in invocation order.
pub fn build_arguments(
    command: &CandidateCommand,
    case: &TestCase,
    references: &ArtifactStore,
    candidates: &ArtifactStore,
) -> Result<Vec<OsString>, HarnessError> {
    let mut argv: Vec<OsString> = command.args.iter().map(OsString::from).collect();
    argv.push(case.transform.op().into());
    argv.push("--output".into());
    argv.push(candidates.family_dir(&case.family).join(&case.name).into_os_string());
    for input in &case.inputs {
        let role = input.role();
        let files = references.existing_files(&case.family, &case.name, &role);
        if files.is_empty() {
            return Err(HarnessError::MissingArtifact {
                path: references.path_for(&case.family, &case.name, &role),
            });
        }
        argv.extend(files.into_iter().map(PathBuf::into_os_string));
    }
    for (key, value) in case.transform.params() {
        argv.push(format!("{key}={value}").into());
    }
    Ok(argv)
}

fn discard_outputs(case: &TestCase, candidates: &ArtifactStore) -> Result<(), HarnessError> {
    for output in &case.outputs {
        candidates.remove(&case.family, &case.name, &output.role())?;
    }
    Ok(())
}

/// Runs the candidate for one case. Stale candidate outputs are removed
/// first, and anything a failed run wrote is removed again before skipping.
pub fn invoke_candidate(
    command: &CandidateCommand,
    case: &TestCase,
    references: &ArtifactStore,
    candidates: &ArtifactStore,
) -> Result<CandidateOutcome, HarnessError> {
    discard_outputs(case, candidates)?;
    let argv = match build_arguments(command, case, references, candidates) {
        Ok(argv) => argv,
        Err(err @ HarnessError::MissingArtifact { .. }) => {
            return Ok(CandidateOutcome::skipped(err.reason_code(), err.to_string()));
        }
        Err(err) => return Err(err),
    };
    let family_dir = candidates.family_dir(&case.family);
    std::fs::create_dir_all(&family_dir)
        .map_err(|err| HarnessError::artifact_io(&family_dir, err))?;

    let output = match Command::new(&command.program).args(&argv).output() {
        Ok(output) => output,
        Err(err) => {
            return Ok(CandidateOutcome::skipped(
                "candidate_launch_failed",
                format!("failed to launch {}: {err}", command.program.display()),
            ));
        }
    };
    if !output.status.success() {
        discard_outputs(case, candidates)?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Ok(CandidateOutcome::skipped(
            "candidate_exit_nonzero",
            format!("status={} stderr={}", output.status, stderr.trim()),
        ));
    }

    let produced = |role: &str| candidates.existing_files(&case.family, &case.name, role);
    let mut files: Vec<PathBuf> = case
        .outputs
        .iter()
        .flat_map(|spec| produced(&spec.role()))
        .collect();

    if files.is_empty()
        && let [single] = case.outputs.as_slice()
    {
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            files.push(candidates.write_raw(&case.family, &case.name, &single.role(), &stdout)?);
        }
    }

    if files.is_empty() {
        discard_outputs(case, candidates)?;
        return Ok(CandidateOutcome::skipped(
            "candidate_no_output",
            "candidate exited 0 without writing any output",
        ));
    }
    Ok(CandidateOutcome::Produced { files })
}

/// Runs the configured candidate over every case. Per-case problems become
/// skips or failures in the tally; they never abort the batch.
pub fn run_candidates(
    config: &HarnessConfig,
    catalog: &Catalog,
    ledger: &mut EventLedger,
) -> Result<BatchTally, HarnessError> {
    let Some(command) = config.candidate.as_ref() else {
        return Err(HarnessError::Usage(
            "no candidate program configured".to_string(),
        ));
    };
    let references = config.dataset_store();
    let candidates = config.candidate_store();
    let mut tally = BatchTally::default();

    for case in catalog.cases() {
        let id = case.id();
        match invoke_candidate(command, case, &references, &candidates) {
            Ok(outcome) => {
                tally.record(outcome.status());
                match outcome {
                    CandidateOutcome::Produced { files } => {
                        ledger.info(STAGE, &id, format!("candidate produced {} file(s)", files.len()));
                    }
                    CandidateOutcome::Skipped {
                        reason_code,
                        message,
                    } => ledger.warn(STAGE, &id, reason_code, message),
                }
            }
            Err(err) => {
                tally.record(err.case_status());
                ledger.error(STAGE, &id, err.reason_code(), err.to_string());
            }
        }
    }
    Ok(tally)
}
