#![forbid(unsafe_code)]

pub mod aggregate;
pub mod candidate;
pub mod catalog;
pub mod comparator;
pub mod generator;
pub mod oracle;
pub mod render;

use crate::aggregate::Summary;
use crate::catalog::Catalog;
use crate::oracle::ReferenceOracle;
use crate::render::ReportConfig;
use sgp_io::{ArtifactStore, CodecError};
use sgp_runtime::{BatchTally, CaseStatus, EventLedger};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ORACLE_PYTHON_ENV: &str = "SGP_ORACLE_PYTHON";
pub const METRICS_FILE: &str = "test_metrics.json";
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("generation failed for {case_id}: {message}")]
    Generation { case_id: String, message: String },
    #[error("{0}")]
    Format(CodecError),
    #[error("missing artifact {}", .path.display())]
    MissingArtifact { path: PathBuf },
    #[error("failed to launch python oracle `{python}`: {source}")]
    OracleLaunch { python: String, source: io::Error },
    #[error("python oracle `{python}` failed: {stderr}")]
    OracleFailed { python: String, stderr: String },
    #[error("oracle capture parse failed for {}: {source}", .path.display())]
    OracleParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("metrics line {line} of {} is malformed: {source}", .path.display())]
    MetricsParse {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
    #[error("artifact io failed for {}: {source}", .path.display())]
    ArtifactIo { path: PathBuf, source: io::Error },
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{0}")]
    Usage(String),
}

impl HarnessError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Generation { .. } => "generation_failed",
            Self::Format(err) => err.reason_code(),
            Self::MissingArtifact { .. } => "missing_artifact",
            Self::OracleLaunch { .. } => "oracle_launch_failed",
            Self::OracleFailed { .. } => "oracle_failed",
            Self::OracleParse { .. } => "oracle_parse_failed",
            Self::MetricsParse { .. } => "metrics_parse_failed",
            Self::ArtifactIo { .. } => "artifact_io",
            Self::Serialize(_) => "serialize_failed",
            Self::Usage(_) => "usage",
        }
    }

    /// Missing artifacts skip a case; everything else fails it.
    #[must_use]
    pub fn case_status(&self) -> CaseStatus {
        match self {
            Self::MissingArtifact { .. } => CaseStatus::Skip,
            _ => CaseStatus::Fail,
        }
    }

    pub(crate) fn artifact_io(path: &Path, source: io::Error) -> Self {
        Self::ArtifactIo {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<CodecError> for HarnessError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::MissingArtifact { path } => Self::MissingArtifact { path },
            CodecError::Io { path, message } => Self::ArtifactIo {
                path,
                source: io::Error::other(message),
            },
            format @ CodecError::Format { .. } => Self::Format(format),
        }
    }
}

/// Interpreter for the reference oracle: `SGP_ORACLE_PYTHON`, else `python3`.
#[must_use]
pub fn resolve_oracle_python() -> String {
    std::env::var(ORACLE_PYTHON_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "python3".to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleConfig {
    pub python: String,
    /// Run this script instead of the embedded capture script.
    pub script_override: Option<PathBuf>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            python: resolve_oracle_python(),
            script_override: None,
        }
    }
}

/// The implementation under test: `{program} {args...} {op} --output ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub dataset_root: PathBuf,
    pub candidate_root: PathBuf,
    pub report_root: PathBuf,
    pub log_path: Option<PathBuf>,
    pub base_seed: u64,
    pub oracle: OracleConfig,
    pub candidate: Option<CandidateCommand>,
}

impl HarnessConfig {
    #[must_use]
    pub fn default_paths() -> Self {
        let repo_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..");
        Self::rooted_at(&repo_root)
    }

    /// `datasets/`, `candidates/` and `reports/` under one directory.
    #[must_use]
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            dataset_root: root.join("datasets"),
            candidate_root: root.join("candidates"),
            report_root: root.join("reports"),
            log_path: None,
            base_seed: sgp_random::DEFAULT_DATASET_SEED,
            oracle: OracleConfig::default(),
            candidate: None,
        }
    }

    #[must_use]
    pub fn dataset_store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.dataset_root)
    }

    #[must_use]
    pub fn candidate_store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.candidate_root)
    }

    #[must_use]
    pub fn metrics_path(&self) -> PathBuf {
        self.dataset_root.join(METRICS_FILE)
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.dataset_root.join(MANIFEST_FILE)
    }

    /// Event ledger writing to `log_path`, or `SGP_EVENT_LOG_PATH` when unset.
    #[must_use]
    pub fn ledger(&self) -> EventLedger {
        EventLedger::resolve(self.log_path.as_deref())
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}

/// Tallies of every stage of a full run plus the rendered summary.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub generation: BatchTally,
    pub candidates: BatchTally,
    pub comparison: BatchTally,
    pub summary: Summary,
    pub report_files: Vec<PathBuf>,
}

impl BatchOutcome {
    /// Non-zero only when some stage had hard failures.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.generation
            .merged(self.candidates)
            .merged(self.comparison)
            .exit_code()
    }
}

/// Generate references, run the candidate (when configured), compare and
/// write the reports.
pub fn run_all(
    config: &HarnessConfig,
    catalog: &Catalog,
    oracle: &dyn ReferenceOracle,
    report: &ReportConfig,
    ledger: &mut EventLedger,
) -> Result<BatchOutcome, HarnessError> {
    let generation = generator::run_generation(config, catalog, oracle, ledger)?;
    let candidates = if config.candidate.is_some() {
        candidate::run_candidates(config, catalog, ledger)?
    } else {
        ledger.info("candidate", "*", "no candidate command configured");
        BatchTally::default()
    };
    let comparison = comparator::run_comparison(config, catalog, ledger)?;
    let summary = Summary::build(&comparison.results, comparison.tally, report);
    let report_files = render::write_reports(&config.report_root, &summary, report)?;
    Ok(BatchOutcome {
        generation: generation.tally,
        candidates,
        comparison: comparison.tally,
        summary,
        report_files,
    })
}

#[cfg(test)]
mod tests {
    use super::{HarnessConfig, HarnessError, OracleConfig};
    use sgp_io::CodecError;
    use sgp_runtime::CaseStatus;
    use std::path::{Path, PathBuf};

    #[test]
    fn default_paths_share_one_root() {
        let cfg = HarnessConfig::rooted_at(Path::new("/work"));
        assert_eq!(cfg.dataset_root, PathBuf::from("/work/datasets"));
        assert_eq!(cfg.candidate_root, PathBuf::from("/work/candidates"));
        assert_eq!(cfg.metrics_path(), PathBuf::from("/work/datasets/test_metrics.json"));
        assert!(cfg.candidate.is_none());
    }

    #[test]
    fn oracle_python_is_never_blank() {
        assert!(!OracleConfig::default().python.is_empty());
    }

    #[test]
    fn codec_errors_map_to_case_statuses() {
        let missing: HarnessError = CodecError::MissingArtifact {
            path: PathBuf::from("x.txt"),
        }
        .into();
        assert_eq!(missing.case_status(), CaseStatus::Skip);
        assert_eq!(missing.reason_code(), "missing_artifact");

        let format: HarnessError = sgp_io::decode("2 2\n1\n", None)
            .expect_err("header mismatch")
            .into();
        assert_eq!(format.case_status(), CaseStatus::Fail);
        assert_eq!(format.reason_code(), "codec_header_mismatch");
    }
}
