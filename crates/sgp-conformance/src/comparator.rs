//! Reference-versus-candidate comparison with RMSE and index-set metrics.

use crate::catalog::{Catalog, OutputSpec, TestCase};
use crate::{HarnessConfig, HarnessError};
use serde::{Deserialize, Serialize};
use sgp_artifact::{ElementKind, NumericArtifact};
use sgp_io::{ArtifactStore, ExpectedShape};
use sgp_runtime::{BatchTally, CaseStatus, EventLedger, FidelityStatus, append_jsonl};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;

const STAGE: &str = "compare";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Rmse,
    /// `reference_only + candidate_only` over index sets.
    IndexMismatch,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakSetCounts {
    pub common: usize,
    pub reference_only: usize,
    pub candidate_only: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonTag {
    ShapeMismatch,
    NonFinite,
}

impl ComparisonTag {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ShapeMismatch => "shape-mismatch",
            Self::NonFinite => "non-finite",
        }
    }
}

/// Metric of one reference/candidate pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub metric: MetricKind,
    /// Raw absolute RMSE, or the index mismatch count.
    pub value: f64,
    pub max_abs_diff: f64,
    /// `max |reference|`, for an amplitude-normalized view.
    pub reference_scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_counts: Option<PeakSetCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<ComparisonTag>,
}

impl Measurement {
    fn tagged(metric: MetricKind, value: f64, reference_scale: f64, tag: ComparisonTag) -> Self {
        Self {
            metric,
            value,
            max_abs_diff: value,
            reference_scale,
            peak_counts: None,
            tag: Some(tag),
        }
    }

    /// Tagged results are always `Review`.
    #[must_use]
    pub fn status(&self) -> FidelityStatus {
        if self.tag.is_some() {
            FidelityStatus::Review
        } else {
            FidelityStatus::from_metric(self.value)
        }
    }

    /// RMSE relative to the reference amplitude; the raw value when the
    /// reference is all zeros.
    #[must_use]
    pub fn normalized_value(&self) -> f64 {
        if self.metric == MetricKind::Rmse && self.reference_scale > 0.0 {
            self.value / self.reference_scale
        } else {
            self.value
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub module: String,
    pub feature: String,
    pub test: String,
    pub output: String,
    #[serde(flatten)]
    pub measurement: Measurement,
}

impl ComparisonResult {
    #[must_use]
    pub fn value(&self) -> f64 {
        self.measurement.value
    }

    #[must_use]
    pub fn status(&self) -> FidelityStatus {
        self.measurement.status()
    }

    /// `test` for single-output cases, `test:output` otherwise.
    #[must_use]
    pub fn label(&self) -> String {
        if self.output == "output" || self.output.is_empty() {
            self.test.clone()
        } else {
            format!("{}:{}", self.test, self.output)
        }
    }
}

fn multiplicities(values: &[i64]) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
}

/// Multiset comparison: a repeated index must be repeated on both sides.
fn compare_indices(reference: &[i64], candidate: &[i64], reference_scale: f64) -> Measurement {
    let reference = multiplicities(reference);
    let candidate = multiplicities(candidate);
    let mut counts = PeakSetCounts::default();
    for (index, &r) in &reference {
        let c = candidate.get(index).copied().unwrap_or(0);
        counts.common += r.min(c);
        counts.reference_only += r.saturating_sub(c);
    }
    for (index, &c) in &candidate {
        let r = reference.get(index).copied().unwrap_or(0);
        counts.candidate_only += c.saturating_sub(r);
    }
    let value = (counts.reference_only + counts.candidate_only) as f64;
    Measurement {
        metric: MetricKind::IndexMismatch,
        value,
        max_abs_diff: value,
        reference_scale,
        peak_counts: Some(counts),
        tag: None,
    }
}

/// Pure comparison of two decoded artifacts. Shape or element-kind
/// disagreement yields `+inf` tagged `shape-mismatch`; non-finite data
/// yields NaN tagged `non-finite`.
#[must_use]
pub fn compare_artifacts(reference: &NumericArtifact, candidate: &NumericArtifact) -> Measurement {
    let reference_scale = reference.max_abs();
    if let (Some(r), Some(c)) = (reference.as_indices(), candidate.as_indices()) {
        return compare_indices(r, c, reference_scale);
    }
    let metric = if reference.element_kind() == ElementKind::Index {
        MetricKind::IndexMismatch
    } else {
        MetricKind::Rmse
    };
    if reference.element_kind() != candidate.element_kind() || reference.shape() != candidate.shape() {
        return Measurement::tagged(
            metric,
            f64::INFINITY,
            reference_scale,
            ComparisonTag::ShapeMismatch,
        );
    }
    if reference.has_non_finite() || candidate.has_non_finite() {
        return Measurement::tagged(metric, f64::NAN, reference_scale, ComparisonTag::NonFinite);
    }

    let (ref_re, cand_re) = (
        reference.real_parts().unwrap_or(&[]),
        candidate.real_parts().unwrap_or(&[]),
    );
    let diffs: Vec<f64> = match (reference.imag_parts(), candidate.imag_parts()) {
        (Some(ref_im), Some(cand_im)) => ref_re
            .iter()
            .zip(ref_im)
            .zip(cand_re.iter().zip(cand_im))
            .map(|((rr, ri), (cr, ci))| (rr - cr).hypot(ri - ci))
            .collect(),
        _ => ref_re.iter().zip(cand_re).map(|(r, c)| (r - c).abs()).collect(),
    };
    let (value, max_abs_diff) = if diffs.is_empty() {
        (0.0, 0.0)
    } else {
        let mean_sq = diffs.iter().map(|d| d * d).sum::<f64>() / diffs.len() as f64;
        (mean_sq.sqrt(), diffs.iter().copied().fold(0.0, f64::max))
    };
    Measurement {
        metric,
        value,
        max_abs_diff,
        reference_scale,
        peak_counts: None,
        tag: None,
    }
}

/// Outcome for one declared output of a case.
#[derive(Debug)]
pub enum CaseComparison {
    Compared {
        result: ComparisonResult,
        warnings: Vec<String>,
    },
    Skipped {
        output: String,
        error: HarnessError,
    },
    Failed {
        output: String,
        error: HarnessError,
    },
}

impl CaseComparison {
    #[must_use]
    pub fn status(&self) -> CaseStatus {
        match self {
            Self::Compared { .. } => CaseStatus::Success,
            Self::Skipped { .. } => CaseStatus::Skip,
            Self::Failed { .. } => CaseStatus::Fail,
        }
    }
}

fn compare_output(
    case: &TestCase,
    spec: &OutputSpec,
    references: &ArtifactStore,
    candidates: &ArtifactStore,
) -> CaseComparison {
    let role = spec.role();
    let expected = ExpectedShape::of(spec.kind);
    let read = |store: &ArtifactStore| -> Result<_, HarnessError> {
        Ok(store.read(&case.family, &case.name, &role, &expected)?)
    };
    let decoded = read(references).and_then(|reference| read(candidates).map(|cand| (reference, cand)));
    match decoded {
        Ok((reference, candidate)) => {
            let mut warnings = reference.warnings;
            warnings.extend(candidate.warnings);
            CaseComparison::Compared {
                result: ComparisonResult {
                    module: case.module.clone(),
                    feature: case.feature.clone(),
                    test: case.name.clone(),
                    output: spec.label().to_string(),
                    measurement: compare_artifacts(&reference.artifact, &candidate.artifact),
                },
                warnings,
            }
        }
        Err(error) if error.case_status() == CaseStatus::Skip => CaseComparison::Skipped {
            output: spec.label().to_string(),
            error,
        },
        Err(error) => CaseComparison::Failed {
            output: spec.label().to_string(),
            error,
        },
    }
}

/// Compares every declared output of a case.
#[must_use]
pub fn compare_case(
    case: &TestCase,
    references: &ArtifactStore,
    candidates: &ArtifactStore,
) -> Vec<CaseComparison> {
    case.outputs
        .iter()
        .map(|spec| compare_output(case, spec, references, candidates))
        .collect()
}

/// One line of the metrics log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsLine {
    pub module: String,
    pub test: String,
    /// `null` when the metric is not finite.
    pub rmse: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
}

impl MetricsLine {
    #[must_use]
    pub fn from_result(result: &ComparisonResult) -> Self {
        let value = result.value();
        Self {
            module: result.module.clone(),
            test: result.label(),
            rmse: value.is_finite().then_some(value),
            feature: Some(result.feature.clone()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComparisonRun {
    pub results: Vec<ComparisonResult>,
    /// Counted per output.
    pub tally: BatchTally,
}

/// Compares every output of every case and rewrites the metrics log.
pub fn run_comparison(
    config: &HarnessConfig,
    catalog: &Catalog,
    ledger: &mut EventLedger,
) -> Result<ComparisonRun, HarnessError> {
    let references = config.dataset_store();
    let candidates = config.candidate_store();
    let metrics_path = config.metrics_path();
    match fs::remove_file(&metrics_path) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            let err = HarnessError::artifact_io(&metrics_path, err);
            ledger.error(STAGE, "*", err.reason_code(), format!("metrics log not reset: {err}"));
        }
    }

    let mut run = ComparisonRun::default();
    for case in catalog.cases() {
        let id = case.id();
        for outcome in compare_case(case, &references, &candidates) {
            match outcome {
                CaseComparison::Compared { result, warnings } => {
                    for warning in warnings {
                        ledger.warn(STAGE, &id, "codec_layout_fallback", warning);
                    }
                    if let Some(tag) = result.measurement.tag {
                        ledger.warn(
                            STAGE,
                            &id,
                            tag.as_str(),
                            format!("{} flagged {}", result.output, tag.as_str()),
                        );
                    }
                    if let Err(message) =
                        append_jsonl(&metrics_path, &MetricsLine::from_result(&result))
                    {
                        let err = HarnessError::artifact_io(
                            &metrics_path,
                            std::io::Error::other(message),
                        );
                        run.tally.record(CaseStatus::Fail);
                        ledger.error(STAGE, &id, err.reason_code(), format!("{}: {err}", result.output));
                        continue;
                    }
                    run.tally.record(CaseStatus::Success);
                    ledger.info(
                        STAGE,
                        &id,
                        format!(
                            "{} {} = {:e} ({})",
                            result.output,
                            match result.measurement.metric {
                                MetricKind::Rmse => "rmse",
                                MetricKind::IndexMismatch => "index_mismatch",
                            },
                            result.value(),
                            result.status().as_str()
                        ),
                    );
                    run.results.push(result);
                }
                CaseComparison::Skipped { output, error } => {
                    run.tally.record(CaseStatus::Skip);
                    ledger.warn(STAGE, &id, error.reason_code(), format!("{output}: {error}"));
                }
                CaseComparison::Failed { output, error } => {
                    run.tally.record(CaseStatus::Fail);
                    ledger.error(STAGE, &id, error.reason_code(), format!("{output}: {error}"));
                }
            }
        }
    }
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::{ComparisonTag, MetricKind, MetricsLine, compare_artifacts, run_comparison};
    use crate::HarnessConfig;
    use crate::catalog::Catalog;
    use sgp_runtime::{EventLedger, EventLevel};
    use std::time::{SystemTime, UNIX_EPOCH};
    use sgp_artifact::{ArtifactKind, ComplexVector, NumericArtifact, RealMatrix};
    use sgp_runtime::FidelityStatus;

    #[test]
    fn identical_vectors_are_excellent() {
        let a = NumericArtifact::RealVector(vec![1.0, -2.0, 3.5]);
        let m = compare_artifacts(&a, &a.clone());
        assert_eq!(m.metric, MetricKind::Rmse);
        assert_eq!(m.value, 0.0);
        assert_eq!(m.reference_scale, 3.5);
        assert_eq!(m.status(), FidelityStatus::Excellent);
    }

    #[test]
    fn rmse_and_max_difference() {
        let r = NumericArtifact::RealVector(vec![0.0, 0.0, 0.0, 0.0]);
        let c = NumericArtifact::RealVector(vec![1.0, -1.0, 1.0, -1.0]);
        let m = compare_artifacts(&r, &c);
        assert_eq!(m.value, 1.0);
        assert_eq!(m.max_abs_diff, 1.0);
        assert_eq!(m.status(), FidelityStatus::Review);
        assert_eq!(m.normalized_value(), 1.0);
    }

    #[test]
    fn complex_difference_uses_modulus() {
        let r = NumericArtifact::ComplexVector(ComplexVector::new(vec![0.0], vec![0.0]).expect("paired"));
        let c = NumericArtifact::ComplexVector(ComplexVector::new(vec![3.0], vec![4.0]).expect("paired"));
        assert_eq!(compare_artifacts(&r, &c).value, 5.0);
    }

    #[test]
    fn shape_mismatch_is_infinite_and_tagged() {
        let r = NumericArtifact::RealVector(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let c = NumericArtifact::RealVector(vec![1.0, 2.0, 3.0, 4.0]);
        let m = compare_artifacts(&r, &c);
        assert_eq!(m.value, f64::INFINITY);
        assert_eq!(m.tag, Some(ComparisonTag::ShapeMismatch));
        assert_eq!(m.status(), FidelityStatus::Review);

        let matrix = NumericArtifact::RealMatrix(RealMatrix::new(1, 5, vec![1.0; 5]).expect("1x5"));
        assert_eq!(compare_artifacts(&r, &matrix).tag, Some(ComparisonTag::ShapeMismatch));

        let complex = NumericArtifact::ComplexVector(ComplexVector::from_real(vec![1.0; 5]));
        assert_eq!(compare_artifacts(&r, &complex).tag, Some(ComparisonTag::ShapeMismatch));
    }

    #[test]
    fn non_finite_is_never_zero() {
        let r = NumericArtifact::RealVector(vec![1.0, f64::NAN]);
        let m = compare_artifacts(&r, &r.clone());
        assert!(m.value.is_nan());
        assert_eq!(m.tag, Some(ComparisonTag::NonFinite));
        assert_eq!(m.status(), FidelityStatus::Review);
    }

    #[test]
    fn empty_arrays_compare_equal() {
        let r = NumericArtifact::RealVector(Vec::new());
        assert_eq!(compare_artifacts(&r, &r.clone()).value, 0.0);
        let p = NumericArtifact::IndexSet(Vec::new());
        assert_eq!(compare_artifacts(&p, &p.clone()).value, 0.0);
    }

    #[test]
    fn index_sets_count_disagreements() {
        let r = NumericArtifact::IndexSet(vec![3, 10, 42]);
        let c = NumericArtifact::IndexSet(vec![3, 11, 42, 90]);
        let m = compare_artifacts(&r, &c);
        assert_eq!(m.metric, MetricKind::IndexMismatch);
        let counts = m.peak_counts.expect("set comparison");
        assert_eq!(counts.common, 2);
        assert_eq!(counts.reference_only, 1);
        assert_eq!(counts.candidate_only, 2);
        assert_eq!(m.value, 3.0);
        assert_eq!(m.status(), FidelityStatus::Review);
        assert_eq!(compare_artifacts(&r, &r.clone()).status(), FidelityStatus::Excellent);
    }

    #[test]
    fn repeated_indices_count_per_occurrence() {
        let r = NumericArtifact::IndexSet(vec![0, 0, 5]);
        let c = NumericArtifact::IndexSet(vec![0, 5, 5]);
        let m = compare_artifacts(&r, &c);
        let counts = m.peak_counts.expect("set comparison");
        assert_eq!(counts.common, 2);
        assert_eq!(counts.reference_only, 1);
        assert_eq!(counts.candidate_only, 1);
        assert_eq!(m.value, 2.0);
        assert_eq!(m.status(), FidelityStatus::Review);
    }

    #[test]
    fn peak_bases_compare_by_position() {
        let catalog = Catalog::standard();
        let case = catalog.find("peaks/properties_rel_0p5").expect("registered");
        for name in ["left_bases", "right_bases"] {
            let spec = case
                .outputs
                .iter()
                .find(|output| output.label() == name)
                .expect("declared");
            assert_eq!(spec.kind, ArtifactKind::RealVector, "{name}");
        }

        let reference = NumericArtifact::RealVector(vec![0.0, 0.0, 5.0]);
        let swapped = NumericArtifact::RealVector(vec![0.0, 5.0, 5.0]);
        let m = compare_artifacts(&reference, &swapped);
        assert_eq!(m.metric, MetricKind::Rmse);
        assert!(m.value > 2.0);
        assert_eq!(m.status(), FidelityStatus::Review);

        let short = NumericArtifact::RealVector(vec![0.0, 5.0]);
        assert_eq!(compare_artifacts(&reference, &short).tag, Some(ComparisonTag::ShapeMismatch));
    }

    #[test]
    fn square_matrices_of_different_order_do_not_subtract() {
        let r = NumericArtifact::RealMatrix(RealMatrix::new(3, 3, vec![1.0; 9]).expect("3x3"));
        let c = NumericArtifact::RealMatrix(RealMatrix::new(2, 2, vec![1.0; 4]).expect("2x2"));
        let m = compare_artifacts(&r, &c);
        assert_eq!(m.value, f64::INFINITY);
        assert_eq!(m.max_abs_diff, f64::INFINITY);
        assert_eq!(m.tag, Some(ComparisonTag::ShapeMismatch));
        assert_eq!(m.status(), FidelityStatus::Review);
    }

    #[test]
    fn unwritable_metrics_log_fails_each_result_without_aborting() {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock after epoch")
            .as_nanos();
        let root = std::env::temp_dir().join(format!("sgp_comparator_metrics_{ts}"));
        let config = HarnessConfig::rooted_at(&root);
        let catalog = Catalog::standard().filtered(|case| case.id().starts_with("correlate/basic_"));
        let artifact = NumericArtifact::RealVector(vec![1.0, 2.0]);
        for case in catalog.cases() {
            for store in [config.dataset_store(), config.candidate_store()] {
                store
                    .write(&case.family, &case.name, "output", &artifact)
                    .expect("output written");
            }
        }
        // A directory where the log should be: every append fails.
        std::fs::create_dir_all(config.metrics_path().join("occupied")).expect("blocking dir");

        let mut ledger = EventLedger::new();
        let run = run_comparison(&config, &catalog, &mut ledger).expect("batch completes");
        std::fs::remove_dir_all(&root).ok();
        assert_eq!(catalog.len(), 3);
        assert_eq!(run.tally.failed, 3);
        assert_eq!(run.tally.succeeded, 0);
        assert!(run.results.is_empty());
        assert_eq!(ledger.count(EventLevel::Error), 4);
    }

    #[test]
    fn metrics_line_keeps_module_test_rmse_keys() {
        let line = MetricsLine {
            module: "Signal".to_string(),
            test: "basic_full".to_string(),
            rmse: Some(1.5e-17),
            feature: None,
        };
        let json = serde_json::to_string(&line).expect("serializes");
        assert_eq!(json, r#"{"module":"Signal","test":"basic_full","rmse":1.5e-17}"#);
        let parsed: MetricsLine =
            serde_json::from_str(r#"{"module":"FFT","test":"rfft_n64","rmse":null}"#).expect("parses");
        assert_eq!(parsed.rmse, None);
        assert_eq!(parsed.feature, None);
    }
}
