use crate::comparator::{ComparisonResult, Measurement, MetricKind, MetricsLine};
use crate::render::ReportConfig;
use crate::HarnessError;
use serde::Serialize;
use sgp_runtime::{BatchTally, FidelityStatus};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Report order of the known modules; others follow alphabetically.
pub const MODULE_ORDER: [&str; 10] = [
    "Filters", "FFT", "Spectral", "SOS Filt", "2D Ops", "Math", "DCT", "ODE", "Poly", "Signal",
];

#[must_use]
pub fn module_rank(module: &str) -> usize {
    MODULE_ORDER
        .iter()
        .position(|known| *known == module)
        .unwrap_or(MODULE_ORDER.len())
}

fn compare_modules(a: &str, b: &str) -> Ordering {
    module_rank(a).cmp(&module_rank(b)).then_with(|| a.cmp(b))
}

/// NaN sorts above every number.
fn severity(value: f64) -> f64 {
    if value.is_nan() { f64::INFINITY } else { value }
}

fn worse(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) }
}

/// Upper bound of `value` rounded to `1`, `5` or `10` times its decade.
#[must_use]
pub fn format_rmse(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    if value <= 0.0 {
        return "< 1e-18".to_string();
    }
    let mut exponent = value.log10().floor() as i32;
    if 10f64.powi(exponent) > value {
        exponent -= 1;
    } else if 10f64.powi(exponent + 1) <= value {
        exponent += 1;
    }
    let ratio = value / 10f64.powi(exponent);
    let (mantissa, exponent) = if ratio > 5.0 {
        (1, exponent + 1)
    } else if ratio > 1.0 {
        (5, exponent)
    } else {
        (1, exponent)
    };
    if exponent < 0 {
        format!("< {mantissa}e{exponent}")
    } else {
        format!("< {mantissa}e+{exponent:02}")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Feature label for metric lines that carry none.
#[must_use]
pub fn infer_feature(module: &str, test: &str) -> String {
    let name = test.strip_prefix("test_").unwrap_or(test).to_lowercase();
    let has = |needle: &str| name.contains(needle);
    let family = match module {
        "Filters" if has("butter") => Some("Butterworth"),
        "Filters" if has("cheby1") => Some("Chebyshev I"),
        "Filters" if has("cheby2") => Some("Chebyshev II"),
        "Filters" if has("ellip") => Some("Elliptic"),
        "Filters" if has("bessel") => Some("Bessel"),
        "FFT" if has("stft") => Some("STFT / ISTFT"),
        "FFT" if has("rfft") => Some("RFFT / IRFFT"),
        "FFT" if has("fft") => Some("FFT / IFFT"),
        "2D Ops" if has("fft2") => Some("FFT2 / IFFT2"),
        "2D Ops" if has("correlate2d") => Some("Correlate2d"),
        "2D Ops" if has("conv") => Some("Convolve2d"),
        _ => None,
    };
    match family {
        Some(feature) => feature.to_string(),
        None => capitalize(name.split(['_', ':']).next().unwrap_or_default()),
    }
}

/// Reads a metrics log. Lines without a feature get an inferred one; a null
/// metric reads as `+inf`.
pub fn load_metrics(path: &Path) -> Result<Vec<ComparisonResult>, HarnessError> {
    let raw = fs::read_to_string(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            HarnessError::MissingArtifact {
                path: path.to_path_buf(),
            }
        } else {
            HarnessError::artifact_io(path, err)
        }
    })?;
    let mut results = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed: MetricsLine =
            serde_json::from_str(line).map_err(|source| HarnessError::MetricsParse {
                path: path.to_path_buf(),
                line: idx + 1,
                source,
            })?;
        let feature = parsed
            .feature
            .unwrap_or_else(|| infer_feature(&parsed.module, &parsed.test));
        let value = parsed.rmse.unwrap_or(f64::INFINITY);
        let (test, output) = match parsed.test.split_once(':') {
            Some((test, output)) => (test.to_string(), output.to_string()),
            None => (parsed.test, "output".to_string()),
        };
        results.push(ComparisonResult {
            module: parsed.module,
            feature,
            test,
            output,
            measurement: Measurement {
                metric: MetricKind::Rmse,
                value,
                max_abs_diff: value,
                reference_scale: 0.0,
                peak_counts: None,
                tag: None,
            },
        });
    }
    Ok(results)
}

/// Worst metric of one `(module, feature)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub module: String,
    pub feature: String,
    pub worst: f64,
    pub status: FidelityStatus,
    pub display: String,
    pub cases: usize,
}

/// One row per `(module, feature)` in report order.
#[must_use]
pub fn aggregate(results: &[ComparisonResult]) -> Vec<FeatureRow> {
    let mut groups: BTreeMap<(&str, &str), (f64, FidelityStatus, usize)> = BTreeMap::new();
    for result in results {
        let entry = groups
            .entry((result.module.as_str(), result.feature.as_str()))
            .or_insert((0.0, FidelityStatus::Excellent, 0));
        entry.0 = worse(entry.0, result.value());
        entry.1 = entry.1.max(result.status());
        entry.2 += 1;
    }
    let mut rows: Vec<FeatureRow> = groups
        .into_iter()
        .map(|((module, feature), (worst, status, cases))| FeatureRow {
            module: module.to_string(),
            feature: feature.to_string(),
            worst,
            status,
            display: format_rmse(worst),
            cases,
        })
        .collect();
    rows.sort_by(|a, b| compare_modules(&a.module, &b.module).then_with(|| a.feature.cmp(&b.feature)));
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Offender {
    pub module: String,
    pub feature: String,
    pub test: String,
    pub output: String,
    pub value: f64,
    pub normalized: f64,
    pub display: String,
    pub status: FidelityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<&'static str>,
}

/// Everything the reporter renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub title: String,
    pub tally: BatchTally,
    pub rows: Vec<FeatureRow>,
    pub worst_offenders: Vec<Offender>,
}

impl Summary {
    #[must_use]
    pub fn build(results: &[ComparisonResult], tally: BatchTally, config: &ReportConfig) -> Self {
        let mut ranked: Vec<&ComparisonResult> = results.iter().collect();
        ranked.sort_by(|a, b| {
            severity(b.value())
                .total_cmp(&severity(a.value()))
                .then_with(|| a.label().cmp(&b.label()))
        });
        let worst_offenders = ranked
            .into_iter()
            .take(config.worst_offenders)
            .map(|result| Offender {
                module: result.module.clone(),
                feature: result.feature.clone(),
                test: result.test.clone(),
                output: result.output.clone(),
                value: result.value(),
                normalized: result.measurement.normalized_value(),
                display: format_rmse(result.value()),
                status: result.status(),
                tag: result.measurement.tag.map(|tag| tag.as_str()),
            })
            .collect();
        Self {
            title: config.title.clone(),
            tally,
            rows: aggregate(results),
            worst_offenders,
        }
    }

    /// Rows with the given status.
    #[must_use]
    pub fn count(&self, status: FidelityStatus) -> usize {
        self.rows.iter().filter(|row| row.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::{Summary, aggregate, format_rmse, infer_feature, load_metrics, module_rank};
    use crate::comparator::{ComparisonResult, Measurement, MetricKind};
    use crate::render::ReportConfig;
    use sgp_runtime::{BatchTally, FidelityStatus};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn result(module: &str, feature: &str, test: &str, value: f64) -> ComparisonResult {
        ComparisonResult {
            module: module.to_string(),
            feature: feature.to_string(),
            test: test.to_string(),
            output: "output".to_string(),
            measurement: Measurement {
                metric: MetricKind::Rmse,
                value,
                max_abs_diff: value,
                reference_scale: 1.0,
                peak_counts: None,
                tag: None,
            },
        }
    }

    #[test]
    fn rmse_bounds_round_up_to_clean_values() {
        assert_eq!(format_rmse(0.0), "< 1e-18");
        assert_eq!(format_rmse(3.2e-9), "< 5e-9");
        assert_eq!(format_rmse(7.0e-3), "< 1e-2");
        assert_eq!(format_rmse(1.0e-12), "< 1e-12");
        assert_eq!(format_rmse(1.0), "< 1e+00");
        assert_eq!(format_rmse(2.0), "< 5e+00");
        assert_eq!(format_rmse(60.0), "< 1e+02");
        assert_eq!(format_rmse(f64::NAN), "n/a");
        assert_eq!(format_rmse(f64::INFINITY), "n/a");
    }

    #[test]
    fn features_are_inferred_from_test_names() {
        assert_eq!(infer_feature("Filters", "test_cheby2_bandstop"), "Chebyshev II");
        assert_eq!(infer_feature("FFT", "irfft_n64"), "RFFT / IRFFT");
        assert_eq!(infer_feature("FFT", "test_istft_roundtrip"), "STFT / ISTFT");
        assert_eq!(infer_feature("FFT", "ifft_n64"), "FFT / IFFT");
        assert_eq!(infer_feature("2D Ops", "ifft2_4x3"), "FFT2 / IFFT2");
        assert_eq!(infer_feature("Signal", "test_medfilt_k3"), "Medfilt");
    }

    #[test]
    fn rows_follow_module_priority_and_keep_worst() {
        let results = vec![
            result("Signal", "Correlate", "a", 1e-12),
            result("Custom", "Thing", "b", 1e-3),
            result("Filters", "Butterworth", "c", 2e-10),
            result("Filters", "Butterworth", "d", 4e-7),
            result("FFT", "FFT / IFFT", "e", f64::NAN),
            result("FFT", "FFT / IFFT", "f", 1.0),
        ];
        let rows = aggregate(&results);
        let order: Vec<&str> = rows.iter().map(|row| row.module.as_str()).collect();
        assert_eq!(order, vec!["Filters", "FFT", "Signal", "Custom"]);
        assert_eq!(rows[0].worst, 4e-7);
        assert_eq!(rows[0].status, FidelityStatus::Good);
        assert_eq!(rows[0].cases, 2);
        assert!(rows[1].worst.is_nan());
        assert_eq!(rows[1].status, FidelityStatus::Review);
        assert_eq!(rows[1].display, "n/a");
        assert_eq!(rows[2].status, FidelityStatus::Excellent);
        assert_eq!(module_rank("Custom"), 10);
    }

    #[test]
    fn worst_offenders_are_sorted_and_capped() {
        let results = vec![
            result("Signal", "Correlate", "small", 1e-15),
            result("Signal", "Correlate", "big", 1e-2),
            result("Signal", "Correlate", "broken", f64::NAN),
        ];
        let config = ReportConfig {
            worst_offenders: 2,
            ..ReportConfig::default()
        };
        let summary = Summary::build(&results, BatchTally::default(), &config);
        let tests: Vec<&str> = summary.worst_offenders.iter().map(|o| o.test.as_str()).collect();
        assert_eq!(tests, vec!["broken", "big"]);
        assert_eq!(summary.count(FidelityStatus::Review), 1);
    }

    #[test]
    fn metrics_log_loads_with_inferred_features() {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock after epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("sgp_metrics_{ts}.json"));
        std::fs::write(
            &path,
            concat!(
                "{\"module\":\"Filters\",\"test\":\"test_ellip_lowpass\",\"rmse\":3.2e-9}\n",
                "\n",
                "{\"module\":\"Spectral\",\"test\":\"welch:psd\",\"rmse\":null,\"feature\":\"Welch\"}\n",
            ),
        )
        .expect("write metrics");
        let results = load_metrics(&path).expect("parses");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].feature, "Elliptic");
        assert_eq!(results[0].value(), 3.2e-9);
        assert_eq!(results[1].output, "psd");
        assert_eq!(results[1].value(), f64::INFINITY);

        std::fs::write(&path, "{not json}\n").expect("write metrics");
        let err = load_metrics(&path).expect_err("malformed");
        assert_eq!(err.reason_code(), "metrics_parse_failed");
        std::fs::remove_file(&path).ok();
    }
}
