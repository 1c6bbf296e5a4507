//! Reference oracles: the trusted implementations that compute expected outputs.

use crate::catalog::{TestCase, Transform};
use crate::{HarnessError, OracleConfig};
use serde::{Deserialize, Serialize};
use sgp_artifact::{ArtifactKind, ComplexMatrix, ComplexVector, NumericArtifact, RealMatrix};
use sgp_dsp::{ConvolveMode, DctNorm, DetrendKind, WindowKind};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const CAPTURE_SCHEMA_VERSION: u8 = 1;

const PY_CAPTURE_SCRIPT: &str = r#"
import json
import sys

import numpy as np
import scipy
import scipy.fft
import scipy.interpolate
import scipy.signal

job_path = sys.argv[1]
capture_path = sys.argv[2]

with open(job_path, 'r', encoding='utf-8') as fh:
    job = json.load(fh)

def decode(wire):
    kind = wire['kind']
    if kind == 'index_set':
        return np.asarray(wire.get('indices', []), dtype=np.int64)
    values = np.asarray([float(v) for v in wire.get('real', [])], dtype=float)
    if kind.startswith('complex'):
        imag = np.asarray([float(v) for v in wire.get('imag', [])], dtype=float)
        values = values + 1j * imag
    if kind == 'scalar':
        return values[0]
    return values.reshape(tuple(wire['shape']))

def encode(kind, value):
    arr = np.asarray(value)
    if kind == 'index_set':
        flat = [int(v) for v in arr.ravel()]
        return {'kind': kind, 'shape': [len(flat)], 'indices': flat}
    if kind == 'scalar':
        shape = []
    elif kind.endswith('matrix'):
        arr = np.atleast_2d(arr)
        shape = [int(d) for d in arr.shape]
    else:
        arr = arr.ravel()
        shape = [int(arr.size)]
    out = {'kind': kind, 'shape': shape, 'real': [repr(float(v)) for v in np.real(arr).ravel()]}
    if kind.startswith('complex'):
        out['imag'] = [repr(float(v)) for v in np.imag(arr).ravel()]
    return out

def iir_design(t):
    design = t['design']
    kwargs = {'btype': t['btype'], 'fs': t['fs'], 'output': 'ba'}
    wn = t['cutoff'][0] if len(t['cutoff']) == 1 else t['cutoff']
    order = t['order']
    if design == 'butter':
        return scipy.signal.butter(order, wn, **kwargs)
    if design == 'cheby1':
        return scipy.signal.cheby1(order, t['rp'], wn, **kwargs)
    if design == 'cheby2':
        return scipy.signal.cheby2(order, t['rs'], wn, **kwargs)
    if design == 'ellip':
        return scipy.signal.ellip(order, t['rp'], t['rs'], wn, **kwargs)
    if design == 'bessel':
        return scipy.signal.bessel(order, wn, **kwargs)
    raise ValueError(f'unsupported filter design: {design}')

def run(t, args):
    op = t['op']
    if op == 'correlate':
        return [scipy.signal.correlate(args[0], args[1], mode=t['mode'], method='direct')]
    if op == 'convolve':
        return [scipy.signal.convolve(args[0], args[1], mode=t['mode'], method='direct')]
    if op == 'correlate2d':
        return [scipy.signal.correlate2d(args[0], args[1], mode=t['mode'])]
    if op == 'convolve2d':
        return [scipy.signal.convolve2d(args[0], args[1], mode=t['mode'])]
    if op == 'fft':
        return [np.fft.fft(args[0])]
    if op == 'ifft':
        return [np.fft.ifft(args[0])]
    if op == 'rfft':
        return [np.fft.rfft(args[0])]
    if op == 'irfft':
        return [np.fft.irfft(args[0], n=t.get('n'))]
    if op == 'fft2':
        return [np.fft.fft2(args[0])]
    if op == 'ifft2':
        return [np.fft.ifft2(args[0])]
    if op == 'stft':
        f, tt, zxx = scipy.signal.stft(args[0], fs=t['fs'], nperseg=t['nperseg'],
                                       noverlap=t['noverlap'], nfft=t.get('nfft'))
        return [f, tt, zxx]
    if op == 'stft_roundtrip':
        _, _, zxx = scipy.signal.stft(args[0], fs=t['fs'], nperseg=t['nperseg'],
                                      noverlap=t['noverlap'])
        _, x = scipy.signal.istft(zxx, fs=t['fs'], nperseg=t['nperseg'],
                                  noverlap=t['noverlap'])
        return [zxx, x]
    if op == 'dct':
        norm = None if t['norm'] == 'none' else t['norm']
        return [scipy.fft.dct(args[0], type=2, norm=norm)]
    if op == 'idct':
        norm = None if t['norm'] == 'none' else t['norm']
        return [scipy.fft.idct(args[0], type=2, norm=norm)]
    if op == 'hilbert':
        return [scipy.signal.hilbert(args[0])]
    if op == 'window':
        return [scipy.signal.get_window(t['name'], t['m'], fftbins=not t['sym'])]
    if op == 'iir_filter':
        b, a = iir_design(t)
        return [scipy.signal.filtfilt(b, a, args[0])]
    if op == 'sosfilt':
        wn = t['wn'][0] if len(t['wn']) == 1 else t['wn']
        sos = scipy.signal.butter(t['order'], wn, btype=t['btype'], output='sos')
        return [scipy.signal.sosfilt(sos, args[0])]
    if op == 'firwin':
        cutoff = t['cutoff'][0] if len(t['cutoff']) == 1 else t['cutoff']
        return [scipy.signal.firwin(t['numtaps'], cutoff, pass_zero=t['btype'], fs=t['fs'])]
    if op == 'savgol_filter':
        return [scipy.signal.savgol_filter(args[0], t['window_length'], t['polyorder'],
                                           deriv=t['deriv'], delta=t['delta'])]
    if op == 'medfilt':
        return [scipy.signal.medfilt(args[0], kernel_size=t['kernel'])]
    if op == 'detrend':
        return [scipy.signal.detrend(args[0], type=t['kind'])]
    if op == 'welch':
        f, p = scipy.signal.welch(args[0], fs=t['fs'], nperseg=t['nperseg'],
                                  noverlap=t.get('noverlap'))
        return [f, p]
    if op == 'periodogram':
        f, p = scipy.signal.periodogram(args[0], fs=t['fs'])
        return [f, p]
    if op == 'spectrogram':
        f, tt, sxx = scipy.signal.spectrogram(args[0], fs=t['fs'], nperseg=t['nperseg'],
                                              noverlap=t['noverlap'])
        return [f, tt, sxx]
    if op == 'find_peaks':
        peaks, _ = scipy.signal.find_peaks(args[0], height=t.get('height'),
                                           distance=t.get('distance'),
                                           prominence=t.get('prominence'))
        return [peaks]
    if op == 'peak_properties':
        peaks, _ = scipy.signal.find_peaks(args[0], height=t.get('height'),
                                           distance=t.get('distance'))
        prominences, left_bases, right_bases = scipy.signal.peak_prominences(args[0], peaks)
        widths, width_heights, left_ips, right_ips = scipy.signal.peak_widths(
            args[0], peaks, rel_height=t['rel_height'])
        return [peaks, prominences, left_bases, right_bases,
                widths, width_heights, left_ips, right_ips]
    if op == 'interp1d':
        x, xp, fp = args
        if t['kind'] == 'linear':
            return [np.interp(x, xp, fp)]
        spline = scipy.interpolate.CubicSpline(xp, fp, bc_type='natural', extrapolate=True)
        return [spline(x)]
    if op == 'resample':
        return [scipy.signal.resample(args[0], t['num'])]
    if op == 'polyfit':
        return [np.polyfit(args[0], args[1], t['deg'])]
    if op == 'polyval':
        return [np.polyval(args[0], args[1])]
    if op == 'gaussian_decay':
        return [np.exp(-np.asarray(args[0]) ** 2)]
    raise ValueError(f'unsupported op: {op}')

cases = []
for case in job['cases']:
    try:
        args = [decode(wire) for wire in case['inputs']]
        values = run(case['transform'], args)
        kinds = case['outputs']
        if len(values) != len(kinds):
            raise ValueError(f'{len(values)} outputs for {len(kinds)} declared')
        outputs = [encode(kind, value) for kind, value in zip(kinds, values)]
        cases.append({'id': case['id'], 'status': 'ok', 'error': None, 'outputs': outputs})
    except Exception as exc:
        cases.append({'id': case['id'], 'status': 'error',
                      'error': f'{type(exc).__name__}: {exc}', 'outputs': []})

capture = {
    'schema_version': 1,
    'oracle_source': f'scipy {scipy.__version__} / numpy {np.__version__}',
    'cases': cases,
}
with open(capture_path, 'w', encoding='utf-8') as fh:
    json.dump(capture, fh, indent=2)
"#;

/// One case handed to an oracle: the registered case plus its materialized inputs.
#[derive(Debug, Clone)]
pub struct OracleJob<'a> {
    pub case: &'a TestCase,
    pub inputs: Vec<NumericArtifact>,
}

/// Per-case outcome: the outputs in declaration order, or the oracle's error text.
pub type OracleOutcome = Result<Vec<NumericArtifact>, String>;

pub trait ReferenceOracle {
    fn name(&self) -> &'static str;

    fn supports(&self, _transform: &Transform) -> bool {
        true
    }

    /// Evaluates a batch. The outer error aborts the whole batch; per-case
    /// errors come back in the inner results, one per job in order.
    fn evaluate(&self, jobs: &[OracleJob<'_>]) -> Result<Vec<OracleOutcome>, HarnessError>;
}

/// Array on the JSON wire. Floats travel as strings so `nan` and `inf` survive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireArtifact {
    pub kind: ArtifactKind,
    pub shape: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub real: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imag: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<i64>,
}

fn wire_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        format!("{value:?}")
    }
}

fn parse_wire_floats(values: &[String]) -> Result<Vec<f64>, String> {
    values
        .iter()
        .map(|raw| {
            raw.trim()
                .parse::<f64>()
                .map_err(|err| format!("bad float token '{raw}': {err}"))
        })
        .collect()
}

impl WireArtifact {
    #[must_use]
    pub fn from_artifact(artifact: &NumericArtifact) -> Self {
        let real = artifact
            .real_parts()
            .map(|values| values.iter().copied().map(wire_float).collect())
            .unwrap_or_default();
        let imag = artifact
            .imag_parts()
            .map(|values| values.iter().copied().map(wire_float).collect())
            .unwrap_or_default();
        Self {
            kind: artifact.kind(),
            shape: artifact.shape().dims(),
            real,
            imag,
            indices: artifact.as_indices().map(<[i64]>::to_vec).unwrap_or_default(),
        }
    }

    pub fn into_artifact(self) -> Result<NumericArtifact, String> {
        let matrix_dims = || match self.shape.as_slice() {
            [rows, cols] => Ok((*rows, *cols)),
            other => Err(format!("{} needs a 2-d shape, got {other:?}", self.kind.as_str())),
        };
        let artifact = match self.kind {
            ArtifactKind::IndexSet => NumericArtifact::IndexSet(self.indices.clone()),
            ArtifactKind::Scalar => {
                let values = parse_wire_floats(&self.real)?;
                match values.as_slice() {
                    [value] => NumericArtifact::Scalar(*value),
                    _ => return Err(format!("scalar holds {} values", values.len())),
                }
            }
            ArtifactKind::RealVector => NumericArtifact::RealVector(parse_wire_floats(&self.real)?),
            ArtifactKind::ComplexVector => NumericArtifact::ComplexVector(
                ComplexVector::new(parse_wire_floats(&self.real)?, parse_wire_floats(&self.imag)?)
                    .map_err(|err| err.to_string())?,
            ),
            ArtifactKind::RealMatrix => {
                let (rows, cols) = matrix_dims()?;
                NumericArtifact::RealMatrix(
                    RealMatrix::new(rows, cols, parse_wire_floats(&self.real)?)
                        .map_err(|err| err.to_string())?,
                )
            }
            ArtifactKind::ComplexMatrix => {
                let (rows, cols) = matrix_dims()?;
                NumericArtifact::ComplexMatrix(
                    ComplexMatrix::new(
                        rows,
                        cols,
                        parse_wire_floats(&self.real)?,
                        parse_wire_floats(&self.imag)?,
                    )
                    .map_err(|err| err.to_string())?,
                )
            }
        };
        Ok(artifact)
    }
}

#[derive(Debug, Serialize)]
struct WireJobCase {
    id: String,
    transform: Transform,
    inputs: Vec<WireArtifact>,
    outputs: Vec<ArtifactKind>,
}

#[derive(Debug, Serialize)]
struct WireJob {
    schema_version: u8,
    cases: Vec<WireJobCase>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleCaptureCase {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub outputs: Vec<WireArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleCapture {
    pub schema_version: u8,
    pub oracle_source: String,
    pub cases: Vec<OracleCaptureCase>,
}

pub fn load_oracle_capture(path: &Path) -> Result<OracleCapture, HarnessError> {
    let raw = fs::read_to_string(path).map_err(|err| HarnessError::artifact_io(path, err))?;
    serde_json::from_str(&raw).map_err(|source| HarnessError::OracleParse {
        path: path.to_path_buf(),
        source,
    })
}

/// SciPy/NumPy reference run out of process through an embedded capture script.
#[derive(Debug, Clone)]
pub struct PythonOracle {
    python: String,
    script_override: Option<PathBuf>,
    scratch_dir: PathBuf,
}

impl PythonOracle {
    #[must_use]
    pub fn new(config: &OracleConfig, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            python: config.python.clone(),
            script_override: config.script_override.clone(),
            scratch_dir: scratch_dir.into(),
        }
    }

    #[must_use]
    pub fn python(&self) -> &str {
        &self.python
    }

    fn job_paths(&self) -> (PathBuf, PathBuf) {
        (
            self.scratch_dir.join("oracle_job.json"),
            self.scratch_dir.join("oracle_capture.json"),
        )
    }

    fn run_capture(&self, job_path: &Path, capture_path: &Path) -> Result<(), HarnessError> {
        let mut command = Command::new(&self.python);
        match &self.script_override {
            Some(script) => command.arg(script),
            None => command.arg("-c").arg(PY_CAPTURE_SCRIPT),
        };
        let output = command
            .arg(job_path)
            .arg(capture_path)
            .output()
            .map_err(|source| HarnessError::OracleLaunch {
                python: self.python.clone(),
                source,
            })?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = if stderr.contains("No module named 'scipy'")
            || stderr.contains("No module named 'numpy'")
        {
            "scipy/numpy are not importable by this interpreter".to_string()
        } else {
            format!("status={} stderr={}", output.status, stderr.trim())
        };
        Err(HarnessError::OracleFailed {
            python: self.python.clone(),
            stderr,
        })
    }
}

impl ReferenceOracle for PythonOracle {
    fn name(&self) -> &'static str {
        "python"
    }

    fn evaluate(&self, jobs: &[OracleJob<'_>]) -> Result<Vec<OracleOutcome>, HarnessError> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }
        fs::create_dir_all(&self.scratch_dir)
            .map_err(|err| HarnessError::artifact_io(&self.scratch_dir, err))?;
        let (job_path, capture_path) = self.job_paths();

        let wire = WireJob {
            schema_version: CAPTURE_SCHEMA_VERSION,
            cases: jobs
                .iter()
                .map(|job| WireJobCase {
                    id: job.case.id(),
                    transform: job.case.transform.clone(),
                    inputs: job.inputs.iter().map(WireArtifact::from_artifact).collect(),
                    outputs: job.case.outputs.iter().map(|output| output.kind).collect(),
                })
                .collect(),
        };
        let payload = serde_json::to_string_pretty(&wire)?;
        fs::write(&job_path, payload).map_err(|err| HarnessError::artifact_io(&job_path, err))?;

        self.run_capture(&job_path, &capture_path)?;
        let capture = load_oracle_capture(&capture_path)?;

        let mut by_id: BTreeMap<String, OracleCaptureCase> = capture
            .cases
            .into_iter()
            .map(|case| (case.id.clone(), case))
            .collect();
        Ok(jobs
            .iter()
            .map(|job| {
                let id = job.case.id();
                let Some(case) = by_id.remove(&id) else {
                    return Err(format!("oracle capture has no entry for {id}"));
                };
                if case.status != "ok" {
                    return Err(case.error.unwrap_or_else(|| "oracle reported an error".to_string()));
                }
                case.outputs
                    .into_iter()
                    .map(WireArtifact::into_artifact)
                    .collect()
            })
            .collect())
    }
}

/// Offline oracle over the `sgp-dsp` kernels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeOracle;

impl ReferenceOracle for NativeOracle {
    fn name(&self) -> &'static str {
        "native"
    }

    fn supports(&self, transform: &Transform) -> bool {
        match transform {
            Transform::Stft { .. }
            | Transform::StftRoundtrip { .. }
            | Transform::IirFilter { .. }
            | Transform::Sosfilt { .. }
            | Transform::Firwin { .. }
            | Transform::SavgolFilter { .. }
            | Transform::Spectrogram { .. } => false,
            Transform::Window { name, .. } => WindowKind::parse(name).is_ok(),
            _ => true,
        }
    }

    fn evaluate(&self, jobs: &[OracleJob<'_>]) -> Result<Vec<OracleOutcome>, HarnessError> {
        Ok(jobs
            .iter()
            .map(|job| evaluate_native(&job.case.transform, &job.inputs))
            .collect())
    }
}

fn dsp<T>(result: Result<T, sgp_dsp::DspError>) -> Result<T, String> {
    result.map_err(|err| format!("{err} ({})", err.reason_code()))
}

fn real_input(inputs: &[NumericArtifact], idx: usize) -> Result<&[f64], String> {
    match inputs.get(idx) {
        Some(NumericArtifact::RealVector(values)) => Ok(values),
        Some(NumericArtifact::Scalar(value)) => Ok(std::slice::from_ref(value)),
        Some(other) => Err(format!("input {idx} must be a real vector, got {}", other.kind().as_str())),
        None => Err(format!("missing input {idx}")),
    }
}

fn complex_input(inputs: &[NumericArtifact], idx: usize) -> Result<ComplexVector, String> {
    match inputs.get(idx) {
        Some(NumericArtifact::ComplexVector(values)) => Ok(values.clone()),
        Some(NumericArtifact::RealVector(values)) => Ok(ComplexVector::from_real(values.clone())),
        Some(other) => Err(format!("input {idx} must be a vector, got {}", other.kind().as_str())),
        None => Err(format!("missing input {idx}")),
    }
}

fn matrix_input(inputs: &[NumericArtifact], idx: usize) -> Result<&RealMatrix, String> {
    match inputs.get(idx) {
        Some(NumericArtifact::RealMatrix(matrix)) => Ok(matrix),
        Some(other) => Err(format!("input {idx} must be a real matrix, got {}", other.kind().as_str())),
        None => Err(format!("missing input {idx}")),
    }
}

fn complex_matrix_input(inputs: &[NumericArtifact], idx: usize) -> Result<&ComplexMatrix, String> {
    match inputs.get(idx) {
        Some(NumericArtifact::ComplexMatrix(matrix)) => Ok(matrix),
        Some(other) => Err(format!(
            "input {idx} must be a complex matrix, got {}",
            other.kind().as_str()
        )),
        None => Err(format!("missing input {idx}")),
    }
}

fn index_set(positions: &[usize]) -> Result<NumericArtifact, String> {
    positions
        .iter()
        .map(|&pos| i64::try_from(pos).map_err(|_| format!("index {pos} overflows i64")))
        .collect::<Result<Vec<_>, _>>()
        .map(NumericArtifact::IndexSet)
}

/// Computes one case with the native kernels.
pub fn evaluate_native(transform: &Transform, inputs: &[NumericArtifact]) -> OracleOutcome {
    use NumericArtifact::{ComplexMatrix as CMat, ComplexVector as CVec, RealMatrix as RMat, RealVector as RVec};

    let outputs = match transform {
        Transform::Correlate { mode } => {
            let mode = dsp(ConvolveMode::parse(mode))?;
            vec![RVec(dsp(sgp_dsp::correlate(real_input(inputs, 0)?, real_input(inputs, 1)?, mode))?)]
        }
        Transform::Convolve { mode } => {
            let mode = dsp(ConvolveMode::parse(mode))?;
            vec![RVec(dsp(sgp_dsp::convolve(real_input(inputs, 0)?, real_input(inputs, 1)?, mode))?)]
        }
        Transform::Correlate2d { mode } => {
            let mode = dsp(ConvolveMode::parse(mode))?;
            vec![RMat(dsp(sgp_dsp::correlate2d(
                matrix_input(inputs, 0)?,
                matrix_input(inputs, 1)?,
                mode,
            ))?)]
        }
        Transform::Convolve2d { mode } => {
            let mode = dsp(ConvolveMode::parse(mode))?;
            vec![RMat(dsp(sgp_dsp::convolve2d(
                matrix_input(inputs, 0)?,
                matrix_input(inputs, 1)?,
                mode,
            ))?)]
        }
        Transform::Fft => vec![CVec(dsp(sgp_dsp::fft(&complex_input(inputs, 0)?))?)],
        Transform::Ifft => vec![CVec(dsp(sgp_dsp::ifft(&complex_input(inputs, 0)?))?)],
        Transform::Rfft => vec![CVec(dsp(sgp_dsp::rfft(real_input(inputs, 0)?))?)],
        Transform::Irfft { n } => vec![RVec(dsp(sgp_dsp::irfft(&complex_input(inputs, 0)?, *n))?)],
        Transform::Fft2 => vec![CMat(dsp(sgp_dsp::fft2(complex_matrix_input(inputs, 0)?))?)],
        Transform::Ifft2 => vec![CMat(dsp(sgp_dsp::ifft2(complex_matrix_input(inputs, 0)?))?)],
        Transform::Dct { norm } => {
            let norm = dsp(DctNorm::parse(norm))?;
            vec![RVec(dsp(sgp_dsp::dct2(real_input(inputs, 0)?, norm))?)]
        }
        Transform::Idct { norm } => {
            let norm = dsp(DctNorm::parse(norm))?;
            vec![RVec(dsp(sgp_dsp::idct2(real_input(inputs, 0)?, norm))?)]
        }
        Transform::Hilbert => vec![CVec(dsp(sgp_dsp::hilbert(real_input(inputs, 0)?))?)],
        Transform::Window { name, m, sym } => {
            let kind = dsp(WindowKind::parse(name))?;
            vec![RVec(dsp(sgp_dsp::get_window(kind, *m, *sym))?)]
        }
        Transform::Medfilt { kernel } => {
            vec![RVec(dsp(sgp_dsp::medfilt(real_input(inputs, 0)?, *kernel))?)]
        }
        Transform::Detrend { kind } => {
            let kind = dsp(DetrendKind::parse(kind))?;
            vec![RVec(dsp(sgp_dsp::detrend(real_input(inputs, 0)?, kind))?)]
        }
        Transform::Welch {
            fs,
            nperseg,
            noverlap,
        } => {
            let (freqs, psd) = dsp(sgp_dsp::welch(real_input(inputs, 0)?, *fs, *nperseg, *noverlap))?;
            vec![RVec(freqs), RVec(psd)]
        }
        Transform::Periodogram { fs } => {
            let (freqs, psd) = dsp(sgp_dsp::periodogram(real_input(inputs, 0)?, *fs))?;
            vec![RVec(freqs), RVec(psd)]
        }
        Transform::FindPeaks {
            height,
            distance,
            prominence,
        } => {
            let peaks = dsp(sgp_dsp::find_peaks(
                real_input(inputs, 0)?,
                *height,
                *distance,
                *prominence,
            ))?;
            vec![index_set(&peaks)?]
        }
        Transform::PeakProperties {
            height,
            distance,
            rel_height,
        } => {
            let x = real_input(inputs, 0)?;
            let peaks = dsp(sgp_dsp::find_peaks(x, *height, *distance, None))?;
            let (prominences, left_bases, right_bases) = dsp(sgp_dsp::peak_prominences(x, &peaks))?;
            let widths = dsp(sgp_dsp::peak_widths(x, &peaks, *rel_height))?;
            let positions =
                |bases: &[usize]| -> Vec<f64> { bases.iter().map(|&pos| pos as f64).collect() };
            vec![
                index_set(&peaks)?,
                RVec(prominences),
                RVec(positions(&left_bases)),
                RVec(positions(&right_bases)),
                RVec(widths.widths),
                RVec(widths.width_heights),
                RVec(widths.left_ips),
                RVec(widths.right_ips),
            ]
        }
        Transform::Interp1d { kind } => {
            let (x, xp, fp) = (real_input(inputs, 0)?, real_input(inputs, 1)?, real_input(inputs, 2)?);
            let y = match kind.as_str() {
                "linear" => dsp(sgp_dsp::interp_linear(x, xp, fp))?,
                "cubic" => dsp(sgp_dsp::natural_cubic_spline(x, xp, fp))?,
                other => return Err(format!("interpolation kind '{other}' has no native kernel")),
            };
            vec![RVec(y)]
        }
        Transform::Resample { num } => {
            vec![RVec(dsp(sgp_dsp::resample(real_input(inputs, 0)?, *num))?)]
        }
        Transform::Polyfit { deg } => {
            vec![RVec(dsp(sgp_dsp::polyfit(real_input(inputs, 0)?, real_input(inputs, 1)?, *deg))?)]
        }
        Transform::Polyval => {
            vec![RVec(sgp_dsp::polyval(real_input(inputs, 0)?, real_input(inputs, 1)?))]
        }
        Transform::GaussianDecay => vec![RVec(sgp_dsp::gaussian_decay(real_input(inputs, 0)?))],
        Transform::Stft { .. }
        | Transform::StftRoundtrip { .. }
        | Transform::IirFilter { .. }
        | Transform::Sosfilt { .. }
        | Transform::Firwin { .. }
        | Transform::SavgolFilter { .. }
        | Transform::Spectrogram { .. } => {
            return Err(format!("op '{}' has no native kernel", transform.op()));
        }
    };
    Ok(outputs)
}
