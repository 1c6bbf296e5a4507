//! Registered test cases: which transform runs, on which synthesized inputs,
//! producing which named reference outputs.

use crate::HarnessError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sgp_artifact::{ArtifactKind, ComplexMatrix, ComplexVector, NumericArtifact, RealMatrix};
use sgp_dsp::WindowKind;
use sgp_io::role_name;
use sgp_random::{DeterministicRng, RandomError};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Transform {
    Correlate { mode: String },
    Convolve { mode: String },
    Correlate2d { mode: String },
    Convolve2d { mode: String },
    Fft,
    Ifft,
    Rfft,
    Irfft { n: Option<usize> },
    Fft2,
    Ifft2,
    Stft {
        fs: f64,
        nperseg: usize,
        noverlap: usize,
        nfft: Option<usize>,
    },
    /// STFT followed by its inverse.
    StftRoundtrip {
        fs: f64,
        nperseg: usize,
        noverlap: usize,
    },
    Dct { norm: String },
    Idct { norm: String },
    Hilbert,
    Window { name: String, m: usize, sym: bool },
    IirFilter {
        design: String,
        order: usize,
        btype: String,
        cutoff: Vec<f64>,
        fs: f64,
        rp: Option<f64>,
        rs: Option<f64>,
    },
    Sosfilt {
        order: usize,
        wn: Vec<f64>,
        btype: String,
    },
    /// Windowed-sinc FIR taps; cutoffs in the units of `fs`.
    Firwin {
        numtaps: usize,
        cutoff: Vec<f64>,
        btype: String,
        fs: f64,
    },
    Medfilt { kernel: usize },
    SavgolFilter {
        window_length: usize,
        polyorder: usize,
        deriv: usize,
        delta: f64,
    },
    Detrend { kind: String },
    Welch {
        fs: f64,
        nperseg: usize,
        noverlap: Option<usize>,
    },
    Periodogram { fs: f64 },
    Spectrogram {
        fs: f64,
        nperseg: usize,
        noverlap: usize,
    },
    FindPeaks {
        height: Option<f64>,
        distance: Option<usize>,
        prominence: Option<f64>,
    },
    PeakProperties {
        height: Option<f64>,
        distance: Option<usize>,
        rel_height: f64,
    },
    Interp1d { kind: String },
    Resample { num: usize },
    Polyfit { deg: usize },
    Polyval,
    GaussianDecay,
}

impl Transform {
    /// Operation name passed to the candidate and the oracle.
    #[must_use]
    pub fn op(&self) -> String {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map
                .get("op")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        }
    }

    /// Parameters as sorted `key=value` strings. Lists are comma-joined;
    /// absent options are omitted.
    #[must_use]
    pub fn params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        let Ok(Value::Object(map)) = serde_json::to_value(self) else {
            return params;
        };
        for (key, value) in map {
            if key == "op" {
                continue;
            }
            let rendered = match value {
                Value::Null => continue,
                Value::String(text) => text,
                Value::Array(items) => items
                    .iter()
                    .map(render_scalar)
                    .collect::<Vec<_>>()
                    .join(","),
                other => render_scalar(&other),
            };
            params.insert(key, rendered);
        }
        params
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Deterministic input synthesis, driven by the per-case stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "recipe", rename_all = "snake_case")]
pub enum InputRecipe {
    Values { values: Vec<f64> },
    Matrix {
        rows: usize,
        cols: usize,
        values: Vec<f64>,
    },
    Uniform { n: usize, low: f64, high: f64 },
    UniformMatrix { rows: usize, cols: usize },
    ComplexUniform { n: usize },
    ComplexUniformMatrix { rows: usize, cols: usize },
    SineMix {
        fs: f64,
        n: usize,
        components: Vec<(f64, f64)>,
        noise: f64,
    },
    Chirp { fs: f64, n: usize, f0: f64, f1: f64 },
    Bumps {
        n: usize,
        bumps: Vec<(f64, f64, f64)>,
        noise: f64,
    },
    Steps {
        n: usize,
        period: usize,
        slope: f64,
        noise: f64,
    },
    Repeat { pattern: Vec<f64>, times: usize },
    HannWindow { m: usize },
    Linspace { start: f64, stop: f64, n: usize },
    /// Half spectrum of a random real signal of length `n`.
    HalfSpectrum { n: usize },
    /// `polyval(coefficients, linspace(start, stop, n))` plus noise.
    Polynomial {
        coefficients: Vec<f64>,
        start: f64,
        stop: f64,
        n: usize,
        noise: f64,
    },
}

fn random_error(err: RandomError) -> String {
    format!("{} ({})", err, err.reason_code())
}

impl InputRecipe {
    pub fn materialize(&self, rng: &mut DeterministicRng) -> Result<NumericArtifact, String> {
        let artifact = match self {
            Self::Values { values } => NumericArtifact::RealVector(values.clone()),
            Self::Matrix { rows, cols, values } => NumericArtifact::RealMatrix(
                RealMatrix::new(*rows, *cols, values.clone()).map_err(|err| err.to_string())?,
            ),
            Self::Uniform { n, low, high } => {
                NumericArtifact::RealVector(rng.uniform(*low, *high, *n).map_err(random_error)?)
            }
            Self::UniformMatrix { rows, cols } => {
                let values = rng.uniform(-1.0, 1.0, rows * cols).map_err(random_error)?;
                NumericArtifact::RealMatrix(
                    RealMatrix::new(*rows, *cols, values).map_err(|err| err.to_string())?,
                )
            }
            Self::ComplexUniform { n } => {
                let re = rng.uniform(-1.0, 1.0, *n).map_err(random_error)?;
                let im = rng.uniform(-1.0, 1.0, *n).map_err(random_error)?;
                NumericArtifact::ComplexVector(
                    ComplexVector::new(re, im).map_err(|err| err.to_string())?,
                )
            }
            Self::ComplexUniformMatrix { rows, cols } => {
                let re = rng.uniform(-1.0, 1.0, rows * cols).map_err(random_error)?;
                let im = rng.uniform(-1.0, 1.0, rows * cols).map_err(random_error)?;
                NumericArtifact::ComplexMatrix(
                    ComplexMatrix::new(*rows, *cols, re, im).map_err(|err| err.to_string())?,
                )
            }
            Self::SineMix {
                fs,
                n,
                components,
                noise,
            } => NumericArtifact::RealVector(
                sgp_random::sine_mix(*fs, *n, components, *noise, rng).map_err(random_error)?,
            ),
            Self::Chirp { fs, n, f0, f1 } => NumericArtifact::RealVector(
                sgp_random::chirp(*fs, *n, *f0, *f1).map_err(random_error)?,
            ),
            Self::Bumps { n, bumps, noise } => NumericArtifact::RealVector(
                sgp_random::gaussian_bumps(*n, bumps, *noise, rng).map_err(random_error)?,
            ),
            Self::Steps {
                n,
                period,
                slope,
                noise,
            } => {
                let mut values =
                    sgp_random::square_steps(*n, *period, *slope).map_err(random_error)?;
                if *noise > 0.0 {
                    for value in &mut values {
                        *value += noise * rng.next_standard_normal();
                    }
                }
                NumericArtifact::RealVector(values)
            }
            Self::Repeat { pattern, times } => {
                NumericArtifact::RealVector(pattern.repeat(*times))
            }
            Self::HannWindow { m } => NumericArtifact::RealVector(
                sgp_dsp::get_window(WindowKind::Hann, *m, true).map_err(|err| err.to_string())?,
            ),
            Self::Linspace { start, stop, n } => NumericArtifact::RealVector(
                sgp_random::linspace(*start, *stop, *n, true).map_err(random_error)?,
            ),
            Self::HalfSpectrum { n } => {
                let signal = rng.uniform(-1.0, 1.0, *n).map_err(random_error)?;
                NumericArtifact::ComplexVector(
                    sgp_dsp::rfft(&signal).map_err(|err| err.to_string())?,
                )
            }
            Self::Polynomial {
                coefficients,
                start,
                stop,
                n,
                noise,
            } => {
                let x = sgp_random::linspace(*start, *stop, *n, true).map_err(random_error)?;
                let mut y = sgp_dsp::polyval(coefficients, &x);
                if *noise > 0.0 {
                    for value in &mut y {
                        *value += noise * rng.next_standard_normal();
                    }
                }
                NumericArtifact::RealVector(y)
            }
        };
        Ok(artifact)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    pub name: Option<String>,
    pub recipe: InputRecipe,
}

impl InputSpec {
    #[must_use]
    pub fn role(&self) -> String {
        role_name("input", self.name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub name: Option<String>,
    pub kind: ArtifactKind,
}

impl OutputSpec {
    #[must_use]
    pub fn role(&self) -> String {
        role_name("output", self.name.as_deref())
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("output")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub family: String,
    pub name: String,
    pub module: String,
    pub feature: String,
    pub transform: Transform,
    pub inputs: Vec<InputSpec>,
    pub outputs: Vec<OutputSpec>,
}

impl TestCase {
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}/{}", self.family, self.name)
    }

    /// Inputs in declaration order, drawn from one stream seeded by the case id.
    pub fn materialize_inputs(&self, base_seed: u64) -> Result<Vec<NumericArtifact>, HarnessError> {
        let mut rng = DeterministicRng::for_label(base_seed, &self.id());
        self.inputs
            .iter()
            .map(|input| {
                input
                    .recipe
                    .materialize(&mut rng)
                    .map_err(|message| HarnessError::Generation {
                        case_id: self.id(),
                        message: format!("input {}: {message}", input.role()),
                    })
            })
            .collect()
    }
}

struct CaseBuilder {
    case: TestCase,
}

impl CaseBuilder {
    fn new(family: &str, name: &str, module: &str, feature: &str, transform: Transform) -> Self {
        Self {
            case: TestCase {
                family: family.to_string(),
                name: name.to_string(),
                module: module.to_string(),
                feature: feature.to_string(),
                transform,
                inputs: Vec::new(),
                outputs: Vec::new(),
            },
        }
    }

    fn input(mut self, recipe: InputRecipe) -> Self {
        self.case.inputs.push(InputSpec { name: None, recipe });
        self
    }

    fn named_input(mut self, name: &str, recipe: InputRecipe) -> Self {
        self.case.inputs.push(InputSpec {
            name: Some(name.to_string()),
            recipe,
        });
        self
    }

    fn output(mut self, kind: ArtifactKind) -> Self {
        self.case.outputs.push(OutputSpec { name: None, kind });
        self
    }

    fn named_output(mut self, name: &str, kind: ArtifactKind) -> Self {
        self.case.outputs.push(OutputSpec {
            name: Some(name.to_string()),
            kind,
        });
        self
    }

    fn build(self) -> TestCase {
        self.case
    }
}

/// Ordered collection of test cases.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    cases: Vec<TestCase>,
}

impl Catalog {
    #[must_use]
    pub fn new(cases: Vec<TestCase>) -> Self {
        Self { cases }
    }

    #[must_use]
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&TestCase> {
        self.cases.iter().find(|case| case.id() == id)
    }

    /// Cases whose family is in `families`.
    #[must_use]
    pub fn only_families(&self, families: &[&str]) -> Self {
        Self::new(
            self.cases
                .iter()
                .filter(|case| families.contains(&case.family.as_str()))
                .cloned()
                .collect(),
        )
    }

    #[must_use]
    pub fn filtered(&self, keep: impl Fn(&TestCase) -> bool) -> Self {
        Self::new(self.cases.iter().filter(|case| keep(case)).cloned().collect())
    }

    /// Coverage: short and long signals, even and odd lengths, every
    /// correlation mode, symmetric and periodic windows, raw and
    /// orthonormal transforms, IIR and FIR designs over every band type,
    /// and multi-output spectral estimators.
    #[must_use]
    pub fn standard() -> Self {
        let mut cases = Vec::new();
        correlation_cases(&mut cases);
        fourier_cases(&mut cases);
        window_cases(&mut cases);
        filter_cases(&mut cases);
        spectral_cases(&mut cases);
        peak_cases(&mut cases);
        math_cases(&mut cases);
        Self::new(cases)
    }
}

const MODES: [&str; 3] = ["full", "same", "valid"];

fn correlation_cases(cases: &mut Vec<TestCase>) {
    for mode in MODES {
        cases.push(
            CaseBuilder::new(
                "correlate",
                &format!("basic_{mode}"),
                "Signal",
                "Correlate",
                Transform::Correlate {
                    mode: mode.to_string(),
                },
            )
            .named_input("in1", InputRecipe::Values { values: vec![1.0, 2.0, 3.0] })
            .named_input("in2", InputRecipe::Values { values: vec![0.0, 1.0, 0.5] })
            .output(ArtifactKind::RealVector)
            .build(),
        );
        cases.push(
            CaseBuilder::new(
                "correlate",
                &format!("random_{mode}"),
                "Signal",
                "Correlate",
                Transform::Correlate {
                    mode: mode.to_string(),
                },
            )
            .named_input("in1", InputRecipe::Uniform { n: 50, low: -1.0, high: 1.0 })
            .named_input("in2", InputRecipe::Uniform { n: 20, low: -1.0, high: 1.0 })
            .output(ArtifactKind::RealVector)
            .build(),
        );
    }

    cases.push(
        CaseBuilder::new(
            "convolve",
            "pulse_train_hann_same",
            "Signal",
            "Convolve",
            Transform::Convolve {
                mode: "same".to_string(),
            },
        )
        .named_input(
            "in1",
            InputRecipe::Repeat {
                pattern: vec![0.0, 1.0, 0.0],
                times: 100,
            },
        )
        .named_input("in2", InputRecipe::HannWindow { m: 50 })
        .output(ArtifactKind::RealVector)
        .build(),
    );
    cases.push(
        CaseBuilder::new(
            "convolve",
            "random_full",
            "Signal",
            "Convolve",
            Transform::Convolve {
                mode: "full".to_string(),
            },
        )
        .named_input("in1", InputRecipe::Uniform { n: 41, low: -1.0, high: 1.0 })
        .named_input("in2", InputRecipe::Uniform { n: 7, low: -1.0, high: 1.0 })
        .output(ArtifactKind::RealVector)
        .build(),
    );

    for mode in MODES {
        for (feature, transform) in [
            (
                "Convolve2d",
                Transform::Convolve2d {
                    mode: mode.to_string(),
                },
            ),
            (
                "Correlate2d",
                Transform::Correlate2d {
                    mode: mode.to_string(),
                },
            ),
        ] {
            cases.push(
                CaseBuilder::new(
                    "conv2d",
                    &format!("{}_3x3_2x2_{mode}", feature.to_lowercase()),
                    "2D Ops",
                    feature,
                    transform,
                )
                .named_input("in1", InputRecipe::UniformMatrix { rows: 3, cols: 3 })
                .named_input("in2", InputRecipe::UniformMatrix { rows: 2, cols: 2 })
                .output(ArtifactKind::RealMatrix)
                .build(),
            );
        }
    }
}

fn fourier_cases(cases: &mut Vec<TestCase>) {
    for n in [64, 128] {
        cases.push(
            CaseBuilder::new("fft", &format!("fft_n{n}"), "FFT", "FFT / IFFT", Transform::Fft)
                .input(InputRecipe::ComplexUniform { n })
                .output(ArtifactKind::ComplexVector)
                .build(),
        );
        cases.push(
            CaseBuilder::new("fft", &format!("ifft_n{n}"), "FFT", "FFT / IFFT", Transform::Ifft)
                .input(InputRecipe::ComplexUniform { n })
                .output(ArtifactKind::ComplexVector)
                .build(),
        );
        cases.push(
            CaseBuilder::new("fft", &format!("rfft_n{n}"), "FFT", "RFFT / IRFFT", Transform::Rfft)
                .input(InputRecipe::SineMix {
                    fs: n as f64,
                    n,
                    components: vec![(5.0, 1.0), (12.0, 0.5)],
                    noise: 0.05,
                })
                .output(ArtifactKind::ComplexVector)
                .build(),
        );
        cases.push(
            CaseBuilder::new(
                "fft",
                &format!("irfft_n{n}"),
                "FFT",
                "RFFT / IRFFT",
                Transform::Irfft { n: Some(n) },
            )
            .input(InputRecipe::HalfSpectrum { n })
            .output(ArtifactKind::RealVector)
            .build(),
        );
    }

    cases.push(
        CaseBuilder::new("fft2", "fft2_5x4", "2D Ops", "FFT2 / IFFT2", Transform::Fft2)
            .input(InputRecipe::ComplexUniformMatrix { rows: 5, cols: 4 })
            .output(ArtifactKind::ComplexMatrix)
            .build(),
    );
    cases.push(
        CaseBuilder::new("fft2", "ifft2_4x3", "2D Ops", "FFT2 / IFFT2", Transform::Ifft2)
            .input(InputRecipe::ComplexUniformMatrix { rows: 4, cols: 3 })
            .output(ArtifactKind::ComplexMatrix)
            .build(),
    );

    for (name, nperseg, noverlap, nfft) in [
        ("chirp_256", 256, 128, None),
        ("chirp_128_nfft256", 128, 64, Some(256)),
    ] {
        cases.push(
            CaseBuilder::new(
                "stft",
                name,
                "FFT",
                "STFT / ISTFT",
                Transform::Stft {
                    fs: 1000.0,
                    nperseg,
                    noverlap,
                    nfft,
                },
            )
            .input(InputRecipe::Chirp {
                fs: 1000.0,
                n: 1024,
                f0: 10.0,
                f1: 200.0,
            })
            .named_output("freqs", ArtifactKind::RealVector)
            .named_output("times", ArtifactKind::RealVector)
            .named_output("zxx", ArtifactKind::ComplexMatrix)
            .build(),
        );
    }
    cases.push(
        CaseBuilder::new(
            "stft",
            "chirp_256_roundtrip",
            "FFT",
            "STFT / ISTFT",
            Transform::StftRoundtrip {
                fs: 1000.0,
                nperseg: 256,
                noverlap: 128,
            },
        )
        .input(InputRecipe::Chirp {
            fs: 1000.0,
            n: 1024,
            f0: 10.0,
            f1: 200.0,
        })
        .named_output("zxx", ArtifactKind::ComplexMatrix)
        .named_output("reconstructed", ArtifactKind::RealVector)
        .build(),
    );

    for n in [8, 33, 50] {
        for norm in ["none", "ortho"] {
            cases.push(
                CaseBuilder::new(
                    "dct",
                    &format!("dct_n{n}_{norm}"),
                    "DCT",
                    "DCT-II",
                    Transform::Dct {
                        norm: norm.to_string(),
                    },
                )
                .input(InputRecipe::Uniform { n, low: -1.0, high: 1.0 })
                .output(ArtifactKind::RealVector)
                .build(),
            );
        }
    }
    for norm in ["none", "ortho"] {
        cases.push(
            CaseBuilder::new(
                "dct",
                &format!("idct_n16_{norm}"),
                "DCT",
                "IDCT-II",
                Transform::Idct {
                    norm: norm.to_string(),
                },
            )
            .input(InputRecipe::Uniform { n: 16, low: -1.0, high: 1.0 })
            .output(ArtifactKind::RealVector)
            .build(),
        );
    }

    for n in [32, 33] {
        cases.push(
            CaseBuilder::new(
                "hilbert",
                &format!("hilbert_n{n}"),
                "Signal",
                "Hilbert",
                Transform::Hilbert,
            )
            .input(InputRecipe::SineMix {
                fs: 32.0,
                n,
                components: vec![(3.0, 1.0)],
                noise: 0.01,
            })
            .output(ArtifactKind::ComplexVector)
            .build(),
        );
    }

    for (name, from, to) in [("up_20_50", 20, 50), ("down_100_30", 100, 30)] {
        cases.push(
            CaseBuilder::new(
                "resample",
                name,
                "Signal",
                "Resample",
                Transform::Resample { num: to },
            )
            .input(InputRecipe::SineMix {
                fs: from as f64,
                n: from,
                components: vec![(1.0, 1.0), (3.0, 0.25)],
                noise: 0.0,
            })
            .output(ArtifactKind::RealVector)
            .build(),
        );
    }
}

fn window_cases(cases: &mut Vec<TestCase>) {
    for name in ["bartlett", "triang", "flattop", "parzen", "bohman"] {
        for m in [10, 51] {
            for sym in [true, false] {
                let flavour = if sym { "sym" } else { "periodic" };
                cases.push(
                    CaseBuilder::new(
                        "windows",
                        &format!("{name}_m{m}_{flavour}"),
                        "Signal",
                        "Windows",
                        Transform::Window {
                            name: name.to_string(),
                            m,
                            sym,
                        },
                    )
                    .output(ArtifactKind::RealVector)
                    .build(),
                );
            }
        }
    }
}

fn noisy_mix() -> InputRecipe {
    InputRecipe::SineMix {
        fs: 250.0,
        n: 500,
        components: vec![(5.0, 1.0), (60.0, 0.5)],
        noise: 0.1,
    }
}

fn filter_cases(cases: &mut Vec<TestCase>) {
    let designs: [(&str, &str, Option<f64>, Option<f64>); 5] = [
        ("butter", "Butterworth", None, None),
        ("cheby1", "Chebyshev I", Some(1.0), None),
        ("cheby2", "Chebyshev II", None, Some(20.0)),
        ("ellip", "Elliptic", Some(1.0), Some(40.0)),
        ("bessel", "Bessel", None, None),
    ];
    for (design, feature, rp, rs) in designs {
        cases.push(
            CaseBuilder::new(
                "filters",
                &format!("{design}_lowpass_filtfilt"),
                "Filters",
                feature,
                Transform::IirFilter {
                    design: design.to_string(),
                    order: 4,
                    btype: "lowpass".to_string(),
                    cutoff: vec![20.0],
                    fs: 250.0,
                    rp,
                    rs,
                },
            )
            .input(noisy_mix())
            .output(ArtifactKind::RealVector)
            .build(),
        );
    }
    for (btype, cutoff) in [
        ("highpass", vec![50.0]),
        ("bandpass", vec![50.0, 70.0]),
        ("bandstop", vec![55.0, 65.0]),
    ] {
        cases.push(
            CaseBuilder::new(
                "filters",
                &format!("butter_{btype}_filtfilt"),
                "Filters",
                "Butterworth",
                Transform::IirFilter {
                    design: "butter".to_string(),
                    order: 4,
                    btype: btype.to_string(),
                    cutoff,
                    fs: 250.0,
                    rp: None,
                    rs: None,
                },
            )
            .input(noisy_mix())
            .output(ArtifactKind::RealVector)
            .build(),
        );
    }

    for (name, numtaps, btype, cutoff) in [
        ("lowpass_31_100", 31, "lowpass", vec![100.0]),
        ("highpass_31_100", 31, "highpass", vec![100.0]),
        ("bandpass_51_100_200", 51, "bandpass", vec![100.0, 200.0]),
        ("bandstop_51_100_200", 51, "bandstop", vec![100.0, 200.0]),
        ("lowpass_32_100", 32, "lowpass", vec![100.0]),
    ] {
        cases.push(
            CaseBuilder::new(
                "fir",
                name,
                "Filters",
                "FIR",
                Transform::Firwin {
                    numtaps,
                    cutoff,
                    btype: btype.to_string(),
                    fs: 1000.0,
                },
            )
            .output(ArtifactKind::RealVector)
            .build(),
        );
    }

    for (name, deriv) in [("smoothing_11_3", 0), ("differentiation_11_3", 1)] {
        cases.push(
            CaseBuilder::new(
                "savgol",
                name,
                "Filters",
                "Savitzky-Golay",
                Transform::SavgolFilter {
                    window_length: 11,
                    polyorder: 3,
                    deriv,
                    delta: 1.0,
                },
            )
            .input(InputRecipe::SineMix {
                fs: 100.0,
                n: 200,
                components: vec![(2.0, 1.0)],
                noise: 0.1,
            })
            .output(ArtifactKind::RealVector)
            .build(),
        );
    }

    cases.push(
        CaseBuilder::new(
            "sosfilt",
            "butter4_lowpass_0p2",
            "SOS Filt",
            "Sosfilt",
            Transform::Sosfilt {
                order: 4,
                wn: vec![0.2],
                btype: "lowpass".to_string(),
            },
        )
        .input(InputRecipe::Uniform { n: 256, low: -1.0, high: 1.0 })
        .output(ArtifactKind::RealVector)
        .build(),
    );

    for kernel in [3, 5] {
        cases.push(
            CaseBuilder::new(
                "medfilt",
                &format!("steps_k{kernel}"),
                "Signal",
                "Medfilt",
                Transform::Medfilt { kernel },
            )
            .input(InputRecipe::Steps {
                n: 120,
                period: 15,
                slope: 0.0,
                noise: 0.2,
            })
            .output(ArtifactKind::RealVector)
            .build(),
        );
    }

    for kind in ["linear", "constant"] {
        cases.push(
            CaseBuilder::new(
                "detrend",
                &format!("ramp_{kind}"),
                "Signal",
                "Detrend",
                Transform::Detrend {
                    kind: kind.to_string(),
                },
            )
            .input(InputRecipe::Steps {
                n: 200,
                period: 40,
                slope: 0.05,
                noise: 0.1,
            })
            .output(ArtifactKind::RealVector)
            .build(),
        );
    }
}

fn spectral_cases(cases: &mut Vec<TestCase>) {
    let tone = InputRecipe::SineMix {
        fs: 1000.0,
        n: 2000,
        components: vec![(50.0, 1.0), (120.0, 0.5)],
        noise: 0.2,
    };
    cases.push(
        CaseBuilder::new(
            "spectral",
            "welch_fs1000_n2000",
            "Spectral",
            "Welch",
            Transform::Welch {
                fs: 1000.0,
                nperseg: 256,
                noverlap: None,
            },
        )
        .input(tone.clone())
        .named_output("freqs", ArtifactKind::RealVector)
        .named_output("psd", ArtifactKind::RealVector)
        .build(),
    );
    cases.push(
        CaseBuilder::new(
            "spectral",
            "periodogram_fs1000_n512",
            "Spectral",
            "Periodogram",
            Transform::Periodogram { fs: 1000.0 },
        )
        .input(InputRecipe::SineMix {
            fs: 1000.0,
            n: 512,
            components: vec![(50.0, 1.0)],
            noise: 0.2,
        })
        .named_output("freqs", ArtifactKind::RealVector)
        .named_output("psd", ArtifactKind::RealVector)
        .build(),
    );
    cases.push(
        CaseBuilder::new(
            "spectral",
            "spectrogram_fs1000_n2000",
            "Spectral",
            "Spectrogram",
            Transform::Spectrogram {
                fs: 1000.0,
                nperseg: 256,
                noverlap: 32,
            },
        )
        .input(tone)
        .named_output("freqs", ArtifactKind::RealVector)
        .named_output("times", ArtifactKind::RealVector)
        .named_output("sxx", ArtifactKind::RealMatrix)
        .build(),
    );
}

fn peak_signal() -> InputRecipe {
    InputRecipe::Bumps {
        n: 500,
        bumps: vec![
            (40.0, 4.0, 1.0),
            (110.0, 6.0, 0.6),
            (180.0, 3.0, 1.4),
            (260.0, 8.0, 0.9),
            (330.0, 5.0, 0.4),
            (420.0, 4.0, 1.2),
        ],
        noise: 0.03,
    }
}

fn peak_cases(cases: &mut Vec<TestCase>) {
    let variants: [(&str, Option<f64>, Option<usize>, Option<f64>); 4] = [
        ("plain", None, None, None),
        ("height_0p5", Some(0.5), None, None),
        ("distance_20", None, Some(20), None),
        ("prominence_0p3", None, None, Some(0.3)),
    ];
    for (name, height, distance, prominence) in variants {
        cases.push(
            CaseBuilder::new(
                "peaks",
                &format!("find_peaks_{name}"),
                "Signal",
                "Find Peaks",
                Transform::FindPeaks {
                    height,
                    distance,
                    prominence,
                },
            )
            .input(peak_signal())
            .output(ArtifactKind::IndexSet)
            .build(),
        );
    }
    for (name, rel_height) in [("rel_0p5", 0.5), ("rel_1p0", 1.0)] {
        cases.push(
            CaseBuilder::new(
                "peaks",
                &format!("properties_{name}"),
                "Signal",
                "Peak Properties",
                Transform::PeakProperties {
                    height: Some(0.3),
                    distance: Some(20),
                    rel_height,
                },
            )
            .input(peak_signal())
            .named_output("peaks", ArtifactKind::IndexSet)
            .named_output("prominences", ArtifactKind::RealVector)
            // Bases and crossings are per peak, so they compare by position.
            .named_output("left_bases", ArtifactKind::RealVector)
            .named_output("right_bases", ArtifactKind::RealVector)
            .named_output("widths", ArtifactKind::RealVector)
            .named_output("width_heights", ArtifactKind::RealVector)
            .named_output("left_ips", ArtifactKind::RealVector)
            .named_output("right_ips", ArtifactKind::RealVector)
            .build(),
        );
    }
}

fn math_cases(cases: &mut Vec<TestCase>) {
    for kind in ["linear", "cubic"] {
        cases.push(
            CaseBuilder::new(
                "interp",
                &format!("sine_{kind}"),
                "Math",
                "Interp1d",
                Transform::Interp1d {
                    kind: kind.to_string(),
                },
            )
            .named_input("x", InputRecipe::Linspace { start: 0.0, stop: 6.0, n: 61 })
            .named_input("xp", InputRecipe::Linspace { start: 0.0, stop: 6.0, n: 13 })
            .named_input(
                "fp",
                InputRecipe::Polynomial {
                    coefficients: vec![0.05, -0.4, 0.6, 1.0],
                    start: 0.0,
                    stop: 6.0,
                    n: 13,
                    noise: 0.05,
                },
            )
            .output(ArtifactKind::RealVector)
            .build(),
        );
    }

    cases.push(
        CaseBuilder::new("poly", "polyfit_exact_cubic", "Poly", "Polyfit", Transform::Polyfit {
            deg: 3,
        })
        .named_input("x", InputRecipe::Linspace { start: -2.0, stop: 2.0, n: 20 })
        .named_input(
            "y",
            InputRecipe::Polynomial {
                coefficients: vec![1.0, -2.0, 0.5, 3.0],
                start: -2.0,
                stop: 2.0,
                n: 20,
                noise: 0.0,
            },
        )
        .output(ArtifactKind::RealVector)
        .build(),
    );
    cases.push(
        CaseBuilder::new("poly", "polyfit_lstsq_quadratic", "Poly", "Polyfit", Transform::Polyfit {
            deg: 2,
        })
        .named_input("x", InputRecipe::Linspace { start: 0.0, stop: 5.0, n: 40 })
        .named_input(
            "y",
            InputRecipe::Polynomial {
                coefficients: vec![0.7, -1.5, 2.0],
                start: 0.0,
                stop: 5.0,
                n: 40,
                noise: 0.3,
            },
        )
        .output(ArtifactKind::RealVector)
        .build(),
    );
    cases.push(
        CaseBuilder::new("poly", "polyval_quartic", "Poly", "Polyval", Transform::Polyval)
            .named_input("p", InputRecipe::Values {
                values: vec![0.5, 0.0, -1.0, 2.0, 1.0],
            })
            .named_input("x", InputRecipe::Linspace { start: -3.0, stop: 3.0, n: 25 })
            .output(ArtifactKind::RealVector)
            .build(),
    );

    cases.push(
        CaseBuilder::new("ode", "rk4_gaussian_decay", "ODE", "RK4", Transform::GaussianDecay)
            .named_input("t", InputRecipe::Linspace { start: 0.0, stop: 2.0, n: 11 })
            .output(ArtifactKind::RealVector)
            .build(),
    );
}

#[cfg(test)]
mod tests {
    use super::{Catalog, InputRecipe, Transform};
    use sgp_artifact::NumericArtifact;
    use sgp_random::DeterministicRng;
    use std::collections::BTreeSet;

    #[test]
    fn params_are_flat_sorted_strings() {
        let transform = Transform::IirFilter {
            design: "cheby1".to_string(),
            order: 4,
            btype: "bandpass".to_string(),
            cutoff: vec![50.0, 70.0],
            fs: 250.0,
            rp: Some(1.0),
            rs: None,
        };
        assert_eq!(transform.op(), "iir_filter");
        let params = transform.params();
        let keys: Vec<&str> = params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["btype", "cutoff", "design", "fs", "order", "rp"]);
        assert_eq!(params["cutoff"], "50.0,70.0");
        assert_eq!(params["order"], "4");
        assert!(Transform::Fft.params().is_empty());
    }

    #[test]
    fn fir_and_smoothing_families_are_registered() {
        let catalog = Catalog::standard();
        let fir = catalog.only_families(&["fir"]);
        assert_eq!(fir.len(), 5);
        let bandstop = fir.find("fir/bandstop_51_100_200").expect("registered");
        assert!(bandstop.inputs.is_empty());
        assert_eq!(bandstop.transform.op(), "firwin");
        assert_eq!(bandstop.transform.params()["cutoff"], "100.0,200.0");

        let savgol = catalog.find("savgol/differentiation_11_3").expect("registered");
        assert_eq!(savgol.transform.op(), "savgol_filter");
        assert_eq!(savgol.transform.params()["deriv"], "1");

        let roundtrip = catalog.find("stft/chirp_256_roundtrip").expect("registered");
        let labels: Vec<&str> = roundtrip.outputs.iter().map(|output| output.label()).collect();
        assert_eq!(labels, vec!["zxx", "reconstructed"]);
    }

    #[test]
    fn case_ids_are_unique() {
        let catalog = Catalog::standard();
        let ids: BTreeSet<String> = catalog.cases().iter().map(|case| case.id()).collect();
        assert_eq!(ids.len(), catalog.len());
    }

    #[test]
    fn every_report_module_is_covered() {
        let catalog = Catalog::standard();
        let modules: BTreeSet<&str> = catalog.cases().iter().map(|c| c.module.as_str()).collect();
        for module in [
            "Filters", "FFT", "Spectral", "SOS Filt", "2D Ops", "Math", "DCT", "ODE", "Poly",
            "Signal",
        ] {
            assert!(modules.contains(module), "{module}");
        }
    }

    #[test]
    fn inputs_are_reproducible_per_case() {
        let catalog = Catalog::standard();
        let case = catalog.find("correlate/random_full").expect("registered");
        let first = case.materialize_inputs(11).expect("materializes");
        let second = case.materialize_inputs(11).expect("materializes");
        assert_eq!(first, second);
        let other_seed = case.materialize_inputs(12).expect("materializes");
        assert_ne!(first, other_seed);
    }

    #[test]
    fn repeat_and_half_spectrum_recipes() {
        let mut rng = DeterministicRng::new(1);
        let pulses = InputRecipe::Repeat {
            pattern: vec![0.0, 1.0, 0.0],
            times: 100,
        }
        .materialize(&mut rng)
        .expect("materializes");
        assert_eq!(pulses.shape().element_count(), 300);

        let half = InputRecipe::HalfSpectrum { n: 64 }
            .materialize(&mut rng)
            .expect("materializes");
        assert!(matches!(half, NumericArtifact::ComplexVector(ref v) if v.len() == 33));
    }
}
