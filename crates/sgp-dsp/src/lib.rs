#![forbid(unsafe_code)]

//! Native reference kernels covering the subset of the signal-processing
//! reference library that can be reproduced without an external interpreter.

mod conv;
mod fourier;
mod interp;
mod peaks;
mod poly;
mod spectral;
mod window;

pub use conv::{convolve, convolve2d, correlate, correlate2d};
pub use fourier::{
    dct2, fft, fft2, hilbert, idct2, ifft, ifft2, irfft, resample, rfft, rfftfreq,
};
pub use interp::{interp_linear, natural_cubic_spline};
pub use peaks::{PeakWidths, find_peaks, peak_prominences, peak_widths};
pub use poly::{polyfit, polyval};
pub use spectral::{DetrendKind, detrend, medfilt, periodogram, welch};
pub use window::{WindowKind, get_window};

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DspError {
    EmptyInput(&'static str),
    InvalidParameter(String),
    ShapeContractViolation(String),
    SingularSystem,
}

impl DspError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::EmptyInput(_) => "dsp_empty_input",
            Self::InvalidParameter(_) => "dsp_invalid_parameter",
            Self::ShapeContractViolation(_) => "dsp_shape_contract_violation",
            Self::SingularSystem => "dsp_singular_system",
        }
    }
}

impl fmt::Display for DspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput(what) => write!(f, "{what} must not be empty"),
            Self::InvalidParameter(msg) => write!(f, "{msg}"),
            Self::ShapeContractViolation(msg) => write!(f, "{msg}"),
            Self::SingularSystem => write!(f, "least-squares system is rank deficient"),
        }
    }
}

impl std::error::Error for DspError {}

/// Output-size convention shared by the correlation and convolution kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvolveMode {
    Full,
    Same,
    Valid,
}

impl ConvolveMode {
    pub fn parse(raw: &str) -> Result<Self, DspError> {
        match raw {
            "full" => Ok(Self::Full),
            "same" => Ok(Self::Same),
            "valid" => Ok(Self::Valid),
            other => Err(DspError::InvalidParameter(format!(
                "mode must be full|same|valid, got '{other}'"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Same => "same",
            Self::Valid => "valid",
        }
    }
}

/// Normalization of the DCT pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DctNorm {
    Backward,
    Ortho,
}

impl DctNorm {
    pub fn parse(raw: &str) -> Result<Self, DspError> {
        match raw {
            "none" | "backward" => Ok(Self::Backward),
            "ortho" => Ok(Self::Ortho),
            other => Err(DspError::InvalidParameter(format!(
                "norm must be none|ortho, got '{other}'"
            ))),
        }
    }
}

/// Reference solution of `y' = -2 t y`, `y(0) = 1`.
#[must_use]
pub fn gaussian_decay(t: &[f64]) -> Vec<f64> {
    t.iter().map(|t| (-t * t).exp()).collect()
}

#[cfg(test)]
mod tests {
    use super::{ConvolveMode, DctNorm, DspError, gaussian_decay};

    #[test]
    fn modes_parse() {
        assert_eq!(ConvolveMode::parse("same"), Ok(ConvolveMode::Same));
        assert_eq!(ConvolveMode::Valid.as_str(), "valid");
        let err = ConvolveMode::parse("circular").expect_err("unknown mode");
        assert_eq!(err.reason_code(), "dsp_invalid_parameter");
        assert_eq!(DctNorm::parse("none"), Ok(DctNorm::Backward));
        assert!(matches!(DctNorm::parse("forward"), Err(DspError::InvalidParameter(_))));
    }

    #[test]
    fn gaussian_decay_matches_closed_form() {
        let y = gaussian_decay(&[0.0, 1.0, 2.0]);
        assert_eq!(y[0], 1.0);
        assert!((y[1] - (-1.0f64).exp()).abs() < 1e-15);
        assert!((y[2] - (-4.0f64).exp()).abs() < 1e-15);
    }
}
