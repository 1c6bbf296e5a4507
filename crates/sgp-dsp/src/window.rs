use crate::DspError;
use std::f64::consts::{PI, TAU};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Boxcar,
    Hann,
    Bartlett,
    Triang,
    Bohman,
    Parzen,
}

impl WindowKind {
    pub fn parse(raw: &str) -> Result<Self, DspError> {
        match raw {
            "boxcar" => Ok(Self::Boxcar),
            "hann" => Ok(Self::Hann),
            "bartlett" => Ok(Self::Bartlett),
            "triang" => Ok(Self::Triang),
            "bohman" => Ok(Self::Bohman),
            "parzen" => Ok(Self::Parzen),
            other => Err(DspError::InvalidParameter(format!(
                "window '{other}' has no native kernel"
            ))),
        }
    }

    fn symmetric(self, m: usize) -> Vec<f64> {
        let mf = m as f64;
        match self {
            Self::Boxcar => vec![1.0; m],
            Self::Hann => (0..m)
                .map(|n| 0.5 - 0.5 * (TAU * n as f64 / (mf - 1.0)).cos())
                .collect(),
            Self::Bartlett => (0..m)
                .map(|n| {
                    let n = n as f64;
                    if n <= (mf - 1.0) / 2.0 {
                        2.0 * n / (mf - 1.0)
                    } else {
                        2.0 - 2.0 * n / (mf - 1.0)
                    }
                })
                .collect(),
            Self::Triang => {
                let half: Vec<f64> = if m % 2 == 0 {
                    (1..=m.div_ceil(2))
                        .map(|n| (2.0 * n as f64 - 1.0) / mf)
                        .collect()
                } else {
                    (1..=m.div_ceil(2))
                        .map(|n| 2.0 * n as f64 / (mf + 1.0))
                        .collect()
                };
                let mirrored = if m % 2 == 0 { half.len() } else { half.len() - 1 };
                let mut w = half.clone();
                w.extend(half[..mirrored].iter().rev());
                w
            }
            Self::Bohman => (0..m)
                .map(|n| {
                    if n == 0 || n == m - 1 {
                        return 0.0;
                    }
                    let fac = (-1.0 + 2.0 * n as f64 / (mf - 1.0)).abs();
                    (1.0 - fac) * (PI * fac).cos() + (PI * fac).sin() / PI
                })
                .collect(),
            Self::Parzen => (0..m)
                .map(|n| {
                    let x = (n as f64 - (mf - 1.0) / 2.0).abs();
                    let r = x / (mf / 2.0);
                    if x <= (mf - 1.0) / 4.0 {
                        1.0 - 6.0 * r * r + 6.0 * r * r * r
                    } else {
                        2.0 * (1.0 - r).powi(3)
                    }
                })
                .collect(),
        }
    }
}

/// Window of length `m`; periodic windows are the first `m` samples of the
/// symmetric window of length `m + 1`.
pub fn get_window(kind: WindowKind, m: usize, sym: bool) -> Result<Vec<f64>, DspError> {
    if m == 0 {
        return Err(DspError::InvalidParameter("window length must be > 0".to_string()));
    }
    if m == 1 {
        return Ok(vec![1.0]);
    }
    if sym {
        Ok(kind.symmetric(m))
    } else {
        let mut w = kind.symmetric(m + 1);
        w.truncate(m);
        Ok(w)
    }
}
