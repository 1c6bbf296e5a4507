use crate::{DspError, WindowKind, get_window, rfft, rfftfreq};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetrendKind {
    Linear,
    Constant,
}

impl DetrendKind {
    pub fn parse(raw: &str) -> Result<Self, DspError> {
        match raw {
            "linear" => Ok(Self::Linear),
            "constant" => Ok(Self::Constant),
            other => Err(DspError::InvalidParameter(format!(
                "detrend type must be linear|constant, got '{other}'"
            ))),
        }
    }
}

/// Removes the mean, or the least-squares line over the sample index.
pub fn detrend(x: &[f64], kind: DetrendKind) -> Result<Vec<f64>, DspError> {
    if x.is_empty() {
        return Err(DspError::EmptyInput("detrend input"));
    }
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    match kind {
        DetrendKind::Constant => Ok(x.iter().map(|v| v - mean).collect()),
        DetrendKind::Linear => {
            let t_mean = (n - 1.0) / 2.0;
            let (mut sxy, mut sxx) = (0.0, 0.0);
            for (i, v) in x.iter().enumerate() {
                let dt = i as f64 - t_mean;
                sxy += dt * (v - mean);
                sxx += dt * dt;
            }
            let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
            Ok(x.iter()
                .enumerate()
                .map(|(i, v)| v - (mean + slope * (i as f64 - t_mean)))
                .collect())
        }
    }
}

/// Running median over an odd window with zero padding at the edges.
pub fn medfilt(x: &[f64], kernel: usize) -> Result<Vec<f64>, DspError> {
    if kernel == 0 || kernel % 2 == 0 {
        return Err(DspError::InvalidParameter(format!(
            "kernel size must be odd and positive, got {kernel}"
        )));
    }
    let half = kernel / 2;
    let mut window = Vec::with_capacity(kernel);
    Ok((0..x.len())
        .map(|i| {
            window.clear();
            for offset in 0..kernel {
                let pos = (i + offset).checked_sub(half);
                window.push(pos.and_then(|p| x.get(p)).copied().unwrap_or(0.0));
            }
            window.sort_by(f64::total_cmp);
            window[half]
        })
        .collect())
}

fn one_sided_density(
    segment: &[f64],
    window: &[f64],
    fs: f64,
) -> Result<Vec<f64>, DspError> {
    let centered = detrend(segment, DetrendKind::Constant)?;
    let windowed: Vec<f64> = centered.iter().zip(window).map(|(x, w)| x * w).collect();
    let spectrum = rfft(&windowed)?;
    let scale = 1.0 / (fs * window.iter().map(|w| w * w).sum::<f64>());
    let mut psd: Vec<f64> = spectrum
        .re()
        .iter()
        .zip(spectrum.im())
        .map(|(re, im)| (re * re + im * im) * scale)
        .collect();
    let last = psd.len();
    let doubled_end = if segment.len() % 2 == 0 { last - 1 } else { last };
    for value in psd.iter_mut().take(doubled_end).skip(1) {
        *value *= 2.0;
    }
    Ok(psd)
}

fn check_rate(fs: f64) -> Result<(), DspError> {
    if fs.is_finite() && fs > 0.0 {
        Ok(())
    } else {
        Err(DspError::InvalidParameter("sampling rate must be > 0".to_string()))
    }
}

/// One-sided power spectral density with a rectangular window.
pub fn periodogram(x: &[f64], fs: f64) -> Result<(Vec<f64>, Vec<f64>), DspError> {
    check_rate(fs)?;
    if x.is_empty() {
        return Err(DspError::EmptyInput("periodogram input"));
    }
    let window = vec![1.0; x.len()];
    let psd = one_sided_density(x, &window, fs)?;
    Ok((rfftfreq(x.len(), 1.0 / fs), psd))
}

/// Welch averaged periodogram over periodic-Hann segments.
/// `noverlap` defaults to half a segment; a signal shorter than `nperseg`
/// is analysed as one segment.
pub fn welch(
    x: &[f64],
    fs: f64,
    nperseg: usize,
    noverlap: Option<usize>,
) -> Result<(Vec<f64>, Vec<f64>), DspError> {
    check_rate(fs)?;
    if x.is_empty() {
        return Err(DspError::EmptyInput("welch input"));
    }
    let nperseg = nperseg.min(x.len());
    let noverlap = noverlap.unwrap_or(nperseg / 2);
    if nperseg == 0 || noverlap >= nperseg {
        return Err(DspError::InvalidParameter(
            "noverlap must be less than nperseg".to_string(),
        ));
    }
    let window = get_window(WindowKind::Hann, nperseg, false)?;
    let step = nperseg - noverlap;
    let segments = (x.len() - noverlap) / step;
    let mut acc = vec![0.0; nperseg / 2 + 1];
    for s in 0..segments {
        let start = s * step;
        let psd = one_sided_density(&x[start..start + nperseg], &window, fs)?;
        for (a, p) in acc.iter_mut().zip(psd) {
            *a += p;
        }
    }
    let count = segments as f64;
    acc.iter_mut().for_each(|a| *a /= count);
    Ok((rfftfreq(nperseg, 1.0 / fs), acc))
}

#[cfg(test)]
mod tests {
    use super::{DetrendKind, detrend, medfilt, periodogram, welch};

    #[test]
    fn linear_detrend_removes_ramp() {
        let x: Vec<f64> = (0..10).map(|i| 3.0 * f64::from(i) + 2.0).collect();
        let y = detrend(&x, DetrendKind::Linear).expect("non-empty");
        assert!(y.iter().all(|v| v.abs() < 1e-12));
        let c = detrend(&[1.0, 2.0, 3.0], DetrendKind::Constant).expect("non-empty");
        assert_eq!(c, vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn medfilt_pads_with_zeros() {
        let y = medfilt(&[5.0, 1.0, 9.0, 2.0, 7.0], 3).expect("odd kernel");
        assert_eq!(y, vec![1.0, 5.0, 2.0, 7.0, 2.0]);
        assert!(medfilt(&[1.0], 2).is_err());
    }

    #[test]
    fn periodogram_obeys_parseval() {
        let x = [1.0, -1.0, 2.0, 0.0, -2.0, 1.0, 0.5, -0.5];
        let fs = 4.0;
        let (freqs, psd) = periodogram(&x, fs).expect("valid");
        assert_eq!(freqs.len(), 5);
        assert_eq!(freqs[4], 2.0);
        let mean = x.iter().sum::<f64>() / 8.0;
        let variance = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 8.0;
        let df = fs / 8.0;
        let power: f64 = psd.iter().sum::<f64>() * df;
        assert!((power - variance).abs() < 1e-12, "{power} vs {variance}");
    }

    #[test]
    fn welch_segments_and_bins() {
        let x: Vec<f64> = (0..64).map(|i| (f64::from(i) * 0.7).sin()).collect();
        let (freqs, psd) = welch(&x, 1.0, 16, None).expect("valid");
        assert_eq!(freqs.len(), 9);
        assert_eq!(psd.len(), 9);
        assert!(psd.iter().all(|p| p.is_finite() && *p >= 0.0));
        assert!(welch(&x, 1.0, 16, Some(16)).is_err());
    }
}
