//! Test-signal synthesis over explicit seeds.

use crate::{DeterministicRng, RandomError};
use std::f64::consts::TAU;

/// `n` evenly spaced samples over `[start, stop]`, or `[start, stop)`
/// when `endpoint` is false.
pub fn linspace(start: f64, stop: f64, n: usize, endpoint: bool) -> Result<Vec<f64>, RandomError> {
    if n == 0 {
        return Err(RandomError::InvalidLength);
    }
    if n == 1 {
        return Ok(vec![start]);
    }
    let div = if endpoint { n - 1 } else { n } as f64;
    let step = (stop - start) / div;
    Ok((0..n).map(|i| start + step * i as f64).collect())
}

/// Sum of `(frequency_hz, amplitude)` sinusoids sampled at `fs`, plus
/// gaussian noise of standard deviation `noise`.
pub fn sine_mix(
    fs: f64,
    n: usize,
    components: &[(f64, f64)],
    noise: f64,
    rng: &mut DeterministicRng,
) -> Result<Vec<f64>, RandomError> {
    if n == 0 {
        return Err(RandomError::InvalidLength);
    }
    if !(fs.is_finite() && fs > 0.0) {
        return Err(RandomError::InvalidRange);
    }
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let t = i as f64 / fs;
        let clean: f64 = components
            .iter()
            .map(|(freq, amp)| amp * (TAU * freq * t).sin())
            .sum();
        let jitter = if noise > 0.0 {
            noise * rng.next_standard_normal()
        } else {
            0.0
        };
        out.push(clean + jitter);
    }
    Ok(out)
}

/// Linear chirp sweeping `f0` to `f1` over `n` samples.
pub fn chirp(fs: f64, n: usize, f0: f64, f1: f64) -> Result<Vec<f64>, RandomError> {
    if n == 0 {
        return Err(RandomError::InvalidLength);
    }
    if !(fs.is_finite() && fs > 0.0) {
        return Err(RandomError::InvalidRange);
    }
    let duration = n as f64 / fs;
    let rate = (f1 - f0) / duration;
    Ok((0..n)
        .map(|i| {
            let t = i as f64 / fs;
            (TAU * (f0 * t + 0.5 * rate * t * t)).sin()
        })
        .collect())
}

/// Gaussian bumps `(center, width, height)` on a zero baseline with noise.
pub fn gaussian_bumps(
    n: usize,
    bumps: &[(f64, f64, f64)],
    noise: f64,
    rng: &mut DeterministicRng,
) -> Result<Vec<f64>, RandomError> {
    if n == 0 {
        return Err(RandomError::InvalidLength);
    }
    if bumps.iter().any(|(_, width, _)| !(width.is_finite() && *width > 0.0)) {
        return Err(RandomError::InvalidRange);
    }
    Ok((0..n)
        .map(|i| {
            let x = i as f64;
            let clean: f64 = bumps
                .iter()
                .map(|(center, width, height)| {
                    let z = (x - center) / width;
                    height * (-0.5 * z * z).exp()
                })
                .sum();
            clean + noise * rng.next_standard_normal()
        })
        .collect())
}

/// Alternating unit steps of `period` samples with a linear trend of `slope`.
pub fn square_steps(n: usize, period: usize, slope: f64) -> Result<Vec<f64>, RandomError> {
    if n == 0 || period == 0 {
        return Err(RandomError::InvalidLength);
    }
    Ok((0..n)
        .map(|i| {
            let level = if (i / period) % 2 == 0 { 1.0 } else { -1.0 };
            level + slope * i as f64
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{chirp, gaussian_bumps, linspace, sine_mix, square_steps};
    use crate::{DeterministicRng, RandomError};

    #[test]
    fn linspace_includes_endpoint() {
        let values = linspace(0.0, 2.0, 11, true).expect("n > 0");
        assert_eq!(values.len(), 11);
        assert!((values[10] - 2.0).abs() < 1e-15);
        assert!((values[1] - 0.2).abs() < 1e-15);

        let open = linspace(0.0, 1.0, 4, false).expect("n > 0");
        assert_eq!(open, vec![0.0, 0.25, 0.5, 0.75]);
        assert_eq!(linspace(0.0, 1.0, 0, true), Err(RandomError::InvalidLength));
    }

    #[test]
    fn noiseless_sine_is_seed_independent() {
        let mut a = DeterministicRng::new(1);
        let mut b = DeterministicRng::new(2);
        let x = sine_mix(250.0, 64, &[(10.0, 1.0)], 0.0, &mut a).expect("valid");
        let y = sine_mix(250.0, 64, &[(10.0, 1.0)], 0.0, &mut b).expect("valid");
        assert_eq!(x, y);
    }

    #[test]
    fn noisy_signal_is_reproducible() {
        let x = sine_mix(250.0, 32, &[(5.0, 1.0)], 0.1, &mut DeterministicRng::new(9))
            .expect("valid");
        let y = sine_mix(250.0, 32, &[(5.0, 1.0)], 0.1, &mut DeterministicRng::new(9))
            .expect("valid");
        assert_eq!(x, y);
    }

    #[test]
    fn chirp_starts_at_zero_phase() {
        let values = chirp(1000.0, 100, 10.0, 100.0).expect("valid");
        assert_eq!(values[0], 0.0);
        assert!(values.iter().all(|v| v.abs() <= 1.0));
    }

    #[test]
    fn bumps_peak_near_centers() {
        let mut rng = DeterministicRng::new(5);
        let values = gaussian_bumps(100, &[(50.0, 3.0, 2.0)], 0.0, &mut rng).expect("valid");
        let (argmax, _) = values
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, v)| if *v > best.1 { (i, *v) } else { best });
        assert_eq!(argmax, 50);
        assert!(gaussian_bumps(10, &[(1.0, 0.0, 1.0)], 0.0, &mut rng).is_err());
    }

    #[test]
    fn steps_alternate_with_trend() {
        let values = square_steps(6, 2, 0.0).expect("valid");
        assert_eq!(values, vec![1.0, 1.0, -1.0, -1.0, 1.0, 1.0]);
    }
}
