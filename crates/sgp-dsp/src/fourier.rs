use crate::{DctNorm, DspError};
use sgp_artifact::{ComplexMatrix, ComplexVector};
use std::f64::consts::{PI, TAU};

/// Direct DFT. Twiddle angles are reduced modulo `n` before scaling so long
/// transforms keep full precision.
fn dft(re: &[f64], im: &[f64], inverse: bool) -> (Vec<f64>, Vec<f64>) {
    let n = re.len();
    let sign = if inverse { 1.0 } else { -1.0 };
    let mut out_re = vec![0.0; n];
    let mut out_im = vec![0.0; n];
    for k in 0..n {
        let (mut acc_re, mut acc_im) = (0.0, 0.0);
        for j in 0..n {
            let angle = sign * TAU * ((k * j) % n) as f64 / n as f64;
            let (s, c) = angle.sin_cos();
            acc_re += re[j] * c - im[j] * s;
            acc_im += re[j] * s + im[j] * c;
        }
        out_re[k] = acc_re;
        out_im[k] = acc_im;
    }
    if inverse {
        let scale = 1.0 / n as f64;
        out_re.iter_mut().for_each(|v| *v *= scale);
        out_im.iter_mut().for_each(|v| *v *= scale);
    }
    (out_re, out_im)
}

fn checked_pair(values: &ComplexVector, what: &'static str) -> Result<(), DspError> {
    if values.is_empty() {
        return Err(DspError::EmptyInput(what));
    }
    Ok(())
}

fn vector(re: Vec<f64>, im: Vec<f64>) -> Result<ComplexVector, DspError> {
    ComplexVector::new(re, im).map_err(|err| DspError::ShapeContractViolation(err.to_string()))
}

pub fn fft(values: &ComplexVector) -> Result<ComplexVector, DspError> {
    checked_pair(values, "fft input")?;
    let (re, im) = dft(values.re(), values.im(), false);
    vector(re, im)
}

pub fn ifft(values: &ComplexVector) -> Result<ComplexVector, DspError> {
    checked_pair(values, "ifft input")?;
    let (re, im) = dft(values.re(), values.im(), true);
    vector(re, im)
}

/// Non-negative frequency half of the spectrum of a real signal.
pub fn rfft(x: &[f64]) -> Result<ComplexVector, DspError> {
    if x.is_empty() {
        return Err(DspError::EmptyInput("rfft input"));
    }
    let zeros = vec![0.0; x.len()];
    let (mut re, mut im) = dft(x, &zeros, false);
    let keep = x.len() / 2 + 1;
    re.truncate(keep);
    im.truncate(keep);
    vector(re, im)
}

/// Inverse of [`rfft`]. `n` defaults to `2 * (len - 1)`; the half spectrum
/// is truncated or zero-padded to `n / 2 + 1` bins.
pub fn irfft(half: &ComplexVector, n: Option<usize>) -> Result<Vec<f64>, DspError> {
    let m = half.len();
    let n = match n {
        Some(n) => n,
        None if m >= 2 => 2 * (m - 1),
        None => {
            return Err(DspError::InvalidParameter(
                "irfft needs at least two input bins or an explicit n".to_string(),
            ));
        }
    };
    if n == 0 {
        return Err(DspError::InvalidParameter("irfft output length must be > 0".to_string()));
    }
    let mut re = vec![0.0; n];
    let mut im = vec![0.0; n];
    for k in 0..=n / 2 {
        let (r, i) = if k < m {
            (half.re()[k], half.im()[k])
        } else {
            (0.0, 0.0)
        };
        let nyquist = n % 2 == 0 && k == n / 2;
        let i = if k == 0 || nyquist { 0.0 } else { i };
        re[k] = r;
        im[k] = i;
        if k != 0 && !nyquist {
            re[n - k] = r;
            im[n - k] = -i;
        }
    }
    let (out, _) = dft(&re, &im, true);
    Ok(out)
}

#[must_use]
pub fn rfftfreq(n: usize, d: f64) -> Vec<f64> {
    let scale = 1.0 / (n as f64 * d);
    (0..=n / 2).map(|k| k as f64 * scale).collect()
}

fn dft2(matrix: &ComplexMatrix, inverse: bool) -> Result<ComplexMatrix, DspError> {
    let (rows, cols) = (matrix.rows(), matrix.cols());
    if rows == 0 || cols == 0 {
        return Err(DspError::EmptyInput("fft2 input"));
    }
    let mut re = matrix.re().to_vec();
    let mut im = matrix.im().to_vec();
    for r in 0..rows {
        let span = r * cols..(r + 1) * cols;
        let (row_re, row_im) = dft(&re[span.clone()], &im[span.clone()], inverse);
        re[span.clone()].copy_from_slice(&row_re);
        im[span].copy_from_slice(&row_im);
    }
    for c in 0..cols {
        let col_re: Vec<f64> = (0..rows).map(|r| re[r * cols + c]).collect();
        let col_im: Vec<f64> = (0..rows).map(|r| im[r * cols + c]).collect();
        let (out_re, out_im) = dft(&col_re, &col_im, inverse);
        for r in 0..rows {
            re[r * cols + c] = out_re[r];
            im[r * cols + c] = out_im[r];
        }
    }
    ComplexMatrix::new(rows, cols, re, im)
        .map_err(|err| DspError::ShapeContractViolation(err.to_string()))
}

pub fn fft2(matrix: &ComplexMatrix) -> Result<ComplexMatrix, DspError> {
    dft2(matrix, false)
}

pub fn ifft2(matrix: &ComplexMatrix) -> Result<ComplexMatrix, DspError> {
    dft2(matrix, true)
}

/// Analytic signal `x + i H(x)`.
pub fn hilbert(x: &[f64]) -> Result<ComplexVector, DspError> {
    let n = x.len();
    if n == 0 {
        return Err(DspError::EmptyInput("hilbert input"));
    }
    let zeros = vec![0.0; n];
    let (mut re, mut im) = dft(x, &zeros, false);
    for k in 0..n {
        let h = if k == 0 || (n % 2 == 0 && k == n / 2) {
            1.0
        } else if k < n.div_ceil(2) {
            2.0
        } else {
            0.0
        };
        re[k] *= h;
        im[k] *= h;
    }
    let (out_re, out_im) = dft(&re, &im, true);
    vector(out_re, out_im)
}

/// Type-II DCT.
pub fn dct2(x: &[f64], norm: DctNorm) -> Result<Vec<f64>, DspError> {
    let n = x.len();
    if n == 0 {
        return Err(DspError::EmptyInput("dct input"));
    }
    let nf = n as f64;
    let mut out = Vec::with_capacity(n);
    for k in 0..n {
        let sum: f64 = x
            .iter()
            .enumerate()
            .map(|(j, v)| v * (PI * k as f64 * (2 * j + 1) as f64 / (2.0 * nf)).cos())
            .sum();
        let scaled = match norm {
            DctNorm::Backward => 2.0 * sum,
            DctNorm::Ortho if k == 0 => 2.0 * sum * (1.0 / (4.0 * nf)).sqrt(),
            DctNorm::Ortho => 2.0 * sum * (1.0 / (2.0 * nf)).sqrt(),
        };
        out.push(scaled);
    }
    Ok(out)
}

/// Inverse of [`dct2`] under the same normalization.
pub fn idct2(y: &[f64], norm: DctNorm) -> Result<Vec<f64>, DspError> {
    let n = y.len();
    if n == 0 {
        return Err(DspError::EmptyInput("idct input"));
    }
    let nf = n as f64;
    let mut out = Vec::with_capacity(n);
    for j in 0..n {
        let tail: f64 = y
            .iter()
            .enumerate()
            .skip(1)
            .map(|(k, v)| v * (PI * k as f64 * (2 * j + 1) as f64 / (2.0 * nf)).cos())
            .sum();
        let value = match norm {
            DctNorm::Backward => (y[0] + 2.0 * tail) / (2.0 * nf),
            DctNorm::Ortho => y[0] / nf.sqrt() + (2.0 / nf).sqrt() * tail,
        };
        out.push(value);
    }
    Ok(out)
}

/// Fourier-domain resampling of a real signal to `num` samples.
pub fn resample(x: &[f64], num: usize) -> Result<Vec<f64>, DspError> {
    let nx = x.len();
    if nx == 0 {
        return Err(DspError::EmptyInput("resample input"));
    }
    if num == 0 {
        return Err(DspError::InvalidParameter("resample target must be > 0".to_string()));
    }
    let spectrum = rfft(x)?;
    let bins = num / 2 + 1;
    let mut re = vec![0.0; bins];
    let mut im = vec![0.0; bins];
    let n = num.min(nx);
    let nyq = (n / 2 + 1).min(bins).min(spectrum.len());
    re[..nyq].copy_from_slice(&spectrum.re()[..nyq]);
    im[..nyq].copy_from_slice(&spectrum.im()[..nyq]);
    if n % 2 == 0 && n / 2 < bins {
        let factor = if num < nx {
            2.0
        } else if nx < num {
            0.5
        } else {
            1.0
        };
        re[n / 2] *= factor;
        im[n / 2] *= factor;
    }
    let half = vector(re, im)?;
    let scale = num as f64 / nx as f64;
    Ok(irfft(&half, Some(num))?
        .into_iter()
        .map(|v| v * scale)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{dct2, fft, fft2, hilbert, idct2, ifft, irfft, resample, rfft, rfftfreq};
    use crate::DctNorm;
    use sgp_artifact::{ComplexMatrix, ComplexVector};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn fft_of_impulse_is_flat() {
        let mut re = vec![0.0; 8];
        re[0] = 1.0;
        let spectrum = fft(&ComplexVector::from_real(re)).expect("non-empty");
        assert!(spectrum.re().iter().all(|v| close(*v, 1.0)));
        assert!(spectrum.im().iter().all(|v| close(*v, 0.0)));
    }

    #[test]
    fn ifft_inverts_fft() {
        let x = ComplexVector::new(vec![1.0, -2.0, 3.5, 0.25, 9.0], vec![0.0, 1.0, -1.0, 2.0, 0.5])
            .expect("paired");
        let back = ifft(&fft(&x).expect("fft")).expect("ifft");
        for (a, b) in back.re().iter().zip(x.re()) {
            assert!(close(*a, *b));
        }
        for (a, b) in back.im().iter().zip(x.im()) {
            assert!(close(*a, *b));
        }
    }

    #[test]
    fn irfft_inverts_rfft_for_even_and_odd_lengths() {
        for x in [vec![1.0, 2.0, 0.5, -1.0], vec![3.0, -1.0, 2.0, 0.0, 4.0]] {
            let half = rfft(&x).expect("rfft");
            assert_eq!(half.len(), x.len() / 2 + 1);
            let back = irfft(&half, Some(x.len())).expect("irfft");
            for (a, b) in back.iter().zip(&x) {
                assert!(close(*a, *b), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn rfftfreq_spacing() {
        assert_eq!(rfftfreq(8, 0.5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn fft2_dc_term_is_sum() {
        let m = ComplexMatrix::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![0.0; 6])
            .expect("2x3");
        let spectrum = fft2(&m).expect("fft2");
        assert!(close(spectrum.re()[0], 21.0));
    }

    #[test]
    fn hilbert_of_cosine_is_sine() {
        let n = 32;
        let x: Vec<f64> = (0..n)
            .map(|i| (std::f64::consts::TAU * 4.0 * i as f64 / n as f64).cos())
            .collect();
        let analytic = hilbert(&x).expect("hilbert");
        for (i, (re, im)) in analytic.re().iter().zip(analytic.im()).enumerate() {
            let phase = std::f64::consts::TAU * 4.0 * i as f64 / n as f64;
            assert!(close(*re, phase.cos()));
            assert!(close(*im, phase.sin()));
        }
    }

    #[test]
    fn dct_pair_round_trips() {
        let x = [1.0, 2.0, -3.0, 0.5, 4.0, 0.0, 1.5, -2.0];
        for norm in [DctNorm::Backward, DctNorm::Ortho] {
            let y = dct2(&x, norm).expect("dct");
            let back = idct2(&y, norm).expect("idct");
            for (a, b) in back.iter().zip(&x) {
                assert!(close(*a, *b), "{a} vs {b}");
            }
        }
        let dc = dct2(&[1.0, 1.0], DctNorm::Backward).expect("dct");
        assert!(close(dc[0], 4.0));
    }

    #[test]
    fn resample_preserves_constant_signal() {
        let up = resample(&[2.0; 20], 50).expect("upsample");
        assert_eq!(up.len(), 50);
        assert!(up.iter().all(|v| close(*v, 2.0)));
        let down = resample(&[1.0; 100], 30).expect("downsample");
        assert!(down.iter().all(|v| close(*v, 1.0)));
    }
}
