use crate::DspError;

/// Least-squares polynomial fit, coefficients highest power first.
///
/// The Vandermonde columns are scaled to unit norm before a Householder QR
/// solve.
pub fn polyfit(x: &[f64], y: &[f64], deg: usize) -> Result<Vec<f64>, DspError> {
    if x.len() != y.len() {
        return Err(DspError::ShapeContractViolation(format!(
            "polyfit x has {} samples but y has {}",
            x.len(),
            y.len()
        )));
    }
    let rows = x.len();
    let cols = deg + 1;
    if rows < cols {
        return Err(DspError::InvalidParameter(format!(
            "degree {deg} needs at least {cols} samples, got {rows}"
        )));
    }

    // Row-major Vandermonde, highest power first.
    let mut a = vec![0.0; rows * cols];
    for (r, xv) in x.iter().enumerate() {
        let mut power = 1.0;
        for c in (0..cols).rev() {
            a[r * cols + c] = power;
            power *= xv;
        }
    }
    let mut scale = vec![0.0; cols];
    for (c, s) in scale.iter_mut().enumerate() {
        *s = (0..rows).map(|r| a[r * cols + c].powi(2)).sum::<f64>().sqrt();
        if *s == 0.0 {
            *s = 1.0;
        }
        for r in 0..rows {
            a[r * cols + c] /= *s;
        }
    }

    let mut b = y.to_vec();
    for k in 0..cols {
        let norm = (k..rows).map(|r| a[r * cols + k].powi(2)).sum::<f64>().sqrt();
        if norm <= f64::EPSILON * rows as f64 {
            return Err(DspError::SingularSystem);
        }
        let alpha = if a[k * cols + k] > 0.0 { -norm } else { norm };
        let mut v: Vec<f64> = (k..rows).map(|r| a[r * cols + k]).collect();
        v[0] -= alpha;
        let v_norm_sq: f64 = v.iter().map(|e| e * e).sum();
        if v_norm_sq == 0.0 {
            continue;
        }
        for c in k..cols {
            let dot: f64 = v.iter().enumerate().map(|(i, e)| e * a[(k + i) * cols + c]).sum();
            let f = 2.0 * dot / v_norm_sq;
            for (i, e) in v.iter().enumerate() {
                a[(k + i) * cols + c] -= f * e;
            }
        }
        let dot: f64 = v.iter().enumerate().map(|(i, e)| e * b[k + i]).sum();
        let f = 2.0 * dot / v_norm_sq;
        for (i, e) in v.iter().enumerate() {
            b[k + i] -= f * e;
        }
    }

    let mut coef = vec![0.0; cols];
    for k in (0..cols).rev() {
        let tail: f64 = (k + 1..cols).map(|c| a[k * cols + c] * coef[c]).sum();
        coef[k] = (b[k] - tail) / a[k * cols + k];
    }
    Ok(coef.iter().zip(&scale).map(|(c, s)| c / s).collect())
}

/// Horner evaluation of `p` (highest power first) at each `x`.
#[must_use]
pub fn polyval(p: &[f64], x: &[f64]) -> Vec<f64> {
    x.iter()
        .map(|xv| p.iter().fold(0.0, |acc, c| acc * xv + c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{polyfit, polyval};

    #[test]
    fn exact_quadratic_is_recovered() {
        let x: Vec<f64> = (0..6).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v * v - 3.0 * v + 0.5).collect();
        let p = polyfit(&x, &y, 2).expect("well posed");
        assert!((p[0] - 2.0).abs() < 1e-12);
        assert!((p[1] + 3.0).abs() < 1e-12);
        assert!((p[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn overdetermined_line_minimizes_residual() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [0.0, 1.0, 1.0, 3.0];
        let p = polyfit(&x, &y, 1).expect("well posed");
        assert!((p[0] - 0.9).abs() < 1e-12);
        assert!((p[1] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn underdetermined_fit_is_rejected() {
        assert!(polyfit(&[1.0, 2.0], &[1.0, 2.0], 3).is_err());
        assert!(polyfit(&[1.0], &[1.0, 2.0], 0).is_err());
    }

    #[test]
    fn polyval_uses_highest_power_first() {
        assert_eq!(polyval(&[1.0, 0.0, -1.0], &[0.0, 2.0]), vec![-1.0, 3.0]);
    }
}
