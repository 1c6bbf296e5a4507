use crate::DspError;

fn check_knots(xp: &[f64], fp: &[f64], min_len: usize) -> Result<(), DspError> {
    if xp.len() != fp.len() {
        return Err(DspError::ShapeContractViolation(format!(
            "{} knots but {} values",
            xp.len(),
            fp.len()
        )));
    }
    if xp.len() < min_len {
        return Err(DspError::InvalidParameter(format!(
            "interpolation needs at least {min_len} knots"
        )));
    }
    if xp.windows(2).any(|w| w[1] <= w[0]) {
        return Err(DspError::InvalidParameter(
            "knots must be strictly increasing".to_string(),
        ));
    }
    Ok(())
}

/// Index `i` of the knot interval `[xp[i], xp[i + 1]]` used for `x`,
/// clamped to the first or last interval outside the range.
fn interval(xp: &[f64], x: f64) -> usize {
    let upper = xp.partition_point(|knot| *knot <= x);
    upper.saturating_sub(1).min(xp.len() - 2)
}

/// Piecewise-linear interpolation; values outside the knots are clamped to
/// the end values.
pub fn interp_linear(x: &[f64], xp: &[f64], fp: &[f64]) -> Result<Vec<f64>, DspError> {
    check_knots(xp, fp, 1)?;
    let last = xp.len() - 1;
    Ok(x.iter()
        .map(|&xv| {
            if xv <= xp[0] {
                fp[0]
            } else if xv >= xp[last] {
                fp[last]
            } else {
                let i = interval(xp, xv);
                let t = (xv - xp[i]) / (xp[i + 1] - xp[i]);
                fp[i] + t * (fp[i + 1] - fp[i])
            }
        })
        .collect())
}

/// Cubic spline with zero second derivative at both ends. Points outside
/// the knots extrapolate the end polynomials.
pub fn natural_cubic_spline(x: &[f64], xp: &[f64], fp: &[f64]) -> Result<Vec<f64>, DspError> {
    check_knots(xp, fp, 2)?;
    let n = xp.len();
    let h: Vec<f64> = xp.windows(2).map(|w| w[1] - w[0]).collect();

    let mut m = vec![0.0; n];
    if n > 2 {
        let inner = n - 2;
        let mut diag = vec![0.0; inner];
        let mut rhs = vec![0.0; inner];
        for i in 0..inner {
            let k = i + 1;
            diag[i] = 2.0 * (h[k - 1] + h[k]);
            rhs[i] = 6.0 * ((fp[k + 1] - fp[k]) / h[k] - (fp[k] - fp[k - 1]) / h[k - 1]);
        }
        // Thomas sweep; the off-diagonals are h[k].
        for i in 1..inner {
            let w = h[i] / diag[i - 1];
            diag[i] -= w * h[i];
            rhs[i] -= w * rhs[i - 1];
        }
        m[inner] = rhs[inner - 1] / diag[inner - 1];
        for i in (0..inner - 1).rev() {
            m[i + 1] = (rhs[i] - h[i + 1] * m[i + 2]) / diag[i];
        }
    }

    Ok(x.iter()
        .map(|&xv| {
            let i = interval(xp, xv);
            let hi = h[i];
            let a = xp[i + 1] - xv;
            let b = xv - xp[i];
            m[i] * a.powi(3) / (6.0 * hi)
                + m[i + 1] * b.powi(3) / (6.0 * hi)
                + (fp[i] / hi - m[i] * hi / 6.0) * a
                + (fp[i + 1] / hi - m[i + 1] * hi / 6.0) * b
        })
        .collect())
}
