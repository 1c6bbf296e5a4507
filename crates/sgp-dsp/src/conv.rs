use crate::{ConvolveMode, DspError};
use sgp_artifact::RealMatrix;

fn convolve_full(a: &[f64], v: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + v.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, h) in v.iter().enumerate() {
            out[i + j] += x * h;
        }
    }
    out
}

/// Window of a full-length result: `same` keeps `len(in1)` samples centered,
/// `valid` keeps the fully overlapping part.
fn window_1d(full: Vec<f64>, n1: usize, n2: usize, mode: ConvolveMode) -> Vec<f64> {
    match mode {
        ConvolveMode::Full => full,
        ConvolveMode::Same => {
            let start = (full.len() - n1) / 2;
            full[start..start + n1].to_vec()
        }
        ConvolveMode::Valid => {
            let start = n1.min(n2) - 1;
            let len = n1.max(n2) - n1.min(n2) + 1;
            full[start..start + len].to_vec()
        }
    }
}

pub fn convolve(in1: &[f64], in2: &[f64], mode: ConvolveMode) -> Result<Vec<f64>, DspError> {
    if in1.is_empty() || in2.is_empty() {
        return Err(DspError::EmptyInput("convolve inputs"));
    }
    Ok(window_1d(convolve_full(in1, in2), in1.len(), in2.len(), mode))
}

/// Cross-correlation as convolution with the reversed second input.
pub fn correlate(in1: &[f64], in2: &[f64], mode: ConvolveMode) -> Result<Vec<f64>, DspError> {
    let reversed: Vec<f64> = in2.iter().rev().copied().collect();
    convolve(in1, &reversed, mode)
}

pub fn convolve2d(
    in1: &RealMatrix,
    in2: &RealMatrix,
    mode: ConvolveMode,
) -> Result<RealMatrix, DspError> {
    let (r1, c1) = (in1.rows(), in1.cols());
    let (r2, c2) = (in2.rows(), in2.cols());
    if r1 == 0 || c1 == 0 || r2 == 0 || c2 == 0 {
        return Err(DspError::EmptyInput("convolve2d inputs"));
    }
    let (fr, fc) = (r1 + r2 - 1, c1 + c2 - 1);
    let mut full = vec![0.0; fr * fc];
    for i in 0..r1 {
        for j in 0..c1 {
            let x = in1.values()[i * c1 + j];
            for k in 0..r2 {
                for l in 0..c2 {
                    full[(i + k) * fc + j + l] += x * in2.values()[k * c2 + l];
                }
            }
        }
    }

    let (row0, col0, rows, cols) = match mode {
        ConvolveMode::Full => (0, 0, fr, fc),
        ConvolveMode::Same => ((fr - r1) / 2, (fc - c1) / 2, r1, c1),
        ConvolveMode::Valid => {
            let contains = (r1 >= r2 && c1 >= c2) || (r2 >= r1 && c2 >= c1);
            if !contains {
                return Err(DspError::ShapeContractViolation(
                    "valid mode needs one input at least as large as the other in every dimension"
                        .to_string(),
                ));
            }
            (
                r1.min(r2) - 1,
                c1.min(c2) - 1,
                r1.abs_diff(r2) + 1,
                c1.abs_diff(c2) + 1,
            )
        }
    };
    let mut values = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        let start = (row0 + i) * fc + col0;
        values.extend_from_slice(&full[start..start + cols]);
    }
    RealMatrix::new(rows, cols, values)
        .map_err(|err| DspError::ShapeContractViolation(err.to_string()))
}

pub fn correlate2d(
    in1: &RealMatrix,
    in2: &RealMatrix,
    mode: ConvolveMode,
) -> Result<RealMatrix, DspError> {
    let rotated: Vec<f64> = in2.values().iter().rev().copied().collect();
    let kernel = RealMatrix::new(in2.rows(), in2.cols(), rotated)
        .map_err(|err| DspError::ShapeContractViolation(err.to_string()))?;
    convolve2d(in1, &kernel, mode)
}

#[cfg(test)]
mod tests {
    use super::{convolve, convolve2d, correlate, correlate2d};
    use crate::ConvolveMode;
    use sgp_artifact::RealMatrix;

    #[test]
    fn correlate_all_modes() {
        let a = [1.0, 2.0, 3.0];
        let v = [0.0, 1.0, 0.5];
        assert_eq!(
            correlate(&a, &v, ConvolveMode::Full).expect("full"),
            vec![0.5, 2.0, 3.5, 3.0, 0.0]
        );
        assert_eq!(
            correlate(&a, &v, ConvolveMode::Same).expect("same"),
            vec![2.0, 3.5, 3.0]
        );
        assert_eq!(correlate(&a, &v, ConvolveMode::Valid).expect("valid"), vec![3.5]);
    }

    #[test]
    fn convolve_same_keeps_first_length() {
        let out = convolve(&[1.0, 1.0, 1.0, 1.0, 1.0], &[1.0, 1.0], ConvolveMode::Same)
            .expect("same");
        assert_eq!(out.len(), 5);
        assert_eq!(out, vec![1.0, 2.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn valid_with_longer_second_input() {
        let out = convolve(&[1.0, 2.0], &[1.0, 0.0, 0.0, 1.0], ConvolveMode::Valid)
            .expect("valid");
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = convolve(&[], &[1.0], ConvolveMode::Full).expect_err("empty");
        assert_eq!(err.reason_code(), "dsp_empty_input");
    }

    #[test]
    fn convolve2d_full_and_valid() {
        let a = RealMatrix::from_rows(&[
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
        ])
        .expect("3x3");
        let k = RealMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, -1.0]]).expect("2x2");
        let full = convolve2d(&a, &k, ConvolveMode::Full).expect("full");
        assert_eq!((full.rows(), full.cols()), (4, 4));
        assert_eq!(full.get(0, 0), Some(1.0));
        assert_eq!(full.get(3, 3), Some(-9.0));

        let valid = convolve2d(&a, &k, ConvolveMode::Valid).expect("valid");
        assert_eq!(valid.values(), &[4.0, 4.0, 4.0, 4.0]);

        let same = correlate2d(&a, &k, ConvolveMode::Same).expect("same");
        assert_eq!((same.rows(), same.cols()), (3, 3));
    }
}
