#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    Overflow,
    IncompatibleElementCount { expected: usize, actual: usize },
    PairedLengthMismatch { real: usize, imag: usize },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow => write!(f, "size arithmetic overflow"),
            Self::IncompatibleElementCount { expected, actual } => {
                write!(f, "element count mismatch expected={expected} actual={actual}")
            }
            Self::PairedLengthMismatch { real, imag } => {
                write!(f, "real/imag length mismatch real={real} imag={imag}")
            }
        }
    }
}

impl std::error::Error for ShapeError {}

pub fn element_count(rows: usize, cols: usize) -> Result<usize, ShapeError> {
    rows.checked_mul(cols).ok_or(ShapeError::Overflow)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Real,
    Complex,
    Index,
}

impl ElementKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Real => "real",
            Self::Complex => "complex",
            Self::Index => "index",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Scalar,
    RealVector,
    ComplexVector,
    RealMatrix,
    ComplexMatrix,
    IndexSet,
}

impl ArtifactKind {
    #[must_use]
    pub const fn element_kind(self) -> ElementKind {
        match self {
            Self::Scalar | Self::RealVector | Self::RealMatrix => ElementKind::Real,
            Self::ComplexVector | Self::ComplexMatrix => ElementKind::Complex,
            Self::IndexSet => ElementKind::Index,
        }
    }

    #[must_use]
    pub const fn is_matrix(self) -> bool {
        matches!(self, Self::RealMatrix | Self::ComplexMatrix)
    }

    #[must_use]
    pub const fn is_complex(self) -> bool {
        matches!(self, Self::ComplexVector | Self::ComplexMatrix)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::RealVector => "real_vector",
            Self::ComplexVector => "complex_vector",
            Self::RealMatrix => "real_matrix",
            Self::ComplexMatrix => "complex_matrix",
            Self::IndexSet => "index_set",
        }
    }
}

/// Logical shape of an artifact. Index sets report `Vector(len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    Vector(usize),
    Matrix { rows: usize, cols: usize },
}

impl Shape {
    #[must_use]
    pub fn element_count(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vector(len) => len,
            Self::Matrix { rows, cols } => rows.saturating_mul(cols),
        }
    }

    #[must_use]
    pub fn dims(self) -> Vec<usize> {
        match self {
            Self::Scalar => Vec::new(),
            Self::Vector(len) => vec![len],
            Self::Matrix { rows, cols } => vec![rows, cols],
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "()"),
            Self::Vector(len) => write!(f, "({len},)"),
            Self::Matrix { rows, cols } => write!(f, "({rows}, {cols})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RealMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl RealMatrix {
    /// Builds a matrix from row-major values.
    pub fn new(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self, ShapeError> {
        let expected = element_count(rows, cols)?;
        if values.len() != expected {
            return Err(ShapeError::IncompatibleElementCount {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self { rows, cols, values })
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ShapeError> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows.len().saturating_mul(cols));
        for row in rows {
            if row.len() != cols {
                return Err(ShapeError::IncompatibleElementCount {
                    expected: cols,
                    actual: row.len(),
                });
            }
            values.extend_from_slice(row);
        }
        Self::new(rows.len(), cols, values)
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.values.get(row * self.cols + col).copied()
    }

    #[must_use]
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.cols;
        self.values.get(start..start + self.cols)
    }

    #[must_use]
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplexVector {
    re: Vec<f64>,
    im: Vec<f64>,
}

impl ComplexVector {
    pub fn new(re: Vec<f64>, im: Vec<f64>) -> Result<Self, ShapeError> {
        if re.len() != im.len() {
            return Err(ShapeError::PairedLengthMismatch {
                real: re.len(),
                imag: im.len(),
            });
        }
        Ok(Self { re, im })
    }

    #[must_use]
    pub fn from_real(re: Vec<f64>) -> Self {
        let im = vec![0.0; re.len()];
        Self { re, im }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.re.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.re.is_empty()
    }

    #[must_use]
    pub fn re(&self) -> &[f64] {
        &self.re
    }

    #[must_use]
    pub fn im(&self) -> &[f64] {
        &self.im
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.re, self.im)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplexMatrix {
    rows: usize,
    cols: usize,
    re: Vec<f64>,
    im: Vec<f64>,
}

impl ComplexMatrix {
    pub fn new(rows: usize, cols: usize, re: Vec<f64>, im: Vec<f64>) -> Result<Self, ShapeError> {
        let expected = element_count(rows, cols)?;
        if re.len() != im.len() {
            return Err(ShapeError::PairedLengthMismatch {
                real: re.len(),
                imag: im.len(),
            });
        }
        if re.len() != expected {
            return Err(ShapeError::IncompatibleElementCount {
                expected,
                actual: re.len(),
            });
        }
        Ok(Self { rows, cols, re, im })
    }

    pub fn from_parts(re: RealMatrix, im: RealMatrix) -> Result<Self, ShapeError> {
        if re.rows() != im.rows() || re.cols() != im.cols() {
            return Err(ShapeError::IncompatibleElementCount {
                expected: re.values().len(),
                actual: im.values().len(),
            });
        }
        let (rows, cols) = (re.rows(), re.cols());
        Self::new(rows, cols, re.into_values(), im.into_values())
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn re(&self) -> &[f64] {
        &self.re
    }

    #[must_use]
    pub fn im(&self) -> &[f64] {
        &self.im
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NumericArtifact {
    Scalar(f64),
    RealVector(Vec<f64>),
    ComplexVector(ComplexVector),
    RealMatrix(RealMatrix),
    ComplexMatrix(ComplexMatrix),
    IndexSet(Vec<i64>),
}

impl NumericArtifact {
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Scalar(_) => ArtifactKind::Scalar,
            Self::RealVector(_) => ArtifactKind::RealVector,
            Self::ComplexVector(_) => ArtifactKind::ComplexVector,
            Self::RealMatrix(_) => ArtifactKind::RealMatrix,
            Self::ComplexMatrix(_) => ArtifactKind::ComplexMatrix,
            Self::IndexSet(_) => ArtifactKind::IndexSet,
        }
    }

    #[must_use]
    pub fn element_kind(&self) -> ElementKind {
        self.kind().element_kind()
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        match self {
            Self::Scalar(_) => Shape::Scalar,
            Self::RealVector(values) => Shape::Vector(values.len()),
            Self::ComplexVector(values) => Shape::Vector(values.len()),
            Self::RealMatrix(matrix) => Shape::Matrix {
                rows: matrix.rows(),
                cols: matrix.cols(),
            },
            Self::ComplexMatrix(matrix) => Shape::Matrix {
                rows: matrix.rows(),
                cols: matrix.cols(),
            },
            Self::IndexSet(indices) => Shape::Vector(indices.len()),
        }
    }

    /// Real parts in row-major order. `None` for index sets.
    #[must_use]
    pub fn real_parts(&self) -> Option<&[f64]> {
        match self {
            Self::Scalar(value) => Some(std::slice::from_ref(value)),
            Self::RealVector(values) => Some(values),
            Self::ComplexVector(values) => Some(values.re()),
            Self::RealMatrix(matrix) => Some(matrix.values()),
            Self::ComplexMatrix(matrix) => Some(matrix.re()),
            Self::IndexSet(_) => None,
        }
    }

    #[must_use]
    pub fn imag_parts(&self) -> Option<&[f64]> {
        match self {
            Self::ComplexVector(values) => Some(values.im()),
            Self::ComplexMatrix(matrix) => Some(matrix.im()),
            _ => None,
        }
    }

    #[must_use]
    pub fn has_non_finite(&self) -> bool {
        let re = self.real_parts().unwrap_or(&[]);
        let im = self.imag_parts().unwrap_or(&[]);
        re.iter().chain(im).any(|value| !value.is_finite())
    }

    /// Largest elementwise magnitude (complex modulus for complex data).
    #[must_use]
    pub fn max_abs(&self) -> f64 {
        match self {
            Self::IndexSet(indices) => indices
                .iter()
                .map(|&idx| idx.unsigned_abs() as f64)
                .fold(0.0, f64::max),
            _ => {
                let re = self.real_parts().unwrap_or(&[]);
                match self.imag_parts() {
                    Some(im) => re
                        .iter()
                        .zip(im)
                        .map(|(r, i)| r.hypot(*i))
                        .fold(0.0, f64::max),
                    None => re.iter().map(|v| v.abs()).fold(0.0, f64::max),
                }
            }
        }
    }

    #[must_use]
    pub fn as_indices(&self) -> Option<&[i64]> {
        match self {
            Self::IndexSet(indices) => Some(indices),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ArtifactKind, ComplexMatrix, ComplexVector, ElementKind, NumericArtifact, RealMatrix,
        Shape, ShapeError,
    };

    #[test]
    fn real_matrix_rejects_wrong_element_count() {
        let err = RealMatrix::new(2, 3, vec![1.0; 5]).expect_err("5 values cannot fill 2x3");
        assert_eq!(
            err,
            ShapeError::IncompatibleElementCount {
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn real_matrix_is_row_major() {
        let matrix = RealMatrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]])
            .expect("rectangular rows");
        assert_eq!(matrix.get(1, 0), Some(4.0));
        assert_eq!(matrix.row(0), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(matrix.get(2, 0), None);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = RealMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).expect_err("ragged");
        assert!(matches!(err, ShapeError::IncompatibleElementCount { .. }));
    }

    #[test]
    fn complex_parts_must_pair() {
        let err = ComplexVector::new(vec![1.0, 2.0], vec![0.0]).expect_err("unpaired");
        assert_eq!(err, ShapeError::PairedLengthMismatch { real: 2, imag: 1 });

        let err = ComplexMatrix::new(2, 2, vec![0.0; 4], vec![0.0; 3]).expect_err("unpaired");
        assert!(matches!(err, ShapeError::PairedLengthMismatch { .. }));
    }

    #[test]
    fn shape_and_kind_follow_variant() {
        let matrix = NumericArtifact::ComplexMatrix(
            ComplexMatrix::new(2, 3, vec![0.0; 6], vec![1.0; 6]).expect("2x3"),
        );
        assert_eq!(matrix.shape(), Shape::Matrix { rows: 2, cols: 3 });
        assert_eq!(matrix.kind(), ArtifactKind::ComplexMatrix);
        assert_eq!(matrix.element_kind(), ElementKind::Complex);
        assert_eq!(matrix.shape().to_string(), "(2, 3)");

        let peaks = NumericArtifact::IndexSet(vec![3, 9]);
        assert_eq!(peaks.shape(), Shape::Vector(2));
        assert!(peaks.real_parts().is_none());
        assert_eq!(NumericArtifact::Scalar(4.0).shape().element_count(), 1);
    }

    #[test]
    fn max_abs_uses_complex_modulus() {
        let values = NumericArtifact::ComplexVector(
            ComplexVector::new(vec![3.0, -1.0], vec![4.0, 0.0]).expect("paired"),
        );
        assert!((values.max_abs() - 5.0).abs() < 1e-15);
    }

    #[test]
    fn non_finite_detection_covers_imaginary_parts() {
        let clean = NumericArtifact::RealVector(vec![1.0, -2.0]);
        assert!(!clean.has_non_finite());

        let dirty = NumericArtifact::ComplexVector(
            ComplexVector::new(vec![1.0], vec![f64::NAN]).expect("paired"),
        );
        assert!(dirty.has_non_finite());
    }
}
