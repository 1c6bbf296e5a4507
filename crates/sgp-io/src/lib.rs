#![forbid(unsafe_code)]

mod store;

pub use store::{ArtifactStore, role_name};

use sgp_artifact::{ArtifactKind, ComplexMatrix, ComplexVector, NumericArtifact, RealMatrix};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    HeaderMismatch,
    Parse,
    ColumnMismatch,
    KindMismatch,
}

impl FormatKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HeaderMismatch => "header_mismatch",
            Self::Parse => "parse",
            Self::ColumnMismatch => "column_mismatch",
            Self::KindMismatch => "kind_mismatch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    Format { kind: FormatKind, detail: String },
    MissingArtifact { path: PathBuf },
    Io { path: PathBuf, message: String },
}

impl CodecError {
    fn format(kind: FormatKind, detail: impl Into<String>) -> Self {
        Self::Format {
            kind,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Format { kind, .. } => match kind {
                FormatKind::HeaderMismatch => "codec_header_mismatch",
                FormatKind::Parse => "codec_parse",
                FormatKind::ColumnMismatch => "codec_column_mismatch",
                FormatKind::KindMismatch => "codec_kind_mismatch",
            },
            Self::MissingArtifact { .. } => "codec_missing_artifact",
            Self::Io { .. } => "codec_io",
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingArtifact { .. })
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format { kind, detail } => write!(f, "format error ({}): {detail}", kind.as_str()),
            Self::MissingArtifact { path } => write!(f, "missing artifact {}", path.display()),
            Self::Io { path, message } => write!(f, "io failure at {}: {message}", path.display()),
        }
    }
}

impl std::error::Error for CodecError {}

/// Text payload resolved once from the line structure of a file.
#[derive(Debug, Clone, PartialEq)]
pub enum TextPayload {
    /// One value per line.
    Flat(Vec<f64>),
    /// Values under a `rows cols` header, row-major.
    Shaped {
        rows: usize,
        cols: usize,
        values: Vec<f64>,
    },
    /// Un-headed multi-column rows.
    Table {
        rows: usize,
        cols: usize,
        values: Vec<f64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedShape {
    pub kind: ArtifactKind,
    pub dims: Option<(usize, usize)>,
}

impl ExpectedShape {
    #[must_use]
    pub const fn of(kind: ArtifactKind) -> Self {
        Self { kind, dims: None }
    }

    #[must_use]
    pub const fn with_dims(mut self, rows: usize, cols: usize) -> Self {
        self.dims = Some((rows, cols));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub artifact: NumericArtifact,
    pub warnings: Vec<String>,
}

impl Decoded {
    fn clean(artifact: NumericArtifact) -> Self {
        Self {
            artifact,
            warnings: Vec::new(),
        }
    }
}

/// `%.16e` with a signed two-digit exponent; non-finite values as `nan`, `inf`, `-inf`.
#[must_use]
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let raw = format!("{value:.16e}");
    let Some((mantissa, exponent)) = raw.split_once('e') else {
        return raw;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
}

fn parse_value(token: &str, line_no: usize) -> Result<f64, CodecError> {
    token.parse::<f64>().map_err(|_| {
        CodecError::format(
            FormatKind::Parse,
            format!("line {line_no}: cannot parse '{token}' as a number"),
        )
    })
}

fn parse_index(token: &str, line_no: usize) -> Result<i64, CodecError> {
    if let Ok(value) = token.parse::<i64>() {
        return Ok(value);
    }
    let value = parse_value(token, line_no)?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.007_199_254_740_992e15 {
        Ok(value as i64)
    } else {
        Err(CodecError::format(
            FormatKind::Parse,
            format!("line {line_no}: '{token}' is not an integral index"),
        ))
    }
}

fn content_lines(text: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    text.lines().enumerate().filter_map(|(idx, line)| {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }
        let tokens = trimmed
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .collect();
        Some((idx + 1, tokens))
    })
}

fn is_header(tokens: &[&str]) -> bool {
    tokens.len() == 2
        && tokens
            .iter()
            .all(|token| !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
}

/// Resolves the layout of a text file without interpreting its meaning.
pub fn parse_payload(text: &str) -> Result<(TextPayload, Vec<String>), CodecError> {
    let lines: Vec<(usize, Vec<&str>)> = content_lines(text).collect();
    let mut warnings = Vec::new();

    let Some((_, first)) = lines.first() else {
        return Ok((TextPayload::Flat(Vec::new()), warnings));
    };

    if is_header(first) {
        let rows: usize = first[0]
            .parse()
            .map_err(|_| CodecError::format(FormatKind::Parse, "row count in header"))?;
        let cols: usize = first[1]
            .parse()
            .map_err(|_| CodecError::format(FormatKind::Parse, "column count in header"))?;
        let expected = rows
            .checked_mul(cols)
            .ok_or_else(|| CodecError::format(FormatKind::HeaderMismatch, "header overflows"))?;
        let body = &lines[1..];
        let mut values = Vec::with_capacity(expected);
        for (line_no, tokens) in body {
            for token in tokens {
                values.push(parse_value(token, *line_no)?);
            }
        }
        let rows_match = body.len() == rows && body.iter().all(|(_, tokens)| tokens.len() == cols);
        if rows_match {
            return Ok((TextPayload::Shaped { rows, cols, values }, warnings));
        }
        let flat_body = body.iter().all(|(_, tokens)| tokens.len() == 1);
        if flat_body && values.len() == expected {
            warnings.push(format!(
                "flat payload of {} values reshaped to declared ({rows}, {cols})",
                values.len()
            ));
            return Ok((TextPayload::Shaped { rows, cols, values }, warnings));
        }
        return Err(CodecError::format(
            FormatKind::HeaderMismatch,
            format!(
                "header declares ({rows}, {cols}) but body has {} rows and {} values",
                body.len(),
                values.len()
            ),
        ));
    }

    table_payload(&lines).map(|payload| (payload, warnings))
}

/// Layout of un-headed lines: one column is flat, more is a table.
fn table_payload(lines: &[(usize, Vec<&str>)]) -> Result<TextPayload, CodecError> {
    let Some((_, first)) = lines.first() else {
        return Ok(TextPayload::Flat(Vec::new()));
    };
    let cols = first.len();
    let mut values = Vec::with_capacity(lines.len() * cols);
    for (line_no, tokens) in lines {
        if tokens.len() != cols {
            return Err(CodecError::format(
                FormatKind::ColumnMismatch,
                format!("line {line_no}: expected {cols} columns, found {}", tokens.len()),
            ));
        }
        for token in tokens {
            values.push(parse_value(token, *line_no)?);
        }
    }
    if cols == 1 {
        Ok(TextPayload::Flat(values))
    } else {
        Ok(TextPayload::Table {
            rows: lines.len(),
            cols,
            values,
        })
    }
}

/// A single complex file is the two-column compatibility layout, which never
/// carries a header; an integral first row such as `4 0` is data.
fn parse_complex_columns(text: &str) -> Result<(TextPayload, Vec<String>), CodecError> {
    let lines: Vec<(usize, Vec<&str>)> = content_lines(text).collect();
    table_payload(&lines).map(|payload| (payload, Vec::new()))
}

fn check_declared(
    dims: Option<(usize, usize)>,
    rows: usize,
    cols: usize,
) -> Result<(), CodecError> {
    match dims {
        Some((want_rows, want_cols)) if (want_rows, want_cols) != (rows, cols) => {
            Err(CodecError::format(
                FormatKind::HeaderMismatch,
                format!("file holds ({rows}, {cols}) but ({want_rows}, {want_cols}) was declared"),
            ))
        }
        _ => Ok(()),
    }
}

/// One integer per line; an empty text is an empty set.
pub fn decode_indices(text: &str) -> Result<Vec<i64>, CodecError> {
    let mut indices = Vec::new();
    for (line_no, tokens) in content_lines(text) {
        if tokens.len() != 1 {
            return Err(CodecError::format(
                FormatKind::ColumnMismatch,
                format!("line {line_no}: index files hold one value per line"),
            ));
        }
        indices.push(parse_index(tokens[0], line_no)?);
    }
    Ok(indices)
}

fn reshape_flat(
    values: Vec<f64>,
    rows: usize,
    cols: usize,
) -> Result<RealMatrix, CodecError> {
    let len = values.len();
    RealMatrix::new(rows, cols, values).map_err(|err| {
        CodecError::format(
            FormatKind::HeaderMismatch,
            format!("{len} values cannot fill declared ({rows}, {cols}): {err}"),
        )
    })
}

fn matrix_from(rows: usize, cols: usize, values: Vec<f64>) -> Result<RealMatrix, CodecError> {
    RealMatrix::new(rows, cols, values)
        .map_err(|err| CodecError::format(FormatKind::HeaderMismatch, err.to_string()))
}

/// Decodes one text file. Vector versus matrix layout is taken from the
/// payload; `expected` selects index or complex interpretation and may
/// declare dimensions for a flat payload.
pub fn decode(text: &str, expected: Option<&ExpectedShape>) -> Result<Decoded, CodecError> {
    let kind = expected.map(|shape| shape.kind);
    if kind == Some(ArtifactKind::IndexSet) {
        return decode_indices(text).map(|indices| Decoded::clean(NumericArtifact::IndexSet(indices)));
    }

    let wants_complex = kind.is_some_and(ArtifactKind::is_complex);
    let (payload, mut warnings) = if wants_complex {
        parse_complex_columns(text)?
    } else {
        parse_payload(text)?
    };
    let dims = expected.and_then(|shape| shape.dims);
    let artifact = match payload {
        TextPayload::Flat(values) => match (kind, dims) {
            (_, Some((rows, cols))) => {
                let count = values.len();
                let matrix = reshape_flat(values, rows, cols)?;
                warnings.push(format!(
                    "flat payload of {count} values reshaped to declared ({rows}, {cols})"
                ));
                NumericArtifact::RealMatrix(matrix)
            }
            (Some(ArtifactKind::Scalar), None) if values.len() == 1 => {
                NumericArtifact::Scalar(values[0])
            }
            _ => NumericArtifact::RealVector(values),
        },
        TextPayload::Shaped { rows, cols, values } => {
            check_declared(dims, rows, cols)?;
            NumericArtifact::RealMatrix(matrix_from(rows, cols, values)?)
        }
        TextPayload::Table { rows, cols, values } => {
            if wants_complex && cols == 2 {
                let (re, im): (Vec<f64>, Vec<f64>) =
                    values.chunks_exact(2).map(|pair| (pair[0], pair[1])).unzip();
                let vector = ComplexVector::new(re, im)
                    .map_err(|err| CodecError::format(FormatKind::ColumnMismatch, err.to_string()))?;
                NumericArtifact::ComplexVector(vector)
            } else {
                check_declared(dims, rows, cols)?;
                NumericArtifact::RealMatrix(matrix_from(rows, cols, values)?)
            }
        }
    };
    Ok(Decoded { artifact, warnings })
}

/// Joins decoded `_real` and `_imag` siblings into one complex artifact.
pub fn decode_complex_pair(
    real_text: &str,
    imag_text: &str,
    dims: Option<(usize, usize)>,
) -> Result<Decoded, CodecError> {
    let expected = ExpectedShape {
        kind: ArtifactKind::RealVector,
        dims,
    };
    let re = decode(real_text, Some(&expected))?;
    let im = decode(imag_text, Some(&expected))?;
    let mut warnings = re.warnings;
    warnings.extend(im.warnings);

    let pair_error = |detail: String| CodecError::format(FormatKind::ColumnMismatch, detail);
    let artifact = match (re.artifact, im.artifact) {
        (NumericArtifact::RealVector(re), NumericArtifact::RealVector(im)) => {
            NumericArtifact::ComplexVector(
                ComplexVector::new(re, im).map_err(|err| pair_error(err.to_string()))?,
            )
        }
        (NumericArtifact::RealMatrix(re), NumericArtifact::RealMatrix(im)) => {
            NumericArtifact::ComplexMatrix(
                ComplexMatrix::from_parts(re, im).map_err(|err| pair_error(err.to_string()))?,
            )
        }
        (re, im) => {
            return Err(pair_error(format!(
                "real part is {} but imaginary part is {}",
                re.shape(),
                im.shape()
            )));
        }
    };
    Ok(Decoded { artifact, warnings })
}

/// Parses a `{rows}\n{cols}` side-file.
pub fn decode_shape_side_file(text: &str) -> Result<(usize, usize), CodecError> {
    let mut values = Vec::with_capacity(2);
    for (line_no, tokens) in content_lines(text) {
        for token in tokens {
            let value = parse_index(token, line_no)?;
            let dim = usize::try_from(value).map_err(|_| {
                CodecError::format(FormatKind::Parse, format!("line {line_no}: negative dimension"))
            })?;
            values.push(dim);
        }
    }
    match values.as_slice() {
        [rows, cols] => Ok((*rows, *cols)),
        _ => Err(CodecError::format(
            FormatKind::Parse,
            format!("shape side-file holds {} values, expected 2", values.len()),
        )),
    }
}

#[must_use]
pub fn encode_vector(values: &[f64]) -> String {
    let mut out = String::with_capacity(values.len() * 24);
    for value in values {
        out.push_str(&format_value(*value));
        out.push('\n');
    }
    out
}

#[must_use]
pub fn encode_matrix(rows: usize, cols: usize, values: &[f64]) -> String {
    let mut out = format!("{rows} {cols}\n");
    for row in values.chunks(cols.max(1)).take(rows) {
        let line: Vec<String> = row.iter().map(|value| format_value(*value)).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out
}

#[must_use]
pub fn encode_indices(indices: &[i64]) -> String {
    let mut out = String::new();
    for idx in indices {
        out.push_str(&idx.to_string());
        out.push('\n');
    }
    out
}

/// Compatibility layout: one `real imag` pair per row.
#[must_use]
pub fn encode_complex_columns(values: &ComplexVector) -> String {
    let mut out = String::new();
    for (re, im) in values.re().iter().zip(values.im()) {
        out.push_str(&format_value(*re));
        out.push(' ');
        out.push_str(&format_value(*im));
        out.push('\n');
    }
    out
}

#[must_use]
pub fn encode_shape_side_file(rows: usize, cols: usize) -> String {
    format!("{rows}\n{cols}\n")
}

/// Encoded form of an artifact: one file, or canonical `_real`/`_imag` siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedArtifact {
    Single(String),
    ComplexPair { real: String, imag: String },
}

#[must_use]
pub fn encode(artifact: &NumericArtifact) -> EncodedArtifact {
    match artifact {
        NumericArtifact::Scalar(value) => EncodedArtifact::Single(encode_vector(&[*value])),
        NumericArtifact::RealVector(values) => EncodedArtifact::Single(encode_vector(values)),
        NumericArtifact::RealMatrix(matrix) => {
            EncodedArtifact::Single(encode_matrix(matrix.rows(), matrix.cols(), matrix.values()))
        }
        NumericArtifact::IndexSet(indices) => EncodedArtifact::Single(encode_indices(indices)),
        NumericArtifact::ComplexVector(values) => EncodedArtifact::ComplexPair {
            real: encode_vector(values.re()),
            imag: encode_vector(values.im()),
        },
        NumericArtifact::ComplexMatrix(matrix) => EncodedArtifact::ComplexPair {
            real: encode_matrix(matrix.rows(), matrix.cols(), matrix.re()),
            imag: encode_matrix(matrix.rows(), matrix.cols(), matrix.im()),
        },
    }
}

/// Sorted `key=value` lines.
#[must_use]
pub fn encode_params(params: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in params {
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out
}

pub fn decode_params(text: &str) -> Result<BTreeMap<String, String>, CodecError> {
    let mut params = BTreeMap::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            return Err(CodecError::format(
                FormatKind::Parse,
                format!("line {}: params lines must be key=value", idx + 1),
            ));
        };
        params.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::{
        CodecError, Decoded, EncodedArtifact, ExpectedShape, FormatKind, TextPayload, decode,
        decode_complex_pair, decode_indices, decode_params, decode_shape_side_file, encode,
        encode_complex_columns, encode_params, format_value, parse_payload,
    };
    use sgp_artifact::{ArtifactKind, ComplexMatrix, ComplexVector, NumericArtifact, RealMatrix};
    use std::collections::BTreeMap;

    fn single(encoded: EncodedArtifact) -> String {
        match encoded {
            EncodedArtifact::Single(text) => text,
            EncodedArtifact::ComplexPair { .. } => panic!("expected a single file"),
        }
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            let scale = e.abs().max(f64::MIN_POSITIVE);
            assert!((a - e).abs() / scale < 1e-15, "{a} vs {e}");
        }
    }

    #[test]
    fn values_use_seventeen_significant_digits() {
        assert_eq!(format_value(1.0), "1.0000000000000000e+00");
        assert_eq!(format_value(-0.015625), "-1.5625000000000000e-02");
        assert_eq!(format_value(6.02e123), "6.0200000000000000e+123");
        assert_eq!(format_value(f64::NAN), "nan");
        assert_eq!(format_value(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn finite_values_round_trip_exactly() {
        for value in [0.1, 1.0 / 3.0, -2.718_281_828_459_045, 1e-300, 5e-324, f64::MAX] {
            let parsed: f64 = format_value(value).parse().expect("formatted value parses");
            assert_eq!(parsed.to_bits(), value.to_bits(), "{value}");
        }
    }

    #[test]
    fn vector_round_trip() {
        let values = vec![0.5, -1.25e-7, 3.0e12, 0.0];
        let artifact = NumericArtifact::RealVector(values.clone());
        let text = single(encode(&artifact));
        let decoded = decode(&text, None).expect("vector decodes");
        assert_eq!(decoded.artifact, artifact);
        assert!(decoded.warnings.is_empty());
    }

    #[test]
    fn scalar_round_trip_when_expected() {
        let text = single(encode(&NumericArtifact::Scalar(2.5)));
        let decoded = decode(&text, Some(&ExpectedShape::of(ArtifactKind::Scalar)))
            .expect("scalar decodes");
        assert_eq!(decoded.artifact, NumericArtifact::Scalar(2.5));
    }

    #[test]
    fn matrix_round_trip_keeps_shape() {
        let matrix = RealMatrix::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.5]).expect("2x3");
        let text = single(encode(&NumericArtifact::RealMatrix(matrix.clone())));
        assert!(text.starts_with("2 3\n"));
        let decoded = decode(&text, None).expect("matrix decodes");
        match decoded.artifact {
            NumericArtifact::RealMatrix(back) => {
                assert_eq!((back.rows(), back.cols()), (2, 3));
                assert_close(back.values(), matrix.values());
            }
            other => panic!("unexpected artifact {other:?}"),
        }
    }

    #[test]
    fn complex_siblings_round_trip() {
        let matrix = ComplexMatrix::new(2, 2, vec![1.0, 0.0, -1.0, 0.5], vec![0.0, 2.0, 0.25, -3.0])
            .expect("2x2");
        let EncodedArtifact::ComplexPair { real, imag } =
            encode(&NumericArtifact::ComplexMatrix(matrix.clone()))
        else {
            panic!("complex artifacts encode as siblings");
        };
        let decoded = decode_complex_pair(&real, &imag, None).expect("pair decodes");
        assert_eq!(decoded.artifact, NumericArtifact::ComplexMatrix(matrix));
    }

    #[test]
    fn two_column_file_decodes_as_complex_when_expected() {
        let values = ComplexVector::new(vec![1.0, 2.0], vec![-1.0, 0.5]).expect("paired");
        let text = encode_complex_columns(&values);
        let decoded = decode(&text, Some(&ExpectedShape::of(ArtifactKind::ComplexVector)))
            .expect("two-column decodes");
        assert_eq!(decoded.artifact, NumericArtifact::ComplexVector(values));

        let as_real = decode(&text, None).expect("two-column decodes as table");
        assert_eq!(as_real.artifact.kind(), ArtifactKind::RealMatrix);
    }

    #[test]
    fn flat_body_under_header_reshapes_with_warning() {
        let text = "2 2\n1.0\n2.0\n3.0\n4.0\n";
        let Decoded { artifact, warnings } = decode(text, None).expect("fallback applies");
        let NumericArtifact::RealMatrix(matrix) = artifact else {
            panic!("expected matrix");
        };
        assert_eq!(matrix.get(1, 0), Some(3.0));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("reshaped"));
    }

    #[test]
    fn header_disagreeing_with_body_is_format_error() {
        let err = decode("3 3\n1 2 3\n4 5 6\n", None).expect_err("rows missing");
        assert!(matches!(
            err,
            CodecError::Format {
                kind: FormatKind::HeaderMismatch,
                ..
            }
        ));
        assert_eq!(err.reason_code(), "codec_header_mismatch");
    }

    #[test]
    fn ragged_table_is_column_mismatch() {
        let err = parse_payload("1.0 2.0\n3.0\n").expect_err("ragged");
        assert_eq!(err.reason_code(), "codec_column_mismatch");
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let (payload, _) = parse_payload("# savetxt header\n\n1.5\n\n2.5\n").expect("parses");
        assert_eq!(payload, TextPayload::Flat(vec![1.5, 2.5]));
    }

    #[test]
    fn garbage_token_is_parse_error() {
        let err = decode("1.0\nabc\n", None).expect_err("bad token");
        assert_eq!(err.reason_code(), "codec_parse");
    }

    #[test]
    fn empty_index_file_is_empty_set() {
        assert!(decode_indices("").expect("empty is fine").is_empty());
        let decoded = decode("\n", Some(&ExpectedShape::of(ArtifactKind::IndexSet)))
            .expect("blank index file");
        assert_eq!(decoded.artifact, NumericArtifact::IndexSet(Vec::new()));
    }

    #[test]
    fn integral_float_indices_are_accepted() {
        assert_eq!(
            decode_indices("3.0000000000000000e+00\n17\n").expect("integral"),
            vec![3, 17]
        );
        assert!(decode_indices("2.5\n").is_err());
    }

    #[test]
    fn declared_dims_reshape_flat_payload() {
        let expected = ExpectedShape::of(ArtifactKind::RealMatrix).with_dims(2, 3);
        let decoded = decode("1\n2\n3\n4\n5\n6\n", Some(&expected)).expect("reshapes");
        assert_eq!(decoded.artifact.shape().dims(), vec![2, 3]);
        assert_eq!(decoded.warnings.len(), 1);
        assert!(decoded.warnings[0].contains("reshaped to declared (2, 3)"));
        assert!(decode("1\n2\n3\n", Some(&expected)).is_err());
    }

    #[test]
    fn headered_matrix_must_match_declared_dims() {
        let expected = ExpectedShape::of(ArtifactKind::RealMatrix).with_dims(3, 2);
        let err = decode("2 3\n1 2 3\n4 5 6\n", Some(&expected)).expect_err("dims disagree");
        assert_eq!(err.reason_code(), "codec_header_mismatch");

        let agreeing = ExpectedShape::of(ArtifactKind::RealMatrix).with_dims(2, 3);
        let decoded = decode("2 3\n1 2 3\n4 5 6\n", Some(&agreeing)).expect("dims agree");
        assert!(decoded.warnings.is_empty());
    }

    #[test]
    fn index_set_round_trip() {
        let artifact = NumericArtifact::IndexSet(vec![3, 17, 17, 256]);
        let text = single(encode(&artifact));
        assert_eq!(text, "3\n17\n17\n256\n");
        let decoded = decode(&text, Some(&ExpectedShape::of(ArtifactKind::IndexSet)))
            .expect("indices decode");
        assert_eq!(decoded.artifact, artifact);
    }

    #[test]
    fn integral_first_row_of_complex_columns_is_data() {
        let decoded = decode(
            "4 0\n1.5 -2.0\n0 1\n",
            Some(&ExpectedShape::of(ArtifactKind::ComplexVector)),
        )
        .expect("two-column complex file");
        let expected = ComplexVector::new(vec![4.0, 1.5, 0.0], vec![0.0, -2.0, 1.0]).expect("paired");
        assert_eq!(decoded.artifact, NumericArtifact::ComplexVector(expected));
    }

    #[test]
    fn shape_side_file_parses() {
        assert_eq!(decode_shape_side_file("129\n17\n").expect("two ints"), (129, 17));
        assert!(decode_shape_side_file("129\n").is_err());
    }

    #[test]
    fn params_are_sorted_and_reparsed() {
        let mut params = BTreeMap::new();
        params.insert("mode".to_string(), "full".to_string());
        params.insert("cutoff".to_string(), "20".to_string());
        let text = encode_params(&params);
        assert_eq!(text, "cutoff=20\nmode=full\n");
        assert_eq!(decode_params(&text).expect("reparses"), params);
    }
}
