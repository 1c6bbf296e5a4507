use crate::{
    CodecError, Decoded, EncodedArtifact, ExpectedShape, decode, decode_complex_pair,
    decode_params, decode_shape_side_file, encode, encode_params,
};
use sgp_artifact::NumericArtifact;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// `input`, `output`, or `output_{name}` for a named artifact.
#[must_use]
pub fn role_name(base: &str, name: Option<&str>) -> String {
    match name {
        Some(name) if !name.is_empty() => format!("{base}_{name}"),
        _ => base.to_string(),
    }
}

/// Directory-backed artifact store: `root/{family}/{case}_{role}.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn family_dir(&self, family: &str) -> PathBuf {
        self.root.join(family)
    }

    #[must_use]
    pub fn path_for(&self, family: &str, case: &str, role: &str) -> PathBuf {
        self.family_dir(family).join(format!("{case}_{role}.txt"))
    }

    #[must_use]
    pub fn sibling_paths(&self, family: &str, case: &str, role: &str) -> (PathBuf, PathBuf) {
        (
            self.path_for(family, case, &format!("{role}_real")),
            self.path_for(family, case, &format!("{role}_imag")),
        )
    }

    #[must_use]
    pub fn shape_path(&self, family: &str, case: &str, role: &str) -> PathBuf {
        self.path_for(family, case, &format!("{role}_shape"))
    }

    /// Any file form of the artifact is present.
    #[must_use]
    pub fn exists(&self, family: &str, case: &str, role: &str) -> bool {
        let (re, im) = self.sibling_paths(family, case, role);
        self.path_for(family, case, role).is_file() || (re.is_file() && im.is_file())
    }

    /// The files currently holding the artifact: the plain file, else both
    /// complex siblings. Empty when neither form is complete.
    #[must_use]
    pub fn existing_files(&self, family: &str, case: &str, role: &str) -> Vec<PathBuf> {
        let plain = self.path_for(family, case, role);
        if plain.is_file() {
            return vec![plain];
        }
        let (re, im) = self.sibling_paths(family, case, role);
        if re.is_file() && im.is_file() {
            vec![re, im]
        } else {
            Vec::new()
        }
    }

    /// Writes the artifact, replacing whatever form was there before.
    /// Returns the files written.
    pub fn write(
        &self,
        family: &str,
        case: &str,
        role: &str,
        artifact: &NumericArtifact,
    ) -> Result<Vec<PathBuf>, CodecError> {
        self.remove(family, case, role)?;
        match encode(artifact) {
            EncodedArtifact::Single(text) => {
                let path = self.path_for(family, case, role);
                write_text(&path, &text)?;
                Ok(vec![path])
            }
            EncodedArtifact::ComplexPair { real, imag } => {
                let (re_path, im_path) = self.sibling_paths(family, case, role);
                write_text(&re_path, &real)?;
                write_text(&im_path, &imag)?;
                Ok(vec![re_path, im_path])
            }
        }
    }

    /// Writes raw text under the plain role path (captured stdout and similar).
    pub fn write_raw(
        &self,
        family: &str,
        case: &str,
        role: &str,
        text: &str,
    ) -> Result<PathBuf, CodecError> {
        let path = self.path_for(family, case, role);
        write_text(&path, text)?;
        Ok(path)
    }

    pub fn read(
        &self,
        family: &str,
        case: &str,
        role: &str,
        expected: &ExpectedShape,
    ) -> Result<Decoded, CodecError> {
        let (re_path, im_path) = self.sibling_paths(family, case, role);
        let shape_path = self.shape_path(family, case, role);
        let side_dims = if shape_path.is_file() {
            Some(decode_shape_side_file(&read_text(&shape_path)?)?)
        } else {
            None
        };
        let dims = expected.dims.or(side_dims);

        if re_path.is_file() || im_path.is_file() {
            let real = read_text(&re_path)?;
            let imag = read_text(&im_path)?;
            return decode_complex_pair(&real, &imag, dims);
        }

        let path = self.path_for(family, case, role);
        let text = read_text(&path)?;
        let expected = ExpectedShape {
            kind: expected.kind,
            dims,
        };
        decode(&text, Some(&expected))
    }

    /// Removes every file form of the artifact; absent files are fine.
    pub fn remove(&self, family: &str, case: &str, role: &str) -> Result<(), CodecError> {
        let (re_path, im_path) = self.sibling_paths(family, case, role);
        for path in [
            self.path_for(family, case, role),
            re_path,
            im_path,
            self.shape_path(family, case, role),
        ] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(CodecError::Io {
                        path,
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn write_params(
        &self,
        family: &str,
        case: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<PathBuf, CodecError> {
        self.write_raw(family, case, "params", &encode_params(params))
    }

    pub fn read_params(
        &self,
        family: &str,
        case: &str,
    ) -> Result<BTreeMap<String, String>, CodecError> {
        decode_params(&read_text(&self.path_for(family, case, "params"))?)
    }
}

fn write_text(path: &Path, text: &str) -> Result<(), CodecError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| CodecError::Io {
            path: parent.to_path_buf(),
            message: err.to_string(),
        })?;
    }
    fs::write(path, text).map_err(|err| CodecError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

fn read_text(path: &Path) -> Result<String, CodecError> {
    fs::read_to_string(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            CodecError::MissingArtifact {
                path: path.to_path_buf(),
            }
        } else {
            CodecError::Io {
                path: path.to_path_buf(),
                message: err.to_string(),
            }
        }
    })
}
