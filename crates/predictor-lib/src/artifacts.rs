//! Loading of the fitted model artifacts
//!
//! Reads the preprocessing transform and the classifier from disk once at
//! startup, optionally verifying pinned SHA-256 checksums, and checks that the
//! two fit together before handing them to the inference engine.

use crate::error::ArtifactError;
use crate::models::ModelInfo;
use crate::predictor::{
    Classifier, ColumnTransformer, ColumnTransformerSpec, InferenceEngine, LinearModelSpec,
    LogisticClassifier, OnnxClassifier, Preprocessor,
};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where to find the artifacts and which checksums to expect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Column transformer JSON
    pub preprocessor: PathBuf,
    /// `.onnx` graph or `.json` logistic regression
    pub classifier: PathBuf,
    pub preprocessor_sha256: Option<String>,
    pub classifier_sha256: Option<String>,
}

impl ArtifactPaths {
    pub fn new(preprocessor: impl Into<PathBuf>, classifier: impl Into<PathBuf>) -> Self {
        Self {
            preprocessor: preprocessor.into(),
            classifier: classifier.into(),
            preprocessor_sha256: None,
            classifier_sha256: None,
        }
    }

    pub fn with_checksums(
        mut self,
        preprocessor_sha256: Option<String>,
        classifier_sha256: Option<String>,
    ) -> Self {
        self.preprocessor_sha256 = preprocessor_sha256;
        self.classifier_sha256 = classifier_sha256;
        self
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::new("models/preprocessor.json", "models/model.onnx")
    }
}

/// Engine plus metadata describing what was loaded
#[derive(Debug)]
pub struct LoadedArtifacts {
    pub engine: InferenceEngine,
    pub info: ModelInfo,
}

/// Load both artifacts and assemble the inference engine
pub fn load(paths: &ArtifactPaths) -> Result<LoadedArtifacts, ArtifactError> {
    let (bytes, preprocessor_sha256) =
        read_verified(&paths.preprocessor, paths.preprocessor_sha256.as_deref())?;
    let spec: ColumnTransformerSpec =
        serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Parse {
            path: paths.preprocessor.clone(),
            message: e.to_string(),
        })?;
    let preprocessor = ColumnTransformer::from_spec(spec)?;

    let (bytes, classifier_sha256) =
        read_verified(&paths.classifier, paths.classifier_sha256.as_deref())?;
    let classifier = load_classifier(&paths.classifier, &bytes, preprocessor.output_width())?;

    let engine = InferenceEngine::new(Box::new(preprocessor), classifier)?;
    let info = ModelInfo {
        classifier_kind: engine.classifier_kind().to_string(),
        input_width: engine.input_width(),
        preprocessor_sha256,
        classifier_sha256,
        loaded_at: chrono::Utc::now().timestamp(),
    };

    Ok(LoadedArtifacts { engine, info })
}

/// Pick the classifier implementation from the file extension
fn load_classifier(
    path: &Path,
    bytes: &[u8],
    input_width: usize,
) -> Result<Box<dyn Classifier>, ArtifactError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("onnx") => Ok(Box::new(OnnxClassifier::new(bytes, input_width)?)),
        Some("json") => {
            let spec: LinearModelSpec =
                serde_json::from_slice(bytes).map_err(|e| ArtifactError::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            Ok(Box::new(LogisticClassifier::from_spec(spec)?))
        }
        _ => Err(ArtifactError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Hex-encoded SHA-256 digest
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn read_verified(path: &Path, expected: Option<&str>) -> Result<(Vec<u8>, String), ArtifactError> {
    let bytes = fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let actual = sha256_hex(&bytes);

    if let Some(expected) = expected {
        if !expected.trim().eq_ignore_ascii_case(&actual) {
            return Err(ArtifactError::Checksum {
                path: path.to_path_buf(),
                expected: expected.to_string(),
                actual,
            });
        }
    }

    debug!(path = %path.display(), size_bytes = bytes.len(), sha256 = %actual, "Read artifact");
    Ok((bytes, actual))
}
