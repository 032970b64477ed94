//! Error types for artifact loading and prediction

use std::path::PathBuf;
use thiserror::Error;

/// Failure while loading the inference artifacts at startup
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("failed to read artifact {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checksum mismatch for {path:?}: expected {expected}, got {actual}")]
    Checksum {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("failed to parse artifact {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("artifact does not match feature schema: {0}")]
    SchemaMismatch(String),

    #[error("invalid model: {0}")]
    Model(String),

    #[error("unsupported classifier format: {0:?}")]
    UnsupportedFormat(PathBuf),
}

/// Per-request prediction failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("model not loaded")]
    ModelNotLoaded,

    #[error("{0}")]
    Validation(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

impl PredictionError {
    /// Stable label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::ModelNotLoaded => "model_not_loaded",
            PredictionError::Validation(_) => "validation",
            PredictionError::Inference(_) => "inference",
        }
    }
}
