//! Prediction service
//!
//! Composes normalization, inference and formatting behind one entry point.
//! The service is built once at startup in either the `Ready` or the
//! `Unavailable` state and never changes state afterwards.

use super::{InferenceEngine, RequestNormalizer, ResponseFormatter};
use crate::artifacts::{self, ArtifactPaths, LoadedArtifacts};
use crate::error::{ArtifactError, PredictionError};
use crate::models::{ModelInfo, PredictionResult, RawInput};
use std::panic::{self, AssertUnwindSafe};

/// Lifecycle state, fixed at construction
#[derive(Debug)]
pub enum ServiceState {
    Ready {
        engine: InferenceEngine,
        info: ModelInfo,
    },
    /// Artifacts failed to load; a restart is required to retry
    Unavailable { reason: String },
}

#[derive(Debug)]
pub struct PredictionService {
    state: ServiceState,
    normalizer: RequestNormalizer,
    formatter: ResponseFormatter,
}

impl PredictionService {
    pub fn ready(engine: InferenceEngine, info: ModelInfo) -> Self {
        Self::with_state(ServiceState::Ready { engine, info })
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::with_state(ServiceState::Unavailable {
            reason: reason.into(),
        })
    }

    fn with_state(state: ServiceState) -> Self {
        Self {
            state,
            normalizer: RequestNormalizer::new(),
            formatter: ResponseFormatter::new(),
        }
    }

    /// Build the service from the outcome of artifact loading.
    ///
    /// Logging the outcome is left to the caller's `StructuredLogger`.
    pub fn from_load_result(result: Result<LoadedArtifacts, ArtifactError>) -> Self {
        match result {
            Ok(LoadedArtifacts { engine, info }) => Self::ready(engine, info),
            Err(e) => Self::unavailable(e.to_string()),
        }
    }

    /// Load the artifacts and build the service; never fails
    pub fn load(paths: &ArtifactPaths) -> Self {
        Self::from_load_result(artifacts::load(paths))
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ServiceState::Ready { .. })
    }

    pub fn model_info(&self) -> Option<&ModelInfo> {
        match &self.state {
            ServiceState::Ready { info, .. } => Some(info),
            ServiceState::Unavailable { .. } => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            ServiceState::Ready { .. } => None,
            ServiceState::Unavailable { reason } => Some(reason),
        }
    }

    /// Run one prediction request through the pipeline
    pub fn handle(&self, raw: &RawInput) -> Result<PredictionResult, PredictionError> {
        let engine = match &self.state {
            ServiceState::Ready { engine, .. } => engine,
            ServiceState::Unavailable { .. } => return Err(PredictionError::ModelNotLoaded),
        };

        let features = self.normalizer.normalize(raw)?;

        // Classifier panics surface as inference errors
        let (label, probabilities) =
            panic::catch_unwind(AssertUnwindSafe(|| engine.predict(&features))).map_err(
                |payload| PredictionError::Inference(panic_message(payload.as_ref())),
            )??;

        Ok(self.formatter.format(label, probabilities))
    }

    /// Parse a request body and run it through the pipeline.
    ///
    /// Bodies that are not a JSON object are rejected with a validation error.
    pub fn handle_json(&self, body: &[u8]) -> Result<PredictionResult, PredictionError> {
        if !self.is_ready() {
            return Err(PredictionError::ModelNotLoaded);
        }

        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| PredictionError::Validation(format!("invalid JSON body: {}", e)))?;
        match value {
            serde_json::Value::Object(raw) => self.handle(&raw),
            _ => Err(PredictionError::Validation(
                "request body must be a JSON object".to_string(),
            )),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "model panicked during inference".to_string()
    }
}
