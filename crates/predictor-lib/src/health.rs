//! Health and readiness payloads
//!
//! The health check always answers and reports whether the model artifacts
//! were loaded. Readiness fails while the service is unavailable so that
//! load balancers stop routing prediction traffic to it.

use crate::predictor::PredictionService;
use serde::{Deserialize, Serialize};

/// Process status reported by the health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// The process is up and answering requests
    Healthy,
}

/// Health check response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ServiceStatus,
    pub model_loaded: bool,
}

impl HealthResponse {
    pub fn for_service(service: &PredictionService) -> Self {
        Self {
            status: ServiceStatus::Healthy,
            model_loaded: service.is_ready(),
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ReadinessResponse {
    pub fn for_service(service: &PredictionService) -> Self {
        match service.unavailable_reason() {
            None => Self {
                ready: true,
                reason: None,
            },
            Some(reason) => Self {
                ready: false,
                reason: Some(format!("Model not loaded: {}", reason)),
            },
        }
    }
}
