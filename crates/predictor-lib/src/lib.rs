//! Holiday package purchase prediction
//!
//! This crate provides the core functionality for:
//! - Normalizing loosely-typed requests into the model's feature vector
//! - Loading the fitted preprocessing transform and classifier
//! - Running inference and shaping the response
//! - Health payloads and observability

pub mod artifacts;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;

pub use artifacts::{ArtifactPaths, LoadedArtifacts};
pub use error::{ArtifactError, PredictionError};
pub use health::{HealthResponse, ReadinessResponse, ServiceStatus};
pub use models::*;
pub use observability::{PredictorMetrics, StructuredLogger};
pub use predictor::{PredictionService, ServiceState};
