//! Holiday package predictor HTTP service
//!
//! Wraps [`predictor_lib::PredictionService`] in an axum router exposing the
//! prediction, health, readiness, model and metrics endpoints.

pub mod api;
pub mod config;
