//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes, errors, model state)
//! - Structured JSON logging with tracing

use crate::error::PredictionError;
use crate::models::{ModelInfo, PredictionResult};
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Histogram, IntCounterVec,
    IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PredictorMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct PredictorMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions: IntCounterVec,
    prediction_errors: IntCounterVec,
    model_loaded: IntGauge,
}

impl PredictorMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "holiday_predictor_prediction_latency_seconds",
                "Time spent handling a prediction request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions: register_int_counter_vec!(
                "holiday_predictor_predictions_total",
                "Total number of predictions served, by predicted class",
                &["prediction"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors: register_int_counter_vec!(
                "holiday_predictor_prediction_errors_total",
                "Total number of failed prediction requests, by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            model_loaded: register_int_gauge!(
                "holiday_predictor_model_loaded",
                "Whether the model artifacts were loaded (1) or not (0)"
            )
            .expect("Failed to register model_loaded"),
        }
    }
}

/// Predictor metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct PredictorMetrics {
    _private: (),
}

impl Default for PredictorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PredictorMetricsInner {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, prediction: u8) {
        self.inner()
            .predictions
            .with_label_values(&[&prediction.to_string()])
            .inc();
    }

    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner()
            .prediction_errors
            .with_label_values(&[kind])
            .inc();
    }

    pub fn set_model_loaded(&self, loaded: bool) {
        self.inner().model_loaded.set(i64::from(loaded));
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for startup, predictions and
/// failures.
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, addr: &str) {
        info!(
            event = "service_started",
            service = %self.service_name,
            version = %version,
            addr = %addr,
            "Holiday package predictor started"
        );
    }

    /// Log successfully loaded artifacts
    pub fn log_artifacts_loaded(&self, model: &ModelInfo) {
        info!(
            event = "artifacts_loaded",
            service = %self.service_name,
            classifier_kind = %model.classifier_kind,
            input_width = model.input_width,
            preprocessor_sha256 = %model.preprocessor_sha256,
            classifier_sha256 = %model.classifier_sha256,
            "Model artifacts loaded"
        );
    }

    /// Log that the service starts without a model
    pub fn log_artifacts_unavailable(&self, reason: &str) {
        error!(
            event = "artifacts_unavailable",
            service = %self.service_name,
            reason = %reason,
            "Model artifacts unavailable, every prediction will fail until restart"
        );
    }

    /// Log a served prediction
    pub fn log_prediction(&self, result: &PredictionResult, latency_secs: f64) {
        info!(
            event = "prediction_served",
            service = %self.service_name,
            prediction = result.prediction,
            take_package = result.probability.take_package,
            confidence = result.confidence,
            latency_ms = latency_secs * 1000.0,
            "Prediction served"
        );
    }

    /// Log a failed prediction
    pub fn log_prediction_error(&self, err: &PredictionError) {
        match err {
            PredictionError::ModelNotLoaded => {
                error!(
                    event = "prediction_failed",
                    service = %self.service_name,
                    kind = err.kind(),
                    error = %err,
                    "Prediction requested while model is not loaded"
                );
            }
            _ => {
                warn!(
                    event = "prediction_failed",
                    service = %self.service_name,
                    kind = err.kind(),
                    error = %err,
                    "Prediction failed"
                );
            }
        }
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Holiday package predictor shutting down"
        );
    }
}
