//! HTTP API for predictions, health checks and Prometheus metrics

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use predictor_lib::{
    HealthResponse, PredictionError, PredictionService, PredictorMetrics, ReadinessResponse,
    StructuredLogger,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::error;

/// Shared application state
pub struct AppState {
    pub service: PredictionService,
    pub metrics: PredictorMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        service: PredictionService,
        metrics: PredictorMetrics,
        logger: StructuredLogger,
    ) -> Self {
        metrics.set_model_loaded(service.is_ready());
        Self {
            service,
            metrics,
            logger,
        }
    }
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Prediction endpoint - 200 with the result, 500 with `{"error"}` on any failure
async fn predict(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let start = Instant::now();

    // Inference blocks, so it runs on the blocking pool
    let worker = Arc::clone(&state);
    let outcome = tokio::task::spawn_blocking(move || worker.service.handle_json(&body))
        .await
        .unwrap_or_else(|e| Err(PredictionError::Inference(e.to_string())));

    let elapsed = start.elapsed().as_secs_f64();
    state.metrics.observe_prediction_latency(elapsed);

    match outcome {
        Ok(result) => {
            state.metrics.inc_predictions(result.prediction);
            state.logger.log_prediction(&result, elapsed);
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => {
            state.metrics.inc_prediction_errors(e.kind());
            state.logger.log_prediction_error(&e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            )
                .into_response()
        }
    }
}

/// Health check - always 200, reports whether the model is loaded
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse::for_service(&state.service))
}

/// Readiness check response - returns 200 if the model is loaded, 503 otherwise
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = ReadinessResponse::for_service(&state.service);

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Loaded model metadata
async fn model_info(State(state): State<Arc<AppState>>) -> Response {
    match state.service.model_info() {
        Some(info) => (StatusCode::OK, Json(info.clone())).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("model not loaded")),
        )
            .into_response(),
    }
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/model", get(model_info))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve the API until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
