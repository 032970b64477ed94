//! Holiday package predictor - HTTP prediction service
//!
//! Loads the fitted artifacts once at startup and serves predictions until
//! interrupted. A failed load leaves the process running in an unavailable
//! state so that health probes still answer.

use anyhow::{Context, Result};
use holiday_predictor::{api, config::ServerConfig};
use predictor_lib::{PredictionService, PredictorMetrics, StructuredLogger};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_NAME: &str = "holiday-predictor";
const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ServerConfig::load()?;
    info!(
        preprocessor = %config.preprocessor_path.display(),
        classifier = %config.classifier_path.display(),
        "Predictor configured"
    );

    let logger = StructuredLogger::new(SERVICE_NAME);
    let metrics = PredictorMetrics::new();

    let service = PredictionService::load(&config.artifact_paths());
    match (service.model_info(), service.unavailable_reason()) {
        (Some(info), _) => logger.log_artifacts_loaded(info),
        (None, Some(reason)) => logger.log_artifacts_unavailable(reason),
        (None, None) => {}
    }

    let app_state = Arc::new(api::AppState::new(service, metrics, logger.clone()));

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    logger.log_startup(SERVICE_VERSION, &addr);

    if let Err(e) = api::serve(listener, app_state, shutdown_signal()).await {
        error!(error = %e, "API server failed");
        return Err(e);
    }

    logger.log_shutdown("SIGINT received");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}
