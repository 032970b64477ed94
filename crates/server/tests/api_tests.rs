//! Integration tests for the predictor API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use holiday_predictor::api::{create_router, AppState};
use predictor_lib::{ArtifactPaths, PredictionService, PredictorMetrics, StructuredLogger};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../predictor-lib/tests/fixtures")
        .join(name)
}

fn app_with(service: PredictionService) -> Router {
    let state = Arc::new(AppState::new(
        service,
        PredictorMetrics::new(),
        StructuredLogger::new("holiday-predictor-test"),
    ));
    create_router(state)
}

fn loaded_app() -> Router {
    let paths = ArtifactPaths::new(fixture("preprocessor.json"), fixture("classifier.json"));
    let service = PredictionService::load(&paths);
    assert!(service.is_ready(), "fixture artifacts should load");
    app_with(service)
}

fn unloaded_app() -> Router {
    let paths = ArtifactPaths::new(fixture("missing.json"), fixture("classifier.json"));
    app_with(PredictionService::load(&paths))
}

fn sample_customer() -> Value {
    json!({
        "Age": 35,
        "Gender": "Male",
        "MaritalStatus": "Married",
        "MonthlyIncome": 25000,
        "Occupation": "Salaried",
        "Designation": "Manager",
        "TypeofContact": "Self Enquiry",
        "CityTier": 1,
        "ProductPitched": "Deluxe",
        "PreferredPropertyStar": 4,
        "NumberOfTrips": 3,
        "Passport": 1,
        "OwnCar": 1,
        "DurationOfPitch": 15,
        "NumberOfFollowups": 3,
        "PitchSatisfactionScore": 4,
        "NumberOfPersonVisiting": 2,
        "NumberOfChildrenVisiting": 1
    })
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn post_predict(app: Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health_reports_loaded_model() {
    let (status, body) = get(loaded_app(), "/health").await;

    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health, json!({"status": "healthy", "model_loaded": true}));
}

#[tokio::test]
async fn test_health_returns_ok_without_model() {
    let (status, body) = get(unloaded_app(), "/health").await;

    // Health answers even when the artifacts failed to load
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["model_loaded"], false);
}

#[tokio::test]
async fn test_predict_sample_customer() {
    let (status, result) = post_predict(loaded_app(), sample_customer().to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["prediction"], 0);
    assert_eq!(
        result["message"],
        "Customer will likely NOT take the holiday package."
    );

    let p0 = result["probability"]["not_take_package"].as_f64().unwrap();
    let p1 = result["probability"]["take_package"].as_f64().unwrap();
    assert!((p0 + p1 - 1.0).abs() < 1e-3);
    assert!(p0 > p1);

    let confidence = result["confidence"].as_f64().unwrap();
    assert!((confidence - p0 * 100.0).abs() < 1e-3);
}

#[tokio::test]
async fn test_predict_ignores_extra_keys() {
    let mut body = sample_customer();
    body["CustomerID"] = json!(200001);
    body["ProdTaken"] = json!(1);

    let (status, with_extra) = post_predict(loaded_app(), body.to_string()).await;
    let (_, plain) = post_predict(loaded_app(), sample_customer().to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(with_extra, plain);
}

#[tokio::test]
async fn test_predict_without_model_returns_500() {
    let (status, body) = post_predict(unloaded_app(), sample_customer().to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "model not loaded"}));
}

#[tokio::test]
async fn test_predict_rejects_unknown_category() {
    let mut body = sample_customer();
    body["Gender"] = json!("Robot");

    let (status, result) = post_predict(loaded_app(), body.to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = result["error"].as_str().unwrap();
    assert!(error.contains("Robot"), "unexpected error: {error}");
}

#[tokio::test]
async fn test_predict_rejects_malformed_bodies() {
    for body in ["not json", "[1, 2, 3]", "42", ""] {
        let (status, result) = post_predict(loaded_app(), body).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "body: {body:?}");
        assert!(result["error"].is_string(), "body: {body:?}");
    }
}

#[tokio::test]
async fn test_readyz_reflects_model_state() {
    let (status, body) = get(loaded_app(), "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    let readiness: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness, json!({"ready": true}));

    let (status, body) = get(unloaded_app(), "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let readiness: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["ready"], false);
    assert!(readiness["reason"]
        .as_str()
        .unwrap()
        .starts_with("Model not loaded"));
}

#[tokio::test]
async fn test_model_endpoint() {
    let (status, body) = get(loaded_app(), "/model").await;
    assert_eq!(status, StatusCode::OK);
    let info: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(info["classifier_kind"], "logistic_regression");
    assert_eq!(info["input_width"], 27);
    assert_eq!(info["classifier_sha256"].as_str().unwrap().len(), 64);

    let (status, body) = get(unloaded_app(), "/model").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error, json!({"error": "model not loaded"}));
}

#[tokio::test]
async fn test_metrics_returns_prometheus_format() {
    let app = loaded_app();
    let _ = post_predict(app.clone(), sample_customer().to_string()).await;

    let (status, body) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("holiday_predictor_predictions_total"));
    assert!(text.contains("holiday_predictor_model_loaded"));
}

fn latency_sample_count() -> u64 {
    prometheus::gather()
        .iter()
        .find(|f| f.get_name() == "holiday_predictor_prediction_latency_seconds")
        .map(|f| f.get_metric()[0].get_histogram().get_sample_count())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_failed_predictions_are_timed() {
    let app = unloaded_app();
    let before = latency_sample_count();

    let (status, _) = post_predict(app, sample_customer().to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    // Other tests share the registry, so only a lower bound holds
    assert!(latency_sample_count() >= before + 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_predictions_agree() {
    let app = loaded_app();

    let requests = (0..8).map(|_| post_predict(app.clone(), sample_customer().to_string()));
    let responses = spawn_all(requests).await;

    let (first_status, first) = &responses[0];
    assert_eq!(*first_status, StatusCode::OK);
    for (status, body) in &responses {
        assert_eq!(status, first_status);
        assert_eq!(body, first);
    }
}

async fn spawn_all<F>(futures: impl Iterator<Item = F>) -> Vec<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    let handles: Vec<_> = futures.map(tokio::spawn).collect();
    let mut outputs = Vec::with_capacity(handles.len());
    for handle in handles {
        outputs.push(handle.await.unwrap());
    }
    outputs
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let (status, _) = get(loaded_app(), "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
