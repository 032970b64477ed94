//! API client for communicating with the predictor service

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid API URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Failed to reach the predictor API: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// API client for the predictor service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let mut base_url = Url::parse(base_url)?;
        // Keep any path prefix when joining endpoint paths
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        let response = self.client.get(url).send().await?;
        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        let response = self.client.post(url).json(body).send().await?;
        Self::decode(response).await
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.get("health").await
    }

    pub async fn model(&self) -> Result<ModelInfo, ClientError> {
        self.get("model").await
    }

    pub async fn predict(
        &self,
        body: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<PredictionResponse, ClientError> {
        self.post("predict", body).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub classifier_kind: String,
    pub input_width: usize,
    pub preprocessor_sha256: String,
    pub classifier_sha256: String,
    pub loaded_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Probabilities {
    pub not_take_package: f64,
    pub take_package: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: u8,
    pub probability: Probabilities,
    pub message: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_health_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"healthy","model_loaded":true}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();

        assert_eq!(health.status, "healthy");
        assert!(health.model_loaded);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_predict_posts_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict")
            .match_body(Matcher::PartialJson(json!({"Age": 35, "Gender": "Male"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "prediction": 0,
                    "probability": {"not_take_package": 0.94, "take_package": 0.06},
                    "message": "Customer will likely NOT take the holiday package.",
                    "confidence": 94.0
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let body = json!({"Age": 35, "Gender": "Male"})
            .as_object()
            .cloned()
            .unwrap();
        let result = client.predict(&body).await.unwrap();

        assert_eq!(result.prediction, 0);
        assert!((result.confidence - 94.0).abs() < f64::EPSILON);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_body_becomes_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"model not loaded"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.predict(&serde_json::Map::new()).await.unwrap_err();

        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "model not loaded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body_is_kept_verbatim() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/model")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.model().await.unwrap_err();

        assert_eq!(err.to_string(), "API error (502): bad gateway");
    }

    #[tokio::test]
    async fn test_base_path_prefix_is_preserved() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/predictor/health")
            .with_status(200)
            .with_body(r#"{"status":"healthy","model_loaded":false}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/predictor", server.url())).unwrap();
        let health = client.health().await.unwrap();

        assert!(!health.model_loaded);
        mock.assert_async().await;
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ClientError::Url(_))
        ));
    }
}
