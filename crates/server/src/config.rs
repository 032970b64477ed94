//! Server configuration

use anyhow::{Context, Result};
use predictor_lib::ArtifactPaths;
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration, read from `PREDICTOR_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the prediction/health/metrics API
    #[serde(default = "default_port")]
    pub port: u16,

    /// Fitted column transformer (JSON)
    #[serde(default = "default_preprocessor_path")]
    pub preprocessor_path: PathBuf,

    /// Fitted classifier (`.onnx` or `.json`)
    #[serde(default = "default_classifier_path")]
    pub classifier_path: PathBuf,

    /// Expected SHA-256 of the preprocessor file
    #[serde(default)]
    pub preprocessor_sha256: Option<String>,

    /// Expected SHA-256 of the classifier file
    #[serde(default)]
    pub classifier_sha256: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_preprocessor_path() -> PathBuf {
    PathBuf::from("models/preprocessor.json")
}

fn default_classifier_path() -> PathBuf {
    PathBuf::from("models/model.onnx")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            preprocessor_path: default_preprocessor_path(),
            classifier_path: default_classifier_path(),
            preprocessor_sha256: None,
            classifier_sha256: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        Self::from_env(config::Environment::with_prefix("PREDICTOR"))
    }

    fn from_env(env: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(env)
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid PREDICTOR_* configuration")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::new(&self.preprocessor_path, &self.classifier_path).with_checksums(
            self.preprocessor_sha256.clone(),
            self.classifier_sha256.clone(),
        )
    }
}
