//! Core data models for the prediction pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw request body: feature name to loosely-typed JSON value
pub type RawInput = serde_json::Map<String, serde_json::Value>;

/// A single scalar feature value as supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FeatureValue {
    /// Numeric view of the value, `None` for text
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Int(v) => Some(*v as f64),
            FeatureValue::Float(v) => Some(*v),
            FeatureValue::Text(_) => None,
        }
    }

    /// Category equality: text matches text exactly, numbers match numbers by value
    pub fn matches_category(&self, category: &FeatureValue) -> bool {
        match (self, category) {
            (FeatureValue::Text(a), FeatureValue::Text(b)) => a == b,
            (FeatureValue::Text(_), _) | (_, FeatureValue::Text(_)) => false,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }
}

impl Default for FeatureValue {
    fn default() -> Self {
        FeatureValue::Int(0)
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Int(v) => write!(f, "{}", v),
            FeatureValue::Float(v) => write!(f, "{}", v),
            FeatureValue::Text(v) => write!(f, "'{}'", v),
        }
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Int(v)
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Float(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Text(v.to_string())
    }
}

/// Ordered feature values, one per schema entry
///
/// Only the normalizer builds these, so the length always equals the schema length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    values: Vec<FeatureValue>,
}

impl FeatureVector {
    pub(crate) fn new(values: Vec<FeatureValue>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FeatureValue> {
        self.values.get(index)
    }

    /// Look up a value by feature name using the schema order
    pub fn by_name(&self, name: &str) -> Option<&FeatureValue> {
        crate::predictor::feature_index(name).and_then(|i| self.values.get(i))
    }
}

/// Two-class probability distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub not_take_package: f64,
    pub take_package: f64,
}

impl ClassProbabilities {
    pub fn max(&self) -> f64 {
        self.not_take_package.max(self.take_package)
    }

    /// Class index of the higher-probability entry (ties go to class 0)
    pub fn argmax(&self) -> u8 {
        if self.take_package > self.not_take_package {
            1
        } else {
            0
        }
    }
}

/// Response contract for a successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted class: 1 = will take the package
    pub prediction: u8,
    pub probability: ClassProbabilities,
    pub message: String,
    /// Probability of the predicted class, in percent
    pub confidence: f64,
}

/// Metadata about the loaded artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub classifier_kind: String,
    pub input_width: usize,
    pub preprocessor_sha256: String,
    pub classifier_sha256: String,
    pub loaded_at: i64,
}
