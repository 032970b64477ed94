//! Prediction output formatting
//!
//! Shapes the classifier's label and class distribution into the response
//! contract returned to callers.

use crate::models::{ClassProbabilities, PredictionResult};

/// Message returned when the customer is predicted to buy
pub const TAKE_PACKAGE_MESSAGE: &str = "Customer will likely TAKE the holiday package!";

/// Message returned when the customer is predicted not to buy
pub const NOT_TAKE_PACKAGE_MESSAGE: &str = "Customer will likely NOT take the holiday package.";

/// Formats classifier output into a PredictionResult
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseFormatter;

impl ResponseFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format(&self, label: u8, probabilities: ClassProbabilities) -> PredictionResult {
        let message = if label == 1 {
            TAKE_PACKAGE_MESSAGE
        } else {
            NOT_TAKE_PACKAGE_MESSAGE
        };

        PredictionResult {
            prediction: label,
            probability: probabilities,
            message: message.to_string(),
            confidence: probabilities.max() * 100.0,
        }
    }
}
