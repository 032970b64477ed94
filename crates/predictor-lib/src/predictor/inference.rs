//! Classifier inference
//!
//! Runs the encoded feature row through the fitted classifier. ONNX graphs are
//! executed with tract-onnx; a plain logistic-regression model can also be
//! loaded from JSON for small deployments and tests.

use super::{Classifier, ClassifierOutput, Preprocessor};
use crate::error::{ArtifactError, PredictionError};
use crate::models::{ClassProbabilities, FeatureVector};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 50;

/// Allowed distance of the probability sum from 1.0 before rescaling
const PROBABILITY_SUM_TOLERANCE: f64 = 1e-3;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX classifier executed with tract
pub struct OnnxClassifier {
    model: TractModel,
    input_width: usize,
}

impl OnnxClassifier {
    /// Parse and optimize an ONNX graph taking a `[1, input_width]` f32 row
    pub fn new(model_bytes: &[u8], input_width: usize) -> Result<Self, ArtifactError> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .map_err(|e| ArtifactError::Model(format!("failed to parse ONNX model: {}", e)))?
            .with_input_fact(0, f32::fact([1, input_width]).into())
            .map_err(|e| ArtifactError::Model(format!("failed to set input shape: {}", e)))?
            .into_optimized()
            .map_err(|e| ArtifactError::Model(format!("failed to optimize model: {}", e)))?
            .into_runnable()
            .map_err(|e| ArtifactError::Model(format!("failed to create runnable model: {}", e)))?;
        Ok(Self { model, input_width })
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, input: &[f32]) -> Result<ClassifierOutput, PredictionError> {
        let tensor: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, self.input_width), input.to_vec())
                .map_err(inference_error)?
                .into();
        let outputs = self
            .model
            .run(tvec!(tensor.into()))
            .map_err(inference_error)?;
        read_outputs(&outputs)
    }

    fn input_width(&self) -> usize {
        self.input_width
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}

/// Pick the label and probability tensors out of a classifier's outputs.
///
/// The first i64 output is the label and the first f32 output the class
/// distribution. Without a label output the label is the arg-max.
fn read_outputs(outputs: &[TValue]) -> Result<ClassifierOutput, PredictionError> {
    let mut label = None;
    let mut probabilities = None;

    for output in outputs {
        match output.datum_type() {
            DatumType::I64 if label.is_none() => {
                let view = output.to_array_view::<i64>().map_err(inference_error)?;
                label = view.iter().next().copied();
            }
            DatumType::F32 if probabilities.is_none() => {
                let view = output.to_array_view::<f32>().map_err(inference_error)?;
                let values: Vec<f64> = view.iter().map(|v| *v as f64).collect();
                if values.len() != 2 {
                    return Err(PredictionError::Inference(format!(
                        "model returned {} probabilities, expected 2",
                        values.len()
                    )));
                }
                probabilities = Some(normalize_probabilities(values[0], values[1])?);
            }
            _ => {}
        }
    }

    let probabilities = probabilities.ok_or_else(|| {
        PredictionError::Inference("model produced no probability output".to_string())
    })?;
    let label = match label {
        Some(l @ 0..=1) => l as u8,
        Some(other) => {
            return Err(PredictionError::Inference(format!(
                "model returned label {}, expected 0 or 1",
                other
            )))
        }
        None => probabilities.argmax(),
    };

    Ok(ClassifierOutput {
        label,
        probabilities,
    })
}

/// Serialized linear model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinearModelSpec {
    LogisticRegression { coefficients: Vec<f64>, intercept: f64 },
}

/// Binary logistic regression: `p1 = sigmoid(w·x + b)`
#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LogisticClassifier {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self, ArtifactError> {
        if coefficients.is_empty() {
            return Err(ArtifactError::Model(
                "logistic regression has no coefficients".to_string(),
            ));
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ArtifactError::Model(
                "logistic regression has non-finite parameters".to_string(),
            ));
        }
        Ok(Self {
            coefficients,
            intercept,
        })
    }

    pub fn from_spec(spec: LinearModelSpec) -> Result<Self, ArtifactError> {
        match spec {
            LinearModelSpec::LogisticRegression {
                coefficients,
                intercept,
            } => Self::new(coefficients, intercept),
        }
    }

    fn decision_function(&self, input: &[f32]) -> f64 {
        self.coefficients
            .iter()
            .zip(input)
            .map(|(w, x)| w * *x as f64)
            .sum::<f64>()
            + self.intercept
    }
}

impl Classifier for LogisticClassifier {
    fn classify(&self, input: &[f32]) -> Result<ClassifierOutput, PredictionError> {
        if input.len() != self.coefficients.len() {
            return Err(PredictionError::Inference(format!(
                "X has {} features, but the model is expecting {}",
                input.len(),
                self.coefficients.len()
            )));
        }

        let z = self.decision_function(input);
        if !z.is_finite() {
            return Err(PredictionError::Inference(
                "decision function is not finite".to_string(),
            ));
        }
        let p1 = 1.0 / (1.0 + (-z).exp());

        Ok(ClassifierOutput {
            label: u8::from(z > 0.0),
            probabilities: ClassProbabilities {
                not_take_package: 1.0 - p1,
                take_package: p1,
            },
        })
    }

    fn input_width(&self) -> usize {
        self.coefficients.len()
    }

    fn kind(&self) -> &'static str {
        "logistic_regression"
    }
}

/// Preprocessing transform and classifier, fixed for the life of the process
pub struct InferenceEngine {
    preprocessor: Box<dyn Preprocessor>,
    classifier: Box<dyn Classifier>,
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("classifier", &self.classifier.kind())
            .field("input_width", &self.classifier.input_width())
            .finish()
    }
}

impl InferenceEngine {
    /// Pair a transform with a classifier, checking their widths agree
    pub fn new(
        preprocessor: Box<dyn Preprocessor>,
        classifier: Box<dyn Classifier>,
    ) -> Result<Self, ArtifactError> {
        if preprocessor.output_width() != classifier.input_width() {
            return Err(ArtifactError::Model(format!(
                "preprocessor produces {} columns but classifier expects {}",
                preprocessor.output_width(),
                classifier.input_width()
            )));
        }
        Ok(Self {
            preprocessor,
            classifier,
        })
    }

    /// Encode the features and classify them
    pub fn predict(
        &self,
        features: &FeatureVector,
    ) -> Result<(u8, ClassProbabilities), PredictionError> {
        let start = Instant::now();

        let row = self.preprocessor.transform(features)?;
        let output = self.classifier.classify(&row)?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                "Inference exceeded {}ms target", MAX_INFERENCE_MS
            );
        } else {
            debug!(elapsed_us = elapsed.as_micros() as u64, "Inference completed");
        }

        Ok((output.label, output.probabilities))
    }

    pub fn classifier_kind(&self) -> &'static str {
        self.classifier.kind()
    }

    pub fn input_width(&self) -> usize {
        self.classifier.input_width()
    }
}

/// Validate a raw two-class distribution and rescale it to sum to exactly 1
pub(crate) fn normalize_probabilities(
    p0: f64,
    p1: f64,
) -> Result<ClassProbabilities, PredictionError> {
    if !p0.is_finite() || !p1.is_finite() || p0 < 0.0 || p1 < 0.0 {
        return Err(PredictionError::Inference(format!(
            "model returned invalid probabilities [{}, {}]",
            p0, p1
        )));
    }
    let sum = p0 + p1;
    if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        return Err(PredictionError::Inference(format!(
            "model probabilities sum to {}, expected 1",
            sum
        )));
    }
    Ok(ClassProbabilities {
        not_take_package: p0 / sum,
        take_package: p1 / sum,
    })
}

fn inference_error(e: impl std::fmt::Display) -> PredictionError {
    PredictionError::Inference(e.to_string())
}
