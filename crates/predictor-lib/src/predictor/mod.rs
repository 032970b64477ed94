//! Prediction pipeline

mod features;
mod inference;
mod output;
mod preprocess;
mod service;


pub use features::{
    feature_index, feature_names, FeatureKind, FeatureSource, FeatureSpec, RequestNormalizer,
    CHILDREN_VISITING, FEATURE_COUNT, FEATURE_SCHEMA, PERSON_VISITING, TOTAL_VISITING,
};
pub use inference::{InferenceEngine, LinearModelSpec, LogisticClassifier, OnnxClassifier};
pub use output::{ResponseFormatter, NOT_TAKE_PACKAGE_MESSAGE, TAKE_PACKAGE_MESSAGE};
pub use preprocess::{
    ColumnTransformer, ColumnTransformerSpec, DropPolicy, TransformerSpec, UnknownPolicy,
};
pub use service::{PredictionService, ServiceState};

use crate::error::PredictionError;
use crate::models::{ClassProbabilities, FeatureVector};

/// Fitted transform from the feature vector to the classifier's numeric row
pub trait Preprocessor: Send + Sync {
    fn transform(&self, features: &FeatureVector) -> Result<Vec<f32>, PredictionError>;

    /// Number of columns produced by `transform`
    fn output_width(&self) -> usize;
}

/// Label and class distribution from a classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierOutput {
    pub label: u8,
    pub probabilities: ClassProbabilities,
}

/// Fitted binary classifier
pub trait Classifier: Send + Sync {
    fn classify(&self, input: &[f32]) -> Result<ClassifierOutput, PredictionError>;

    /// Number of input columns the classifier expects
    fn input_width(&self) -> usize;

    /// Short name of the model family, for logs and model info
    fn kind(&self) -> &'static str;
}
