//! Fitted column transformer
//!
//! Encodes a schema-ordered feature vector into the dense numeric row the
//! classifier was trained on. The fitted parameters (category lists, scaler
//! statistics) are produced offline and loaded from JSON.

use super::features::{feature_index, feature_names, FeatureKind, FEATURE_COUNT, FEATURE_SCHEMA};
use super::Preprocessor;
use crate::error::{ArtifactError, PredictionError};
use crate::models::{FeatureValue, FeatureVector};
use serde::{Deserialize, Serialize};

/// Serialized form of a fitted column transformer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnTransformerSpec {
    /// Column order the transformer was fitted with
    pub feature_names_in: Vec<String>,
    /// Applied in order; outputs are concatenated
    pub transformers: Vec<TransformerSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformerSpec {
    OneHot {
        columns: Vec<String>,
        categories: Vec<Vec<FeatureValue>>,
        #[serde(default)]
        drop: DropPolicy,
        #[serde(default)]
        handle_unknown: UnknownPolicy,
    },
    StandardScaler {
        columns: Vec<String>,
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    Passthrough {
        columns: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPolicy {
    #[default]
    None,
    First,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownPolicy {
    #[default]
    Error,
    Ignore,
}

/// One output-producing step bound to a schema column
#[derive(Debug, Clone)]
enum Step {
    OneHot {
        column: usize,
        categories: Vec<FeatureValue>,
        dropped: usize,
        handle_unknown: UnknownPolicy,
    },
    Scale {
        column: usize,
        mean: f64,
        scale: f64,
    },
    Passthrough {
        column: usize,
    },
}

impl Step {
    fn width(&self) -> usize {
        match self {
            Step::OneHot {
                categories,
                dropped,
                ..
            } => categories.len() - dropped,
            Step::Scale { .. } | Step::Passthrough { .. } => 1,
        }
    }
}

/// Column transformer with columns resolved against the feature schema
#[derive(Debug, Clone)]
pub struct ColumnTransformer {
    steps: Vec<Step>,
    width: usize,
}

impl ColumnTransformer {
    /// Validate a fitted spec against the feature schema
    pub fn from_spec(spec: ColumnTransformerSpec) -> Result<Self, ArtifactError> {
        check_feature_order(&spec.feature_names_in)?;

        let mut steps = Vec::new();
        for transformer in spec.transformers {
            match transformer {
                TransformerSpec::OneHot {
                    columns,
                    categories,
                    drop,
                    handle_unknown,
                } => {
                    check_len("one_hot categories", &columns, categories.len())?;
                    for (name, categories) in columns.iter().zip(categories) {
                        if categories.is_empty() {
                            return Err(ArtifactError::Model(format!(
                                "one_hot column '{}' has no categories",
                                name
                            )));
                        }
                        steps.push(Step::OneHot {
                            column: resolve(name)?,
                            categories,
                            dropped: usize::from(drop == DropPolicy::First),
                            handle_unknown,
                        });
                    }
                }
                TransformerSpec::StandardScaler {
                    columns,
                    mean,
                    scale,
                } => {
                    check_len("standard_scaler mean", &columns, mean.len())?;
                    check_len("standard_scaler scale", &columns, scale.len())?;
                    for ((name, mean), scale) in columns.iter().zip(mean).zip(scale) {
                        if !mean.is_finite() || !scale.is_finite() {
                            return Err(ArtifactError::Model(format!(
                                "standard_scaler column '{}' has non-finite statistics",
                                name
                            )));
                        }
                        steps.push(Step::Scale {
                            column: resolve_numeric("standard_scaler", name)?,
                            mean,
                            // Constant columns are fitted with scale 0; leave them unscaled
                            scale: if scale == 0.0 { 1.0 } else { scale },
                        });
                    }
                }
                TransformerSpec::Passthrough { columns } => {
                    for name in &columns {
                        steps.push(Step::Passthrough {
                            column: resolve_numeric("passthrough", name)?,
                        });
                    }
                }
            }
        }

        let width = steps.iter().map(Step::width).sum();
        if width == 0 {
            return Err(ArtifactError::Model(
                "column transformer produces no output columns".to_string(),
            ));
        }

        Ok(Self { steps, width })
    }
}

impl Preprocessor for ColumnTransformer {
    fn transform(&self, features: &FeatureVector) -> Result<Vec<f32>, PredictionError> {
        if features.len() != FEATURE_COUNT {
            return Err(PredictionError::Inference(format!(
                "expected {} features, got {}",
                FEATURE_COUNT,
                features.len()
            )));
        }

        let mut row = Vec::with_capacity(self.width);
        for step in &self.steps {
            match step {
                Step::OneHot {
                    column,
                    categories,
                    dropped,
                    handle_unknown,
                } => {
                    let value = value_at(features, *column)?;
                    let hit = categories.iter().position(|c| value.matches_category(c));
                    if hit.is_none() && *handle_unknown == UnknownPolicy::Error {
                        return Err(PredictionError::Validation(format!(
                            "Found unknown categories [{}] in column '{}' during transform",
                            value,
                            column_name(*column)
                        )));
                    }
                    row.extend(
                        (*dropped..categories.len())
                            .map(|i| if hit == Some(i) { 1.0 } else { 0.0 }),
                    );
                }
                Step::Scale {
                    column,
                    mean,
                    scale,
                } => {
                    let x = numeric_at(features, *column)?;
                    row.push(((x - mean) / scale) as f32);
                }
                Step::Passthrough { column } => {
                    row.push(numeric_at(features, *column)? as f32);
                }
            }
        }

        Ok(row)
    }

    fn output_width(&self) -> usize {
        self.width
    }
}

fn check_feature_order(names: &[String]) -> Result<(), ArtifactError> {
    if names.len() != FEATURE_COUNT {
        return Err(ArtifactError::SchemaMismatch(format!(
            "transformer was fitted on {} features, schema has {}",
            names.len(),
            FEATURE_COUNT
        )));
    }
    for (position, (fitted, expected)) in names.iter().zip(feature_names()).enumerate() {
        if fitted != expected {
            return Err(ArtifactError::SchemaMismatch(format!(
                "feature {} is '{}' in the transformer but '{}' in the schema",
                position, fitted, expected
            )));
        }
    }
    Ok(())
}

fn check_len(what: &str, columns: &[String], len: usize) -> Result<(), ArtifactError> {
    if columns.len() != len {
        return Err(ArtifactError::Model(format!(
            "{} has {} entries for {} columns",
            what,
            len,
            columns.len()
        )));
    }
    Ok(())
}

fn resolve(name: &str) -> Result<usize, ArtifactError> {
    feature_index(name)
        .ok_or_else(|| ArtifactError::SchemaMismatch(format!("unknown column '{}'", name)))
}

/// Resolve a column for a step that only accepts numbers
fn resolve_numeric(step: &str, name: &str) -> Result<usize, ArtifactError> {
    let column = resolve(name)?;
    if FEATURE_SCHEMA[column].kind == FeatureKind::Categorical {
        return Err(ArtifactError::SchemaMismatch(format!(
            "{} cannot encode categorical column '{}'",
            step, name
        )));
    }
    Ok(column)
}

fn column_name(column: usize) -> &'static str {
    feature_names().nth(column).unwrap_or("?")
}

fn value_at(features: &FeatureVector, column: usize) -> Result<&FeatureValue, PredictionError> {
    features.get(column).ok_or_else(|| {
        PredictionError::Inference(format!("feature vector has no column {}", column))
    })
}

fn numeric_at(features: &FeatureVector, column: usize) -> Result<f64, PredictionError> {
    let value = value_at(features, column)?;
    let x = match value {
        FeatureValue::Text(s) => s.trim().parse::<f64>().map_err(|_| {
            PredictionError::Validation(format!(
                "could not convert string to float: '{}' in column '{}'",
                s,
                column_name(column)
            ))
        })?,
        other => other.as_f64().unwrap_or_default(),
    };
    if !x.is_finite() {
        return Err(PredictionError::Validation(format!(
            "column '{}' contains a non-finite value",
            column_name(column)
        )));
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::RequestNormalizer;
    use serde_json::json;

    fn spec(transformers: serde_json::Value) -> ColumnTransformerSpec {
        serde_json::from_value(json!({
            "feature_names_in": feature_names().collect::<Vec<_>>(),
            "transformers": transformers,
        }))
        .unwrap()
    }

    fn vector(input: serde_json::Value) -> FeatureVector {
        RequestNormalizer::new()
            .normalize(input.as_object().unwrap())
            .unwrap()
    }

    #[test]
    fn test_scaler_standardizes() {
        let ct = ColumnTransformer::from_spec(spec(json!([
            {"kind": "standard_scaler", "columns": ["Age", "MonthlyIncome"],
             "mean": [30.0, 20000.0], "scale": [5.0, 1000.0]}
        ])))
        .unwrap();

        let row = ct
            .transform(&vector(json!({"Age": 40, "MonthlyIncome": 25000})))
            .unwrap();
        assert_eq!(ct.output_width(), 2);
        assert!((row[0] - 2.0).abs() < 1e-6);
        assert!((row[1] - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_scaler_accepts_numeric_strings() {
        let ct = ColumnTransformer::from_spec(spec(json!([
            {"kind": "standard_scaler", "columns": ["Age"], "mean": [0.0], "scale": [1.0]}
        ])))
        .unwrap();
        let row = ct.transform(&vector(json!({"Age": " 35 "}))).unwrap();
        assert!((row[0] - 35.0).abs() < 1e-6);

        let err = ct.transform(&vector(json!({"Age": "old"}))).unwrap_err();
        assert!(matches!(err, PredictionError::Validation(_)));
        assert!(err.to_string().contains("could not convert string to float"));
    }

    #[test]
    fn test_zero_scale_treated_as_one() {
        let ct = ColumnTransformer::from_spec(spec(json!([
            {"kind": "standard_scaler", "columns": ["CityTier"], "mean": [1.0], "scale": [0.0]}
        ])))
        .unwrap();
        let row = ct.transform(&vector(json!({"CityTier": 3}))).unwrap();
        assert!((row[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_one_hot_with_drop_first() {
        let ct = ColumnTransformer::from_spec(spec(json!([
            {"kind": "one_hot", "columns": ["Gender"],
             "categories": [["Female", "Male"]], "drop": "first"}
        ])))
        .unwrap();
        assert_eq!(ct.output_width(), 1);
        assert_eq!(ct.transform(&vector(json!({"Gender": "Male"}))).unwrap(), vec![1.0]);
        assert_eq!(ct.transform(&vector(json!({"Gender": "Female"}))).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_one_hot_unknown_category_errors() {
        let ct = ColumnTransformer::from_spec(spec(json!([
            {"kind": "one_hot", "columns": ["ProductPitched"],
             "categories": [["Basic", "Deluxe", "King"]]}
        ])))
        .unwrap();

        let err = ct
            .transform(&vector(json!({"ProductPitched": "Platinum"})))
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(err.to_string().contains("ProductPitched"));

        // A missing categorical field defaults to 0, which is not a known category
        assert!(ct.transform(&vector(json!({}))).is_err());
    }

    #[test]
    fn test_one_hot_unknown_category_ignored() {
        let ct = ColumnTransformer::from_spec(spec(json!([
            {"kind": "one_hot", "columns": ["ProductPitched"],
             "categories": [["Basic", "Deluxe", "King"]], "handle_unknown": "ignore"}
        ])))
        .unwrap();
        let row = ct.transform(&vector(json!({}))).unwrap();
        assert_eq!(row, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_outputs_concatenate_in_transformer_order() {
        let ct = ColumnTransformer::from_spec(spec(json!([
            {"kind": "one_hot", "columns": ["Gender"], "categories": [["Female", "Male"]]},
            {"kind": "passthrough", "columns": ["Passport"]}
        ])))
        .unwrap();
        let row = ct
            .transform(&vector(json!({"Gender": "Female", "Passport": 1})))
            .unwrap();
        assert_eq!(row, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_feature_order_mismatch_rejected() {
        let mut names: Vec<String> = feature_names().map(String::from).collect();
        names.swap(0, 1);
        let spec = ColumnTransformerSpec {
            feature_names_in: names,
            transformers: vec![TransformerSpec::Passthrough {
                columns: vec!["Age".to_string()],
            }],
        };
        let err = ColumnTransformer::from_spec(spec).unwrap_err();
        assert!(matches!(err, ArtifactError::SchemaMismatch(_)));
    }

    #[test]
    fn test_unknown_column_rejected() {
        let err = ColumnTransformer::from_spec(spec(json!([
            {"kind": "passthrough", "columns": ["CustomerID"]}
        ])))
        .unwrap_err();
        assert!(matches!(err, ArtifactError::SchemaMismatch(_)));
    }

    #[test]
    fn test_numeric_steps_reject_categorical_columns() {
        for transformer in [
            json!({"kind": "standard_scaler", "columns": ["Gender"],
                   "mean": [0.0], "scale": [1.0]}),
            json!({"kind": "passthrough", "columns": ["Designation"]}),
        ] {
            let err = ColumnTransformer::from_spec(spec(json!([transformer]))).unwrap_err();
            assert!(matches!(err, ArtifactError::SchemaMismatch(_)));
            assert!(err.to_string().contains("categorical column"));
        }
    }

    #[test]
    fn test_one_hot_accepts_numeric_codes() {
        let ct = ColumnTransformer::from_spec(spec(json!([
            {"kind": "one_hot", "columns": ["CityTier"], "categories": [[1, 2, 3]]}
        ])))
        .unwrap();
        let row = ct.transform(&vector(json!({"CityTier": 2}))).unwrap();
        assert_eq!(row, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_mismatched_statistics_rejected() {
        let err = ColumnTransformer::from_spec(spec(json!([
            {"kind": "standard_scaler", "columns": ["Age", "CityTier"],
             "mean": [1.0], "scale": [1.0, 1.0]}
        ])))
        .unwrap_err();
        assert!(matches!(err, ArtifactError::Model(_)));
    }
}
