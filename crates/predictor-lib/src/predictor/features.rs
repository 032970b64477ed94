//! Feature schema and request normalization
//!
//! The schema fixes the order of the 17 features the preprocessing transform
//! was fitted with. The normalizer maps a loosely-typed request body onto that
//! order, defaulting missing fields to `0` and computing derived features.

use crate::error::PredictionError;
use crate::models::{FeatureValue, FeatureVector, RawInput};
use serde_json::Value;

/// Number of features the model expects
pub const FEATURE_COUNT: usize = 17;

pub const TOTAL_VISITING: &str = "TotalVisiting";
pub const PERSON_VISITING: &str = "NumberOfPersonVisiting";
pub const CHILDREN_VISITING: &str = "NumberOfChildrenVisiting";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

/// Where a feature's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSource {
    /// Looked up in the request by the feature's own name
    Raw,
    /// Sum of the named raw request fields
    Sum(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub kind: FeatureKind,
    pub source: FeatureSource,
}

impl FeatureSpec {
    const fn numeric(name: &'static str) -> Self {
        Self {
            name,
            kind: FeatureKind::Numeric,
            source: FeatureSource::Raw,
        }
    }

    const fn categorical(name: &'static str) -> Self {
        Self {
            name,
            kind: FeatureKind::Categorical,
            source: FeatureSource::Raw,
        }
    }

    pub fn is_derived(&self) -> bool {
        !matches!(self.source, FeatureSource::Raw)
    }
}

/// Feature order used when the preprocessing transform was fitted
pub static FEATURE_SCHEMA: [FeatureSpec; FEATURE_COUNT] = [
    FeatureSpec::numeric("Age"),
    FeatureSpec::categorical("TypeofContact"),
    FeatureSpec::numeric("CityTier"),
    FeatureSpec::numeric("DurationOfPitch"),
    FeatureSpec::categorical("Occupation"),
    FeatureSpec::categorical("Gender"),
    FeatureSpec::numeric("NumberOfFollowups"),
    FeatureSpec::categorical("ProductPitched"),
    FeatureSpec::numeric("PreferredPropertyStar"),
    FeatureSpec::categorical("MaritalStatus"),
    FeatureSpec::numeric("NumberOfTrips"),
    FeatureSpec::numeric("Passport"),
    FeatureSpec::numeric("PitchSatisfactionScore"),
    FeatureSpec::numeric("OwnCar"),
    FeatureSpec::categorical("Designation"),
    FeatureSpec::numeric("MonthlyIncome"),
    FeatureSpec {
        name: TOTAL_VISITING,
        kind: FeatureKind::Numeric,
        source: FeatureSource::Sum(&[PERSON_VISITING, CHILDREN_VISITING]),
    },
];

/// Feature names in schema order
pub fn feature_names() -> impl Iterator<Item = &'static str> {
    FEATURE_SCHEMA.iter().map(|spec| spec.name)
}

/// Position of a feature in the schema
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_SCHEMA.iter().position(|spec| spec.name == name)
}

/// Maps raw request bodies onto the schema-ordered feature vector
#[derive(Debug, Clone, Copy)]
pub struct RequestNormalizer {
    schema: &'static [FeatureSpec],
}

impl RequestNormalizer {
    pub fn new() -> Self {
        Self {
            schema: &FEATURE_SCHEMA,
        }
    }

    /// Build the feature vector for a request.
    ///
    /// Unknown keys are ignored and missing keys become `0`. Present values are
    /// passed through without coercion; deciding whether they can be encoded is
    /// left to the preprocessing transform.
    pub fn normalize(&self, raw: &RawInput) -> Result<FeatureVector, PredictionError> {
        let values = self
            .schema
            .iter()
            .map(|spec| match spec.source {
                FeatureSource::Raw => match raw.get(spec.name) {
                    Some(value) => to_feature_value(spec.name, value),
                    None => Ok(FeatureValue::default()),
                },
                FeatureSource::Sum(operands) => sum_operands(spec.name, operands, raw),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FeatureVector::new(values))
    }
}

impl Default for RequestNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn to_feature_value(name: &str, value: &Value) -> Result<FeatureValue, PredictionError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(FeatureValue::Int)
            .or_else(|| n.as_f64().map(FeatureValue::Float))
            .ok_or_else(|| {
                PredictionError::Validation(format!("feature '{}' is not a finite number", name))
            }),
        Value::String(s) => Ok(FeatureValue::Text(s.clone())),
        Value::Bool(b) => Ok(FeatureValue::Int(i64::from(*b))),
        other => Err(PredictionError::Validation(format!(
            "feature '{}' must be a number or a string, got {}",
            name,
            json_type_name(other)
        ))),
    }
}

fn sum_operands(
    name: &str,
    operands: &[&str],
    raw: &RawInput,
) -> Result<FeatureValue, PredictionError> {
    let mut total = FeatureValue::Int(0);
    for operand in operands {
        let value = match raw.get(*operand) {
            Some(v) => to_feature_value(operand, v)?,
            None => FeatureValue::default(),
        };
        if let FeatureValue::Text(s) = &value {
            return Err(PredictionError::Validation(format!(
                "derived feature '{}' requires a numeric '{}', got '{}'",
                name, operand, s
            )));
        }
        // Both sides are numeric from here on
        total = match (total, value) {
            (FeatureValue::Int(a), FeatureValue::Int(b)) => match a.checked_add(b) {
                Some(sum) => FeatureValue::Int(sum),
                None => FeatureValue::Float(a as f64 + b as f64),
            },
            (acc, v) => FeatureValue::Float(
                acc.as_f64().unwrap_or_default() + v.as_f64().unwrap_or_default(),
            ),
        };
    }
    Ok(total)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
