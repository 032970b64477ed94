//! Prediction command

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tabled::Tabled;

use crate::client::{ApiClient, PredictionResponse};
use crate::output::{
    color_confidence, color_prediction, format_probability, print_json, print_table, OutputFormat,
};

/// Customer fields for a prediction
///
/// Flags override fields read from `--input`. Fields left unset are omitted
/// from the request.
#[derive(Debug, Default, Args)]
pub struct PredictArgs {
    /// JSON file holding the customer record
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    #[arg(long)]
    pub age: Option<i64>,

    /// e.g. "Self Enquiry", "Company Invited"
    #[arg(long)]
    pub type_of_contact: Option<String>,

    #[arg(long)]
    pub city_tier: Option<i64>,

    #[arg(long)]
    pub duration_of_pitch: Option<i64>,

    #[arg(long)]
    pub occupation: Option<String>,

    #[arg(long)]
    pub gender: Option<String>,

    #[arg(long)]
    pub number_of_followups: Option<i64>,

    #[arg(long)]
    pub product_pitched: Option<String>,

    #[arg(long)]
    pub preferred_property_star: Option<i64>,

    #[arg(long)]
    pub marital_status: Option<String>,

    #[arg(long)]
    pub number_of_trips: Option<i64>,

    /// 0 or 1
    #[arg(long)]
    pub passport: Option<i64>,

    #[arg(long)]
    pub pitch_satisfaction_score: Option<i64>,

    /// 0 or 1
    #[arg(long)]
    pub own_car: Option<i64>,

    #[arg(long)]
    pub designation: Option<String>,

    #[arg(long)]
    pub monthly_income: Option<f64>,

    #[arg(long)]
    pub number_of_person_visiting: Option<i64>,

    #[arg(long)]
    pub number_of_children_visiting: Option<i64>,
}

impl PredictArgs {
    /// Assemble the request body from the input file and flags
    pub fn into_body(self) -> Result<Map<String, Value>> {
        let mut body = match &self.input {
            Some(path) => read_input(path)?,
            None => Map::new(),
        };

        let mut set = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                body.insert(key.to_string(), value);
            }
        };

        set("Age", self.age.map(Value::from));
        set("TypeofContact", self.type_of_contact.map(Value::from));
        set("CityTier", self.city_tier.map(Value::from));
        set("DurationOfPitch", self.duration_of_pitch.map(Value::from));
        set("Occupation", self.occupation.map(Value::from));
        set("Gender", self.gender.map(Value::from));
        set("NumberOfFollowups", self.number_of_followups.map(Value::from));
        set("ProductPitched", self.product_pitched.map(Value::from));
        set(
            "PreferredPropertyStar",
            self.preferred_property_star.map(Value::from),
        );
        set("MaritalStatus", self.marital_status.map(Value::from));
        set("NumberOfTrips", self.number_of_trips.map(Value::from));
        set("Passport", self.passport.map(Value::from));
        set(
            "PitchSatisfactionScore",
            self.pitch_satisfaction_score.map(Value::from),
        );
        set("OwnCar", self.own_car.map(Value::from));
        set("Designation", self.designation.map(Value::from));
        set("MonthlyIncome", self.monthly_income.map(Value::from));
        set(
            "NumberOfPersonVisiting",
            self.number_of_person_visiting.map(Value::from),
        );
        set(
            "NumberOfChildrenVisiting",
            self.number_of_children_visiting.map(Value::from),
        );

        Ok(body)
    }
}

fn read_input(path: &Path) -> Result<Map<String, Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    match value {
        Value::Object(map) => Ok(map),
        _ => bail!("{} must contain a JSON object", path.display()),
    }
}

/// Row for the probability table
#[derive(Tabled)]
struct ProbabilityRow {
    #[tabled(rename = "Outcome")]
    outcome: &'static str,
    #[tabled(rename = "Probability")]
    probability: String,
}

/// Request a prediction and print it
pub async fn run_prediction(
    client: &ApiClient,
    args: PredictArgs,
    format: OutputFormat,
) -> Result<()> {
    let body = args.into_body()?;
    if body.is_empty() {
        bail!("No customer fields given, pass --input or at least one field flag");
    }

    let result = client.predict(&body).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => render_prediction(&result),
    }

    Ok(())
}

pub(crate) fn render_prediction(result: &PredictionResponse) {
    println!("{}", "Prediction".bold());
    println!("{}", "=".repeat(50));
    println!("Outcome:     {}", color_prediction(result.prediction));
    println!("Message:     {}", result.message);
    println!("Confidence:  {}", color_confidence(result.confidence));
    println!();

    print_table(vec![
        ProbabilityRow {
            outcome: "Not take package",
            probability: format_probability(result.probability.not_take_package),
        },
        ProbabilityRow {
            outcome: "Take package",
            probability: format_probability(result.probability.take_package),
        },
    ]);
}
