//! End-to-end smoke test against a running service

use anyhow::{bail, Result};
use colored::Colorize;
use serde_json::{json, Map, Value};

use crate::client::ApiClient;
use crate::commands::predict::render_prediction;
use crate::output::{print_error, print_info, print_json, print_success, OutputFormat};

/// Reference customer used by the smoke test
pub fn sample_customer() -> Map<String, Value> {
    let customer = json!({
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
    });

    match customer {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Check health, then request a prediction for the sample customer
pub async fn run_check(client: &ApiClient, format: OutputFormat) -> Result<()> {
    if matches!(format, OutputFormat::Table) {
        println!("{}", "Predictor Smoke Test".bold());
        println!("{}", "=".repeat(50));
    }

    let health = match client.health().await {
        Ok(health) => health,
        Err(e) => {
            print_error(&format!("Health check failed: {}", e));
            return Err(e.into());
        }
    };

    if !health.model_loaded {
        print_error("Service is up but the model is not loaded");
        bail!("model not loaded");
    }

    if matches!(format, OutputFormat::Table) {
        print_success("Service healthy, model loaded");
        print_info("Requesting prediction for the sample customer");
        println!();
    }

    let result = match client.predict(&sample_customer()).await {
        Ok(result) => result,
        Err(e) => {
            print_error(&format!("Prediction failed: {}", e));
            return Err(e.into());
        }
    };

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            render_prediction(&result);
            println!();
            print_success("Smoke test passed");
        }
    }

    Ok(())
}
