//! Service status commands

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{
    color_status, format_unix_timestamp, print_json, print_warning, short_digest, OutputFormat,
};

/// Show the health probe
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("{}", "Predictor Health".bold());
            println!("{}", "=".repeat(40));
            println!("Status:        {}", color_status(&health.status));
            let loaded = if health.model_loaded {
                "yes".green()
            } else {
                "no".red()
            };
            println!("Model loaded:  {}", loaded);

            if !health.model_loaded {
                println!();
                print_warning(
                    "Predictions will fail until the service is restarted with valid artifacts",
                );
            }
        }
    }

    Ok(())
}

/// Show the loaded model metadata
pub async fn show_model(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let model = client.model().await?;

    match format {
        OutputFormat::Json => print_json(&model)?,
        OutputFormat::Table => {
            println!("{}", "Loaded Model".bold());
            println!("{}", "=".repeat(50));
            println!("Classifier:        {}", model.classifier_kind.cyan());
            println!("Input width:       {}", model.input_width);
            println!("Loaded at:         {}", format_unix_timestamp(model.loaded_at));
            println!();
            println!("{}", "Checksums".bold());
            println!("{}", "-".repeat(50));
            println!("Preprocessor:      {}", short_digest(&model.preprocessor_sha256));
            println!("Classifier:        {}", short_digest(&model.classifier_sha256));
        }
    }

    Ok(())
}
