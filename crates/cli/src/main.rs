//! Holiday Package Predictor CLI
//!
//! A command-line tool for checking and querying a running prediction
//! service.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check, predict, status};

/// Holiday Package Predictor CLI
#[derive(Parser)]
#[command(name = "hpp")]
#[command(author, version, about = "CLI for the Holiday Package Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via HPP_API_URL env var)
    #[arg(long, env = "HPP_API_URL", default_value = "http://localhost:5000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show service health and whether the model is loaded
    Health,

    /// Show metadata of the loaded model
    Model,

    /// Predict whether a customer will take the holiday package
    Predict(predict::PredictArgs),

    /// Smoke test: health check followed by a sample prediction
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    // Execute command
    match cli.command {
        Commands::Health => status::show_health(&client, cli.format).await?,
        Commands::Model => status::show_model(&client, cli.format).await?,
        Commands::Predict(args) => predict::run_prediction(&client, args, cli.format).await?,
        Commands::Check => check::run_check(&client, cli.format).await?,
    }

    Ok(())
}
