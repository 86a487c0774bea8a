//! Lesion Inference - Command-Line Entry Point
//!
//! Thin stand-in for the HTTP serving layer: loads the model once, runs a
//! single diagnose/predict/explain operation, and prints the result as JSON.

use anyhow::Result;
use clap::{Parser, Subcommand};
use lesion_inference::{AppConfig, ServiceContext};
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "lesion-inference", about = "Skin-lesion classification with Grad-CAM explanations")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "config/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print model output shape and label inventory
    Diagnose,
    /// Classify an image file
    Predict { image: PathBuf },
    /// Write a Grad-CAM heatmap for an image file
    Explain { image: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        AppConfig::load_from_path(&cli.config)?
    } else {
        AppConfig::default()
    };

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("lesion_inference={}", config.logging.level))
    });
    match config.logging.format.as_str() {
        "json" => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    info!("Starting lesion inference core");
    let context = ServiceContext::init(&config)?;

    match cli.command {
        Command::Diagnose => {
            println!("{}", serde_json::to_string_pretty(&context.diagnostics())?);
        }
        Command::Predict { image } => {
            let bytes = fs::read(&image)?;
            let prediction = context.predict(&bytes)?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
        Command::Explain { image } => {
            let bytes = fs::read(&image)?;
            let explanation = context.explain(&bytes)?;
            println!("{}", serde_json::to_string_pretty(&explanation)?);
        }
    }

    context.metrics().print_summary();
    Ok(())
}
