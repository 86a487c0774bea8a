//! Configuration management for the inference service core.

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub heatmap: HeatmapConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model artifact locations
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the safetensors weight artifact
    #[serde(default = "default_weights_path")]
    pub weights_path: PathBuf,
    /// Path to the JSON label artifact
    #[serde(default = "default_labels_path")]
    pub labels_path: PathBuf,
}

/// Heatmap output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeatmapConfig {
    /// Directory for generated heatmap images; the system temp dir when unset.
    /// Generated files are not cleaned up by the core.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_weights_path() -> PathBuf {
    PathBuf::from("model/model.safetensors")
}

fn default_labels_path() -> PathBuf {
    PathBuf::from("model/classes.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig {
                weights_path: default_weights_path(),
                labels_path: default_labels_path(),
            },
            heatmap: HeatmapConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
