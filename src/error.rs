//! Typed error hierarchy for the inference core.
//!
//! Startup failures abort service construction entirely; per-request
//! failures are logged with enough context to diagnose (shapes, dtypes)
//! and propagated to the caller without retries.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal startup conditions. There is no partially initialized service:
/// any of these aborts `ServiceContext::init`.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read model weights from {path}: {source}")]
    WeightsLoad {
        path: PathBuf,
        #[source]
        source: candle_core::Error,
    },

    #[error("model weight tensor '{name}' is missing from the artifact")]
    MissingWeight { name: String },

    #[error("model weight tensor '{name}' has unexpected shape {shape:?}")]
    WeightShape { name: String, shape: Vec<usize> },

    #[error("classifier head expects {expected} flattened features but the conv stack produces {actual}")]
    HeadMismatch { expected: usize, actual: usize },

    #[error("failed to build network from weights: {0}")]
    Network(#[from] candle_core::Error),

    #[error("failed to read label artifact {path}: {source}")]
    LabelRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("label artifact {path} is not a JSON array of strings: {source}")]
    LabelParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Image bytes that could not be turned into a model input tensor.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("could not decode image bytes: {0}")]
    Image(#[from] image::ImageError),

    #[error("could not build input tensor: {0}")]
    Tensor(#[from] candle_core::Error),
}

/// Per-request failures on the prediction path.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("forward pass failed for input shape {shape:?} dtype {dtype}: {source}")]
    Inference {
        shape: Vec<usize>,
        dtype: String,
        #[source]
        source: candle_core::Error,
    },

    #[error("score reduction failed: {reason}")]
    Reduction { reason: String },
}

/// Per-request failures on the explanation path.
#[derive(Debug, Error)]
pub enum ExplainError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("gradient attribution failed: {0}")]
    Attribution(#[from] candle_core::Error),

    #[error("heatmap rendering failed: {0}")]
    Render(String),

    #[error("failed to write heatmap image: {0}")]
    Write(#[from] image::ImageError),

    #[error("failed to persist heatmap file: {0}")]
    Io(#[from] std::io::Error),
}
