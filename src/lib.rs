//! Inference core for skin-lesion image classification.
//!
//! Loads a pretrained convolutional classifier and its label artifact,
//! reconciles the two at startup, and serves predictions and Grad-CAM
//! explanations to an external serving layer through
//! [`ServiceContext::predict`] and [`ServiceContext::explain`].

pub mod config;
pub mod context;
pub mod error;
pub mod explain;
pub mod labels;
pub mod metrics;
pub mod model;
pub mod predictor;
pub mod preprocess;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::AppConfig;
pub use context::ServiceContext;
pub use error::{DecodeError, ExplainError, PredictError, StartupError};
pub use types::{Diagnostics, Explanation, Prediction};
