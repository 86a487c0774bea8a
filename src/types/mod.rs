//! Type definitions exchanged with the serving layer.

pub mod prediction;

pub use prediction::{Diagnostics, Explanation, Prediction};
