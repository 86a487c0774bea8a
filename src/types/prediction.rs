//! Prediction and explanation result types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of classifying one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Human-readable class label
    pub label: String,

    /// Index of the winning class in the label set
    pub index: usize,

    /// Raw score of the winning class. Not softmax-normalized: if the
    /// model's last layer does not normalize, this is the raw logit.
    pub confidence: f32,
}

/// Result of a Grad-CAM explanation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    /// Path of the rendered single-channel heatmap PNG.
    ///
    /// The file outlives the call; deleting it is the caller's
    /// responsibility.
    pub heatmap_path: PathBuf,
}

/// Model and label inventory snapshot for operational inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Output shape descriptor; `null` axes have unknown size
    pub model_output_shape: Vec<Option<usize>>,

    /// Number of labels after reconciliation
    pub class_count: usize,

    /// Up to 20 leading labels
    pub class_sample: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_serialization() {
        let prediction = Prediction {
            label: "mel".to_string(),
            index: 4,
            confidence: 0.83,
        };

        let json = serde_json::to_string(&prediction).unwrap();
        let deserialized: Prediction = serde_json::from_str(&json).unwrap();

        assert_eq!(prediction.label, deserialized.label);
        assert_eq!(prediction.index, deserialized.index);
        assert_eq!(prediction.confidence, deserialized.confidence);
    }

    #[test]
    fn test_diagnostics_serializes_unknown_axes_as_null() {
        let diagnostics = Diagnostics {
            model_output_shape: vec![None, Some(7)],
            class_count: 7,
            class_sample: vec!["akiec".to_string()],
        };

        let json = serde_json::to_string(&diagnostics).unwrap();
        assert!(json.contains("[null,7]"));
    }
}
