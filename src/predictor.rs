//! Forward-pass prediction: score reduction, argmax, and label resolution.

use crate::error::PredictError;
use crate::labels::LabelRegistry;
use crate::model::ClassifierModel;
use crate::preprocess::Preprocessor;
use crate::types::Prediction;
use candle_core::Tensor;
use tracing::{error, info, warn};

/// Runs one image through the model and resolves the winning class label.
pub struct Predictor;

impl Predictor {
    /// Classify one image. Single attempt, no retries; failures are logged
    /// with the offending input shape and dtype, then propagated.
    pub fn predict(
        model: &ClassifierModel,
        labels: &LabelRegistry,
        preprocessor: &Preprocessor,
        bytes: &[u8],
    ) -> Result<Prediction, PredictError> {
        let input = preprocessor.preprocess(bytes)?;
        let raw = Self::run_forward(model, &input)?;
        let scores = Self::reduce_scores(&raw)?;
        let prediction = Self::resolve(&scores, labels)?;
        info!(
            scores_len = scores.len(),
            classes_len = labels.len(),
            index = prediction.index,
            "Prediction complete"
        );
        Ok(prediction)
    }

    // Forward-pass failures are logged with the offending input shape and
    // dtype before propagating.
    fn run_forward(model: &ClassifierModel, input: &Tensor) -> Result<Tensor, PredictError> {
        model.forward(input).map_err(|source| {
            let shape = input.dims().to_vec();
            let dtype = input.dtype().as_str().to_string();
            error!(shape = ?shape, dtype = %dtype, "Forward pass failed");
            PredictError::Inference {
                shape,
                dtype,
                source,
            }
        })
    }

    /// Flatten raw model output to one score per class.
    ///
    /// Drops a leading batch axis when it is exactly 1, then averages over
    /// every remaining axis except the last. The unweighted mean is part of
    /// the model contract; changing it would change predicted labels.
    pub fn reduce_scores(raw: &Tensor) -> Result<Vec<f32>, PredictError> {
        let mut t = raw.clone();
        if t.rank() >= 2 && t.dims()[0] == 1 {
            t = t.squeeze(0).map_err(reduction_err)?;
        }
        while t.rank() > 1 {
            t = t.mean(0).map_err(reduction_err)?;
        }
        let scores = t.to_vec1::<f32>().map_err(reduction_err)?;
        if scores.is_empty() {
            return Err(PredictError::Reduction {
                reason: "empty score vector".to_string(),
            });
        }
        Ok(scores)
    }

    /// Resolve the winning index to a label and confidence.
    ///
    /// An index beyond the label set is not an error: a `class_<index>`
    /// fallback label is used and the full score vector logged for
    /// diagnosis.
    pub fn resolve(scores: &[f32], labels: &LabelRegistry) -> Result<Prediction, PredictError> {
        let index = Self::argmax(scores).ok_or_else(|| PredictError::Reduction {
            reason: "empty score vector".to_string(),
        })?;

        let label = match labels.get(index) {
            Some(label) => label.to_string(),
            None => {
                let fallback = format!("class_{index}");
                warn!(
                    index,
                    classes_len = labels.len(),
                    scores = ?scores,
                    fallback = %fallback,
                    "Predicted index out of range for label set; using fallback label"
                );
                fallback
            }
        };

        Ok(Prediction {
            label,
            index,
            confidence: scores[index],
        })
    }

    /// First-occurrence argmax; ties resolve to the lowest index.
    pub fn argmax(scores: &[f32]) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &score) in scores.iter().enumerate() {
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((i, score)),
            }
        }
        best.map(|(index, _)| index)
    }
}

fn reduction_err(e: candle_core::Error) -> PredictError {
    PredictError::Reduction {
        reason: e.to_string(),
    }
}
