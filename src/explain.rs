//! Grad-CAM explanation pass.
//!
//! Attributes the predicted class score back to the last convolutional
//! activation map via reverse-mode autodiff, and renders the result as a
//! single-channel heatmap image.

use crate::error::ExplainError;
use crate::model::ClassifierModel;
use crate::predictor::Predictor;
use crate::preprocess::{Preprocessor, INPUT_HEIGHT, INPUT_WIDTH};
use crate::types::Explanation;
use candle_core::{IndexOp, Tensor, Var};
use image::imageops::FilterType;
use image::{GrayImage, ImageBuffer, Luma};
use std::path::PathBuf;
use tracing::{info, warn};

/// Produces spatial attribution heatmaps for the model's predicted class.
#[derive(Debug)]
pub struct Explainer {
    output_dir: Option<PathBuf>,
}

impl Explainer {
    pub fn new(output_dir: Option<PathBuf>) -> Self {
        Self { output_dir }
    }

    /// Generate a Grad-CAM heatmap for the winning class of one image.
    ///
    /// The returned PNG outlives the call; deleting it is the caller's
    /// responsibility.
    pub fn explain(
        &self,
        model: &ClassifierModel,
        preprocessor: &Preprocessor,
        bytes: &[u8],
    ) -> Result<Explanation, ExplainError> {
        let input = preprocessor.preprocess(bytes)?;
        let (map, class_idx) = attribution_map(model, &input)?;

        let (h, w) = map.dims2()?;
        let raw: Vec<f32> = map.flatten_all()?.to_vec1()?;
        let coarse = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(w as u32, h as u32, raw)
            .ok_or_else(|| ExplainError::Render("attribution map size mismatch".into()))?;
        let resized = image::imageops::resize(
            &coarse,
            INPUT_WIDTH as u32,
            INPUT_HEIGHT as u32,
            FilterType::Triangle,
        );

        let pixels = normalize_to_pixels(resized.as_raw());
        let gray = GrayImage::from_raw(INPUT_WIDTH as u32, INPUT_HEIGHT as u32, pixels)
            .ok_or_else(|| ExplainError::Render("heatmap buffer size mismatch".into()))?;

        let path = self.write_heatmap(&gray)?;
        info!(class_idx, heatmap = %path.display(), "Explanation generated");
        Ok(Explanation { heatmap_path: path })
    }

    // The heatmap file is intentionally long-lived; it is the return value.
    fn write_heatmap(&self, image: &GrayImage) -> Result<PathBuf, ExplainError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("heatmap-").suffix(".png");
        let file = match &self.output_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let path = file
            .into_temp_path()
            .keep()
            .map_err(|e| ExplainError::Io(e.error))?;
        image.save(&path)?;
        Ok(path)
    }
}

/// Compute the raw Grad-CAM map for the winning class of one input.
///
/// Runs one recorded forward pass with two outputs: the conv activation map
/// and the class scores. Promoting the activation to a `Var` makes it a
/// differentiation leaf the gradient store retains. Returns the clamped
/// `(h, w)` attribution map and the winning class index.
fn attribution_map(
    model: &ClassifierModel,
    input: &Tensor,
) -> Result<(Tensor, usize), ExplainError> {
    let activation = Var::from_tensor(&model.features(input)?)?;
    let scores = model.head_forward(activation.as_tensor())?;

    let class_scores = scores.squeeze(0)?.to_vec1::<f32>()?;
    let class_idx = Predictor::argmax(&class_scores)
        .ok_or_else(|| ExplainError::Render("model produced an empty score vector".into()))?;

    // Gradient of the winning class score w.r.t. the activation map.
    let score = scores.i((0, class_idx))?;
    let grads = score.backward()?;
    let grad = grads.get(activation.as_tensor()).ok_or_else(|| {
        ExplainError::Render("no gradient recorded for the feature activation".into())
    })?;

    // Channel importance: mean gradient over batch and both spatial axes.
    let weights = grad.mean(0)?.mean(1)?.mean(1)?;

    // Channel-weighted sum of the activation, keeping only positive
    // contributions.
    let activation = activation.as_tensor().squeeze(0)?;
    let (channels, _, _) = activation.dims3()?;
    let map = activation
        .broadcast_mul(&weights.reshape((channels, 1, 1))?)?
        .sum(0)?
        .relu()?;

    Ok((map, class_idx))
}

/// Normalize an attribution map to `[0,255]` by its maximum.
///
/// A degenerate all-zero map is emitted as-is with a warning rather than
/// treated as an error.
fn normalize_to_pixels(values: &[f32]) -> Vec<u8> {
    let max = values.iter().copied().fold(0.0f32, f32::max);
    if max == 0.0 {
        warn!("Heatmap has max value 0; normalization skipped");
        return vec![0; values.len()];
    }
    values
        .iter()
        .map(|v| ((v / max).clamp(0.0, 1.0) * 255.0) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelLoader;
    use crate::testutil::{biased_weights, sample_image_bytes, smooth_weights, TEST_UNITS};
    use candle_core::Device;

    #[test]
    fn test_normalize_scales_max_to_255() {
        let pixels = normalize_to_pixels(&[0.0, 1.0, 2.0, 4.0]);
        assert_eq!(pixels, vec![0, 63, 127, 255]);
    }

    #[test]
    fn test_normalize_zero_map_stays_zero() {
        let pixels = normalize_to_pixels(&[0.0, 0.0, 0.0]);
        assert_eq!(pixels, vec![0, 0, 0]);
    }

    #[test]
    fn test_explain_writes_heatmap_png() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ModelLoader::new(Device::Cpu);
        let model = loader.build(smooth_weights(TEST_UNITS)).unwrap();
        let preprocessor = Preprocessor::new(Device::Cpu);
        let explainer = Explainer::new(Some(dir.path().to_path_buf()));

        let explanation = explainer
            .explain(&model, &preprocessor, &sample_image_bytes())
            .unwrap();
        assert!(explanation.heatmap_path.exists());
        assert_eq!(
            explanation.heatmap_path.extension().and_then(|e| e.to_str()),
            Some("png")
        );

        let heatmap = image::open(&explanation.heatmap_path).unwrap().to_luma8();
        assert_eq!(heatmap.width(), INPUT_WIDTH as u32);
        assert_eq!(heatmap.height(), INPUT_HEIGHT as u32);
        // Positive activations and gradients everywhere: the map normalizes
        // with a full-scale maximum.
        assert_eq!(heatmap.pixels().map(|p| p.0[0]).max(), Some(255));
    }

    #[test]
    fn test_explain_zero_gradient_emits_all_zero_heatmap() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ModelLoader::new(Device::Cpu);
        // Zero weights: scores come only from the fc2 bias, so the gradient
        // reaching the conv activation is exactly zero.
        let model = loader.build(biased_weights(&[0.1, 0.7, 0.2])).unwrap();
        let preprocessor = Preprocessor::new(Device::Cpu);
        let explainer = Explainer::new(Some(dir.path().to_path_buf()));

        let explanation = explainer
            .explain(&model, &preprocessor, &sample_image_bytes())
            .unwrap();
        let heatmap = image::open(&explanation.heatmap_path).unwrap().to_luma8();
        assert!(heatmap.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_attribution_failure_on_mis_sized_input() {
        let loader = ModelLoader::new(Device::Cpu);
        let model = loader.build(smooth_weights(TEST_UNITS)).unwrap();

        // Wrong spatial size: the conv stack runs but the head's flatten
        // no longer matches fc1, so the recorded pass fails.
        let bad_input = candle_core::Tensor::zeros(
            (1usize, 8, 8, 3),
            candle_core::DType::F32,
            &Device::Cpu,
        )
        .unwrap();

        let err = attribution_map(&model, &bad_input).unwrap_err();
        assert!(matches!(err, ExplainError::Attribution(_)));
    }

    #[test]
    fn test_explain_rejects_garbage_bytes() {
        let loader = ModelLoader::new(Device::Cpu);
        let model = loader.build(smooth_weights(TEST_UNITS)).unwrap();
        let preprocessor = Preprocessor::new(Device::Cpu);
        let explainer = Explainer::new(None);

        let err = explainer
            .explain(&model, &preprocessor, b"not an image")
            .unwrap_err();
        assert!(matches!(err, ExplainError::Decode(_)));
    }
}
