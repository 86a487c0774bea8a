//! Process-wide service context: model, labels, and the two request
//! entry points the serving layer calls into.

use crate::config::AppConfig;
use crate::error::{ExplainError, PredictError, StartupError};
use crate::explain::Explainer;
use crate::labels::LabelRegistry;
use crate::metrics::ServiceMetrics;
use crate::model::{ClassifierModel, ModelLoader};
use crate::predictor::Predictor;
use crate::preprocess::Preprocessor;
use crate::types::{Diagnostics, Explanation, Prediction};
use candle_core::Device;
use std::time::Instant;
use tracing::info;

/// Shared state established once at startup and passed by reference into
/// every request.
///
/// Model weights are immutable after load and candle's CPU forward pass
/// only reads them, so concurrent `predict`/`explain` calls are safe
/// without a serialization gate around the forward pass. Label
/// reconciliation, including its on-disk persistence, completes inside
/// `init` before the context exists, so no request can observe a
/// partially reconciled registry.
#[derive(Debug)]
pub struct ServiceContext {
    model: ClassifierModel,
    labels: LabelRegistry,
    preprocessor: Preprocessor,
    explainer: Explainer,
    metrics: ServiceMetrics,
}

impl ServiceContext {
    /// Load artifacts and reconcile labels. Any failure here is fatal:
    /// the service must not start with a partially initialized context.
    pub fn init(config: &AppConfig) -> Result<Self, StartupError> {
        let device = Device::Cpu;

        let model = ModelLoader::new(device.clone()).load(&config.model.weights_path)?;
        let mut labels = LabelRegistry::load(&config.model.labels_path)?;
        labels.reconcile(&model.output_shape());

        info!(
            units = model.units(),
            classes = labels.len(),
            "Service context initialized"
        );

        Ok(Self {
            model,
            labels,
            preprocessor: Preprocessor::new(device),
            explainer: Explainer::new(config.heatmap.output_dir.clone()),
            metrics: ServiceMetrics::new(),
        })
    }

    /// Classify one uploaded image.
    pub fn predict(&self, image_bytes: &[u8]) -> Result<Prediction, PredictError> {
        let start = Instant::now();
        let prediction =
            Predictor::predict(&self.model, &self.labels, &self.preprocessor, image_bytes)?;
        self.metrics
            .record_prediction(start.elapsed(), prediction.index >= self.labels.len());
        Ok(prediction)
    }

    /// Produce a Grad-CAM heatmap for one uploaded image.
    pub fn explain(&self, image_bytes: &[u8]) -> Result<Explanation, ExplainError> {
        let start = Instant::now();
        let explanation = self
            .explainer
            .explain(&self.model, &self.preprocessor, image_bytes)?;
        self.metrics.record_explanation(start.elapsed());
        Ok(explanation)
    }

    /// Model and label inventory snapshot for operational inspection.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            model_output_shape: self.model.output_shape(),
            class_count: self.labels.len(),
            class_sample: self.labels.sample(20),
        }
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.metrics
    }
}
