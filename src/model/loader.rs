//! Weight-artifact loading with shape introspection.

use crate::error::StartupError;
use crate::model::network::{ClassifierModel, NetworkDims};
use crate::preprocess::{INPUT_CHANNELS, INPUT_HEIGHT, INPUT_WIDTH};
use candle_core::{DType, Device, Tensor};
use candle_nn::{Conv2dConfig, VarBuilder};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Loads the classifier from a safetensors artifact.
///
/// Layer dimensions are read from the weight tensor shapes rather than
/// hardcoded, so the same code serves any checkpoint that keeps the
/// `conv1..conv3` / `fc1` / `fc2` naming scheme.
pub struct ModelLoader {
    device: Device,
}

impl ModelLoader {
    pub fn new(device: Device) -> Self {
        Self { device }
    }

    /// Load and validate the model from `path`. Any failure here is
    /// startup-fatal.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<ClassifierModel, StartupError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading model weights");

        let tensors = candle_core::safetensors::load(path, &self.device).map_err(|source| {
            StartupError::WeightsLoad {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let model = self.build(tensors)?;
        info!(dims = ?model.dims(), "Model loaded successfully");
        Ok(model)
    }

    /// Build the network from an in-memory tensor map.
    pub fn build(
        &self,
        tensors: HashMap<String, Tensor>,
    ) -> Result<ClassifierModel, StartupError> {
        let dims = Self::introspect(&tensors)?;

        // Three 2x2 pooling stages halve (floor) each spatial axis; the 3x3
        // convolutions keep them via padding 1.
        let feat_h = INPUT_HEIGHT / 2 / 2 / 2;
        let feat_w = INPUT_WIDTH / 2 / 2 / 2;
        let flattened = dims.conv_channels[2] * feat_h * feat_w;
        let fc1_in = Self::dim(&tensors, "fc1.weight", 1)?;
        if fc1_in != flattened {
            return Err(StartupError::HeadMismatch {
                expected: fc1_in,
                actual: flattened,
            });
        }

        let vb = VarBuilder::from_tensors(tensors, DType::F32, &self.device);
        let cfg = Conv2dConfig {
            padding: 1,
            ..Default::default()
        };
        let conv1 = candle_nn::conv2d(INPUT_CHANNELS, dims.conv_channels[0], 3, cfg, vb.pp("conv1"))?;
        let conv2 = candle_nn::conv2d(
            dims.conv_channels[0],
            dims.conv_channels[1],
            3,
            cfg,
            vb.pp("conv2"),
        )?;
        let conv3 = candle_nn::conv2d(
            dims.conv_channels[1],
            dims.conv_channels[2],
            3,
            cfg,
            vb.pp("conv3"),
        )?;
        let fc1 = candle_nn::linear(flattened, dims.hidden, vb.pp("fc1"))?;
        let fc2 = candle_nn::linear(dims.hidden, dims.units, vb.pp("fc2"))?;

        Ok(ClassifierModel::new(conv1, conv2, conv3, fc1, fc2, dims))
    }

    // Read every layer dimension from the weight shapes and check the conv
    // stack is internally consistent.
    fn introspect(tensors: &HashMap<String, Tensor>) -> Result<NetworkDims, StartupError> {
        let c1 = Self::dim(tensors, "conv1.weight", 0)?;
        let c2 = Self::dim(tensors, "conv2.weight", 0)?;
        let c3 = Self::dim(tensors, "conv3.weight", 0)?;
        let hidden = Self::dim(tensors, "fc1.weight", 0)?;
        let units = Self::dim(tensors, "fc2.weight", 0)?;

        for (name, expected) in [
            ("conv1.weight", INPUT_CHANNELS),
            ("conv2.weight", c1),
            ("conv3.weight", c2),
        ] {
            let in_channels = Self::dim(tensors, name, 1)?;
            if in_channels != expected {
                return Err(StartupError::WeightShape {
                    name: name.to_string(),
                    shape: Self::shape(tensors, name),
                });
            }
        }
        let fc2_in = Self::dim(tensors, "fc2.weight", 1)?;
        if fc2_in != hidden {
            return Err(StartupError::WeightShape {
                name: "fc2.weight".to_string(),
                shape: Self::shape(tensors, "fc2.weight"),
            });
        }

        Ok(NetworkDims {
            conv_channels: [c1, c2, c3],
            hidden,
            units,
        })
    }

    fn dim(
        tensors: &HashMap<String, Tensor>,
        name: &str,
        axis: usize,
    ) -> Result<usize, StartupError> {
        let tensor = tensors
            .get(name)
            .ok_or_else(|| StartupError::MissingWeight {
                name: name.to_string(),
            })?;
        tensor
            .dims()
            .get(axis)
            .copied()
            .ok_or_else(|| StartupError::WeightShape {
                name: name.to_string(),
                shape: tensor.dims().to_vec(),
            })
    }

    fn shape(tensors: &HashMap<String, Tensor>, name: &str) -> Vec<usize> {
        tensors
            .get(name)
            .map(|t| t.dims().to_vec())
            .unwrap_or_default()
    }
}
