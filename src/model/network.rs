//! The convolutional classifier network.

use candle_core::Tensor;
use candle_nn::{Conv2d, Linear, Module};

/// Layer dimensions introspected from the weight artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkDims {
    /// Output channels of conv1..conv3
    pub conv_channels: [usize; 3],
    /// Width of the hidden dense layer
    pub hidden: usize,
    /// Output cardinality (number of classes scored)
    pub units: usize,
}

/// CNN classifier: three conv blocks (3x3, padding 1, ReLU, 2x2 max-pool)
/// followed by a two-layer dense head.
///
/// Input is NHWC `(1, 75, 100, 3)`; the forward pass permutes to NCHW for
/// the convolution kernels. Immutable after construction; forward passes
/// only read the weights, so concurrent calls are safe.
#[derive(Debug)]
pub struct ClassifierModel {
    conv1: Conv2d,
    conv2: Conv2d,
    conv3: Conv2d,
    fc1: Linear,
    fc2: Linear,
    dims: NetworkDims,
}

impl ClassifierModel {
    pub(crate) fn new(
        conv1: Conv2d,
        conv2: Conv2d,
        conv3: Conv2d,
        fc1: Linear,
        fc2: Linear,
        dims: NetworkDims,
    ) -> Self {
        Self {
            conv1,
            conv2,
            conv3,
            fc1,
            fc2,
            dims,
        }
    }

    /// Output shape descriptor: unknown batch axis, concrete class axis.
    pub fn output_shape(&self) -> Vec<Option<usize>> {
        vec![None, Some(self.dims.units)]
    }

    /// Number of classes this model scores.
    pub fn units(&self) -> usize {
        self.dims.units
    }

    pub fn dims(&self) -> &NetworkDims {
        &self.dims
    }

    /// Activation map of the last convolutional layer (post-ReLU, pre-pool),
    /// shape `(batch, channels, h, w)`.
    ///
    /// This is the layer Grad-CAM attributes against.
    pub fn features(&self, input: &Tensor) -> candle_core::Result<Tensor> {
        let x = input.permute((0, 3, 1, 2))?;
        let x = self.conv1.forward(&x)?.relu()?.max_pool2d(2)?;
        let x = self.conv2.forward(&x)?.relu()?.max_pool2d(2)?;
        self.conv3.forward(&x)?.relu()
    }

    /// Classifier head over a conv activation map: pool, flatten, dense stack.
    /// Returns raw class scores of shape `(batch, units)`; no softmax.
    pub fn head_forward(&self, activation: &Tensor) -> candle_core::Result<Tensor> {
        let x = activation.max_pool2d(2)?.flatten_from(1)?;
        let x = self.fc1.forward(&x)?.relu()?;
        self.fc2.forward(&x)
    }

    /// Full forward pass producing raw class scores of shape `(batch, units)`.
    pub fn forward(&self, input: &Tensor) -> candle_core::Result<Tensor> {
        let features = self.features(input)?;
        self.head_forward(&features)
    }
}
