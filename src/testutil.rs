//! Shared fixtures for unit tests: synthetic weight maps, sample images,
//! and on-disk artifact setups.

use crate::config::{AppConfig, HeatmapConfig, LoggingConfig, ModelConfig};
use candle_core::{Device, Tensor};
use std::collections::HashMap;
use std::path::Path;

/// Class count of the synthetic test networks.
pub const TEST_UNITS: usize = 3;

// Small but real network: conv channels [2, 3, 4], hidden width 5.
// Flattened conv output for 75x100 input: 4 * 9 * 12 = 432.
const CONV_CHANNELS: [usize; 3] = [2, 3, 4];
const HIDDEN: usize = 5;
const FLATTENED: usize = 432;

fn full(value: f32, shape: &[usize]) -> Tensor {
    Tensor::full(value, shape, &Device::Cpu).unwrap()
}

fn weight_map(value: f32, units: usize) -> HashMap<String, Tensor> {
    let [c1, c2, c3] = CONV_CHANNELS;
    HashMap::from([
        ("conv1.weight".to_string(), full(value, &[c1, 3, 3, 3])),
        ("conv1.bias".to_string(), full(value, &[c1])),
        ("conv2.weight".to_string(), full(value, &[c2, c1, 3, 3])),
        ("conv2.bias".to_string(), full(value, &[c2])),
        ("conv3.weight".to_string(), full(value, &[c3, c2, 3, 3])),
        ("conv3.bias".to_string(), full(value, &[c3])),
        ("fc1.weight".to_string(), full(value, &[HIDDEN, FLATTENED])),
        ("fc1.bias".to_string(), full(value, &[HIDDEN])),
        ("fc2.weight".to_string(), full(value, &[units, HIDDEN])),
        ("fc2.bias".to_string(), full(value, &[units])),
    ])
}

/// All-zero weights except the fc2 bias, so the model's scores equal
/// `class_bias` for any input and gradients into the conv stack are zero.
pub fn biased_weights(class_bias: &[f32]) -> HashMap<String, Tensor> {
    let mut tensors = weight_map(0.0, class_bias.len());
    tensors.insert(
        "fc2.bias".to_string(),
        Tensor::from_vec(class_bias.to_vec(), (class_bias.len(),), &Device::Cpu).unwrap(),
    );
    tensors
}

/// Uniform small positive weights everywhere: activations and gradients
/// are strictly positive, giving a non-degenerate Grad-CAM map.
pub fn smooth_weights(units: usize) -> HashMap<String, Tensor> {
    weight_map(0.01, units)
}

/// A decodable PNG with a simple gradient pattern.
pub fn sample_image_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_fn(64, 48, |x, y| {
        image::Rgb([(x * 3) as u8, (y * 5) as u8, 128])
    });
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
    bytes
}

/// Save a weight map and label artifact under `dir` and return a config
/// pointing at them, with heatmaps also routed into `dir`.
pub fn write_fixtures(
    dir: &Path,
    tensors: &HashMap<String, Tensor>,
    labels: &[&str],
) -> AppConfig {
    let weights_path = dir.join("model.safetensors");
    candle_core::safetensors::save(tensors, &weights_path).unwrap();

    let labels_path = dir.join("classes.json");
    std::fs::write(&labels_path, serde_json::to_string_pretty(labels).unwrap()).unwrap();

    AppConfig {
        model: ModelConfig {
            weights_path,
            labels_path,
        },
        heatmap: HeatmapConfig {
            output_dir: Some(dir.to_path_buf()),
        },
        logging: LoggingConfig::default(),
    }
}
