//! Image preprocessing: raw upload bytes to a normalized input tensor.

use crate::error::DecodeError;
use candle_core::{Device, Tensor};
use image::imageops::FilterType;
use image::ImageReader;
use std::io::Cursor;
use tracing::debug;

/// Canonical model input height in pixels.
pub const INPUT_HEIGHT: usize = 75;
/// Canonical model input width in pixels.
pub const INPUT_WIDTH: usize = 100;
/// Input channel count (RGB).
pub const INPUT_CHANNELS: usize = 3;

/// Converts uploaded image bytes into the fixed-shape tensor the model expects.
#[derive(Debug)]
pub struct Preprocessor {
    device: Device,
}

impl Preprocessor {
    pub fn new(device: Device) -> Self {
        Self { device }
    }

    /// Decode, resize to 100x75, and scale to `[0,1]`.
    ///
    /// Returns an NHWC tensor of shape `(1, 75, 100, 3)`. Decoding happens
    /// straight from the byte slice; no intermediate file is written, so
    /// there is nothing to leak on any exit path.
    pub fn preprocess(&self, bytes: &[u8]) -> Result<Tensor, DecodeError> {
        debug!(len = bytes.len(), "Decoding uploaded image");
        let img = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(image::ImageError::IoError)?
            .decode()?;

        let resized = img.resize_exact(
            INPUT_WIDTH as u32,
            INPUT_HEIGHT as u32,
            FilterType::Triangle,
        );
        let rgb = resized.to_rgb8();

        let data: Vec<f32> = rgb.into_raw().into_iter().map(|v| v as f32 / 255.0).collect();
        let tensor = Tensor::from_vec(
            data,
            (1, INPUT_HEIGHT, INPUT_WIDTH, INPUT_CHANNELS),
            &self.device,
        )?;
        Ok(tensor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::sample_image_bytes;

    #[test]
    fn test_preprocess_shape_and_range() {
        let preprocessor = Preprocessor::new(Device::Cpu);
        let tensor = preprocessor.preprocess(&sample_image_bytes()).unwrap();

        assert_eq!(tensor.dims(), &[1, INPUT_HEIGHT, INPUT_WIDTH, INPUT_CHANNELS]);

        let values: Vec<f32> = tensor.flatten_all().unwrap().to_vec1().unwrap();
        assert!(values.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_preprocess_resizes_any_input_size() {
        let small = image::RgbImage::from_pixel(8, 8, image::Rgb([200, 10, 10]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(small)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let preprocessor = Preprocessor::new(Device::Cpu);
        let tensor = preprocessor.preprocess(&bytes).unwrap();
        assert_eq!(tensor.dims(), &[1, INPUT_HEIGHT, INPUT_WIDTH, INPUT_CHANNELS]);
    }

    #[test]
    fn test_preprocess_rejects_garbage_bytes() {
        let preprocessor = Preprocessor::new(Device::Cpu);
        let err = preprocessor.preprocess(b"definitely not an image").unwrap_err();
        assert!(matches!(err, DecodeError::Image(_)));
    }
}
