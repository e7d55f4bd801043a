//! Real-image batches for critic training.
//!
//! Converts raw `u8` pixels from the `mnist` crate into a normalized
//! `(count, 1, 28, 28)` tensor once, then samples batches uniformly with
//! replacement.

use anyhow::ensure;
use burn::prelude::*;
use burn::tensor::TensorData;
use rand::Rng;

use mnist::Images;

use crate::model::{IMAGE_CHANNELS, IMAGE_SIZE};

/// Map a pixel in [0, 255] to [-1, 1].
pub fn normalize_pixel(pixel: u8) -> f32 {
    (pixel as f32 - 127.5) / 127.5
}

/// Normalized dataset images resident on the training device.
#[derive(Debug, Clone)]
pub struct ImageSet<B: Backend> {
    images: Tensor<B, 4>,
    count: usize,
}

impl<B: Backend> ImageSet<B> {
    /// Normalize `images` and add the channel axis.
    ///
    /// Fails when the set is empty, the images are not 28×28, or the pixel
    /// buffer disagrees with the image count.
    pub fn from_images(images: &Images, device: &B::Device) -> anyhow::Result<Self> {
        ensure!(!images.is_empty(), "image set is empty");
        ensure!(
            images.rows == IMAGE_SIZE && images.cols == IMAGE_SIZE,
            "expected {IMAGE_SIZE}x{IMAGE_SIZE} images, got {}x{}",
            images.rows,
            images.cols
        );
        ensure!(
            images.count.checked_mul(images.image_len()) == Some(images.pixels.len()),
            "pixel buffer holds {} bytes, expected {} images of {} pixels",
            images.pixels.len(),
            images.count,
            images.image_len()
        );

        let values: Vec<f32> = images.pixels.iter().map(|&p| normalize_pixel(p)).collect();
        let tensor = Tensor::<B, 4>::from_data(
            TensorData::new(values, [images.count, IMAGE_CHANNELS, IMAGE_SIZE, IMAGE_SIZE]),
            device,
        );

        tracing::debug!(count = images.count, "Loaded image set onto device");
        Ok(Self {
            images: tensor,
            count: images.count,
        })
    }

    /// Number of images.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Draw `batch_size` images uniformly at random, with replacement.
    ///
    /// Output shape: `(batch_size, 1, 28, 28)`
    pub fn sample_batch(&self, batch_size: usize, rng: &mut impl Rng) -> Tensor<B, 4> {
        let indices: Vec<i64> = (0..batch_size)
            .map(|_| rng.gen_range(0..self.count) as i64)
            .collect();
        let indices = Tensor::<B, 1, Int>::from_data(
            TensorData::new(indices, [batch_size]),
            &self.images.device(),
        );
        self.images.clone().select(0, indices)
    }
}
