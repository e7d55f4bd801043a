use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{relu, tanh};
use burn::tensor::module::interpolate;
use burn::tensor::ops::{InterpolateMode, InterpolateOptions};
use burn::tensor::Distribution;

use crate::model::batch_norm::{BatchNorm2d, BatchNorm2dConfig};
use crate::model::{LayerSummary, IMAGE_CHANNELS, IMAGE_SIZE};

/// Side of the feature map the latent vector is projected to.
const SEED_SIZE: usize = 7;

/// Kernel sizes of the three upsample + convolve stages (valid padding).
///
/// 7 → 14 → 10 → 20 → 16 → 32 → 29, then the output convolution brings
/// 29 → 28.
const STAGE_KERNELS: [usize; 3] = [5, 5, 4];

/// Kernel size of the final single-channel convolution.
const OUTPUT_KERNEL: usize = 2;

/// Configuration for the Generator.
///
/// ```text
/// (batch, latent_dim)
///   → Linear(latent_dim → seed_channels·7·7) → ReLU → reshape (seed_channels, 7, 7)
///   → [Upsample×2 → Conv k×k valid → BatchNorm → ReLU] × 3
///   → Conv 2×2 valid → tanh
///   → images: (batch, 1, 28, 28) in [-1, 1]
/// ```
#[derive(Config, Debug)]
pub struct GeneratorConfig {
    /// Length of the latent noise vector.
    #[config(default = 100)]
    pub latent_dim: usize,
    /// Channels of the 7×7 map produced by the dense projection.
    #[config(default = 64)]
    pub seed_channels: usize,
    /// Output channels of the three upsample + convolve stages.
    #[config(default = "[256, 128, 64]")]
    pub stage_channels: [usize; 3],
    /// Running-statistics momentum of the batch normalization layers.
    #[config(default = 0.8)]
    pub norm_momentum: f64,
}

/// Nearest-neighbour doubling followed by a learned convolution.
///
/// Upsampling before convolving avoids the checkerboard pattern that strided
/// transposed convolutions leave in generated images.
#[derive(Module, Debug)]
pub struct UpsampleConv<B: Backend> {
    conv: Conv2d<B>,
    norm: BatchNorm2d<B>,
}

impl<B: Backend> UpsampleConv<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, _, height, width] = input.dims();
        let x = interpolate(
            input,
            [height * 2, width * 2],
            InterpolateOptions::new(InterpolateMode::Nearest),
        );
        let x = self.conv.forward(x);
        relu(self.norm.forward(x))
    }
}

/// Generator: maps latent noise to synthetic digit images.
///
/// Has no dropout. On a non-autodiff backend (see `AutodiffModule::valid`)
/// batch normalization uses its running statistics, so the mapping from noise
/// to image is deterministic for fixed parameters.
#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    /// Dense projection: latent_dim → seed_channels·7·7.
    project: Linear<B>,
    /// Upsample + convolve stages.
    stages: Vec<UpsampleConv<B>>,
    /// Final convolution down to a single channel.
    output: Conv2d<B>,
    seed_channels: usize,
    latent_dim: usize,
}

fn xavier() -> Initializer {
    Initializer::XavierUniform { gain: 1.0 }
}

impl GeneratorConfig {
    /// Initialize a Generator with the given configuration.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Generator<B> {
        let project = LinearConfig::new(
            self.latent_dim,
            self.seed_channels * SEED_SIZE * SEED_SIZE,
        )
        .with_initializer(xavier())
        .init(device);

        let mut in_channels = self.seed_channels;
        let mut stages = Vec::with_capacity(STAGE_KERNELS.len());
        for (&out_channels, &kernel) in self.stage_channels.iter().zip(STAGE_KERNELS.iter()) {
            stages.push(UpsampleConv {
                conv: Conv2dConfig::new([in_channels, out_channels], [kernel, kernel])
                    .with_initializer(xavier())
                    .init(device),
                norm: BatchNorm2dConfig::new(out_channels)
                    .with_momentum(self.norm_momentum)
                    .init(device),
            });
            in_channels = out_channels;
        }

        let output = Conv2dConfig::new(
            [in_channels, IMAGE_CHANNELS],
            [OUTPUT_KERNEL, OUTPUT_KERNEL],
        )
        .with_initializer(xavier())
        .init(device);

        Generator {
            project,
            stages,
            output,
            seed_channels: self.seed_channels,
            latent_dim: self.latent_dim,
        }
    }
}

impl<B: Backend> Generator<B> {
    /// Forward pass: maps latent noise to images.
    ///
    /// Input shape: `(batch, latent_dim)`
    /// Output shape: `(batch, 1, 28, 28)`, values in `[-1, 1]`
    pub fn forward(&self, noise: Tensor<B, 2>) -> Tensor<B, 4> {
        let [batch, _] = noise.dims();

        let x = relu(self.project.forward(noise));
        let mut x = x.reshape([batch, self.seed_channels, SEED_SIZE, SEED_SIZE]);

        for stage in &self.stages {
            x = stage.forward(x);
        }

        let images = tanh(self.output.forward(x));
        debug_assert_eq!(images.dims(), [batch, IMAGE_CHANNELS, IMAGE_SIZE, IMAGE_SIZE]);
        images
    }

    /// Length of the latent vector this generator consumes.
    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    /// Per-layer output shapes (without the batch axis) and parameter counts.
    pub fn summary(&self) -> Vec<LayerSummary> {
        let mut layers = Vec::with_capacity(self.stages.len() + 2);
        layers.push(LayerSummary {
            name: "dense relu".to_string(),
            output_shape: vec![self.seed_channels, SEED_SIZE, SEED_SIZE],
            params: self.project.num_params(),
        });

        let mut size = SEED_SIZE;
        for (i, stage) in self.stages.iter().enumerate() {
            let [out_channels, _, kernel, _] = stage.conv.weight.val().dims();
            size = size * 2 - kernel + 1;
            layers.push(LayerSummary {
                name: format!("up2 conv{} {kernel}x{kernel} +bn relu", i + 1),
                output_shape: vec![out_channels, size, size],
                params: stage.num_params(),
            });
        }

        layers.push(LayerSummary {
            name: format!("conv {OUTPUT_KERNEL}x{OUTPUT_KERNEL} tanh"),
            output_shape: vec![IMAGE_CHANNELS, size - OUTPUT_KERNEL + 1, size - OUTPUT_KERNEL + 1],
            params: self.output.num_params(),
        });
        layers
    }
}

/// Sample a batch of latent vectors from the standard normal distribution.
pub fn sample_noise<B: Backend>(batch_size: usize, latent_dim: usize, device: &B::Device) -> Tensor<B, 2> {
    Tensor::random([batch_size, latent_dim], Distribution::Normal(0.0, 1.0), device)
}
