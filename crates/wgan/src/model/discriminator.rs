use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Dropout, DropoutConfig, Initializer, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{leaky_relu, sigmoid};

use crate::model::batch_norm::{BatchNorm2d, BatchNorm2dConfig, NormMode};
use crate::model::{LayerSummary, IMAGE_CHANNELS, IMAGE_SIZE};

/// Per-stage kernel size and stride. The first stage uses valid padding,
/// every later stage uses "same" padding.
const STAGES: [(usize, usize); 5] = [(3, 2), (3, 2), (3, 2), (3, 1), (2, 1)];

/// Configuration for the Discriminator (critic).
///
/// ```text
/// (batch, 1, 28, 28)
///   → Conv 3×3/2 valid  → LeakyReLU → Dropout                  (13×13)
///   → Conv 3×3/2 same   → BatchNorm → LeakyReLU → Dropout      (7×7)
///   → Conv 3×3/2 same   → BatchNorm → LeakyReLU → Dropout      (4×4)
///   → Conv 3×3/1 same   → BatchNorm → LeakyReLU → Dropout      (4×4)
///   → Conv 2×2/1 same   → BatchNorm → LeakyReLU → Dropout      (4×4)
///   → flatten → Linear(→1) → [sigmoid]
///   → scores: (batch,)
/// ```
#[derive(Config, Debug)]
pub struct DiscriminatorConfig {
    /// Output channels of the five convolution stages.
    #[config(default = "[16, 32, 64, 128, 256]")]
    pub channels: [usize; 5],
    /// Dropout probability after each stage.
    #[config(default = "[0.2, 0.3, 0.4, 0.3, 0.3]")]
    pub dropout: [f64; 5],
    /// Slope of LeakyReLU for negative inputs.
    #[config(default = 0.2)]
    pub negative_slope: f64,
    /// Running-statistics momentum of the batch normalization layers.
    #[config(default = 0.8)]
    pub norm_momentum: f64,
    /// Squash the score through a sigmoid. When false the critic output is
    /// an unbounded linear score.
    #[config(default = true)]
    pub sigmoid_output: bool,
}

/// Total and split padding for TensorFlow-style "same" convolutions.
///
/// Returns `(before, after)`; when the total is odd the extra pixel goes
/// after, so a 2×2 kernel at stride 1 pads by `(0, 1)`.
pub fn same_padding(size: usize, kernel: usize, stride: usize) -> (usize, usize) {
    let out = size.div_ceil(stride);
    let needed = (out.saturating_sub(1) * stride + kernel).saturating_sub(size);
    (needed / 2, needed - needed / 2)
}

/// Spatial size after a convolution stage.
fn stage_output_size(size: usize, kernel: usize, stride: usize, same: bool) -> usize {
    if same {
        size.div_ceil(stride)
    } else {
        (size - kernel) / stride + 1
    }
}

/// Convolution → optional BatchNorm → LeakyReLU → Dropout.
#[derive(Module, Debug)]
pub struct CriticBlock<B: Backend> {
    conv: Conv2d<B>,
    norm: Option<BatchNorm2d<B>>,
    dropout: Dropout,
    kernel: usize,
    stride: usize,
    same: bool,
    negative_slope: f64,
}

impl<B: Backend> CriticBlock<B> {
    fn forward(&self, input: Tensor<B, 4>, mode: NormMode) -> Tensor<B, 4> {
        let x = if self.same {
            let [batch, channels, height, width] = input.dims();
            let (top, bottom) = same_padding(height, self.kernel, self.stride);
            let (left, right) = same_padding(width, self.kernel, self.stride);
            Tensor::zeros(
                [batch, channels, height + top + bottom, width + left + right],
                &input.device(),
            )
            .slice_assign(
                [0..batch, 0..channels, top..top + height, left..left + width],
                input,
            )
        } else {
            input
        };

        let mut x = self.conv.forward(x);
        if let Some(norm) = &self.norm {
            x = norm.forward_mode(x, mode);
        }
        let x = leaky_relu(x, self.negative_slope);
        self.dropout.forward(x)
    }
}

/// Discriminator (critic): scores images, higher means "more real".
#[derive(Module, Debug)]
pub struct Discriminator<B: Backend> {
    blocks: Vec<CriticBlock<B>>,
    /// Flattened features → single score.
    output: Linear<B>,
    sigmoid_output: bool,
}

impl DiscriminatorConfig {
    /// Initialize a Discriminator with the given configuration.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Discriminator<B> {
        let mut in_channels = IMAGE_CHANNELS;
        let mut size = IMAGE_SIZE;
        let mut blocks = Vec::with_capacity(STAGES.len());

        for (i, &(kernel, stride)) in STAGES.iter().enumerate() {
            let out_channels = self.channels[i];
            let same = i > 0;
            let norm = same.then(|| {
                BatchNorm2dConfig::new(out_channels)
                    .with_momentum(self.norm_momentum)
                    .init(device)
            });

            blocks.push(CriticBlock {
                conv: Conv2dConfig::new([in_channels, out_channels], [kernel, kernel])
                    .with_stride([stride, stride])
                    .with_initializer(Initializer::XavierUniform { gain: 1.0 })
                    .init(device),
                norm,
                dropout: DropoutConfig::new(self.dropout[i]).init(),
                kernel,
                stride,
                same,
                negative_slope: self.negative_slope,
            });

            in_channels = out_channels;
            size = stage_output_size(size, kernel, stride, same);
        }

        let output = LinearConfig::new(in_channels * size * size, 1)
            .with_initializer(Initializer::XavierUniform { gain: 1.0 })
            .init(device);

        Discriminator {
            blocks,
            output,
            sigmoid_output: self.sigmoid_output,
        }
    }
}

impl<B: Backend> Discriminator<B> {
    /// Forward pass: one score per image.
    ///
    /// Input shape: `(batch, 1, 28, 28)`
    /// Output shape: `(batch,)`
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 1> {
        self.forward_with(images, NormMode::for_backend::<B>())
    }

    /// Training-mode forward that leaves the running statistics alone.
    ///
    /// Dropout stays active and normalization uses batch statistics.
    pub fn forward_frozen(&self, images: Tensor<B, 4>) -> Tensor<B, 1> {
        self.forward_with(images, NormMode::Frozen)
    }

    fn forward_with(&self, images: Tensor<B, 4>, mode: NormMode) -> Tensor<B, 1> {
        let mut x = images;
        for block in &self.blocks {
            x = block.forward(x, mode);
        }

        let features: Tensor<B, 2> = x.flatten(1, 3);
        let scores: Tensor<B, 1> = self.output.forward(features).squeeze::<1>(1);
        if self.sigmoid_output {
            sigmoid(scores)
        } else {
            scores
        }
    }

    /// Per-layer output shapes (without the batch axis) and parameter counts.
    pub fn summary(&self) -> Vec<LayerSummary> {
        let mut size = IMAGE_SIZE;
        let mut layers = Vec::with_capacity(self.blocks.len() + 1);

        for (i, block) in self.blocks.iter().enumerate() {
            size = stage_output_size(size, block.kernel, block.stride, block.same);
            let [out_channels, _, _, _] = block.conv.weight.val().dims();
            let padding = if block.same { "same" } else { "valid" };
            layers.push(LayerSummary {
                name: format!(
                    "conv{} {k}x{k}/{s} {padding}{}",
                    i + 1,
                    if block.norm.is_some() { " +bn" } else { "" },
                    k = block.kernel,
                    s = block.stride,
                ),
                output_shape: vec![out_channels, size, size],
                params: block.num_params(),
            });
        }

        layers.push(LayerSummary {
            name: if self.sigmoid_output {
                "dense sigmoid".to_string()
            } else {
                "dense linear".to_string()
            },
            output_shape: vec![1],
            params: self.output.num_params(),
        });
        layers
    }
}
