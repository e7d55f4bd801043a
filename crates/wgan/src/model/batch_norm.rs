use burn::module::{Param, RunningState};
use burn::prelude::*;

/// Configuration for a batch normalization layer over `(batch, channels, h, w)`.
#[derive(Config, Debug)]
pub struct BatchNorm2dConfig {
    /// Number of channels (dimension 1 of the input).
    pub num_features: usize,
    /// Weight kept on the previous running statistic at each update:
    /// `running = momentum * running + (1 - momentum) * batch_statistic`.
    #[config(default = 0.8)]
    pub momentum: f64,
    /// Added to the variance before the square root.
    #[config(default = 1e-3)]
    pub epsilon: f64,
}

/// How a forward pass treats the running statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormMode {
    /// Normalize with batch statistics and fold them into the running ones.
    Train,
    /// Normalize with batch statistics, leave the running ones untouched.
    /// Used when the layer sits inside a frozen network.
    Frozen,
    /// Normalize with the running statistics.
    Inference,
}

impl NormMode {
    /// `Train` on an autodiff backend, `Inference` otherwise.
    pub fn for_backend<B: Backend>() -> Self {
        if B::ad_enabled() {
            Self::Train
        } else {
            Self::Inference
        }
    }
}

/// Batch normalization with momentum-smoothed running mean and variance.
///
/// Unlike `burn::nn::BatchNorm`, the forward pass can run on batch statistics
/// without updating the running ones ([`NormMode::Frozen`]), which the
/// composite model needs to keep the critic's state fixed while gradients
/// flow through it.
#[derive(Module, Debug)]
pub struct BatchNorm2d<B: Backend> {
    /// Per-channel scale, initialized to 1.
    gamma: Param<Tensor<B, 1>>,
    /// Per-channel shift, initialized to 0.
    beta: Param<Tensor<B, 1>>,
    running_mean: RunningState<Tensor<B, 1>>,
    running_var: RunningState<Tensor<B, 1>>,
    momentum: f64,
    epsilon: f64,
}

impl BatchNorm2dConfig {
    /// Initialize a BatchNorm2d layer.
    pub fn init<B: Backend>(&self, device: &B::Device) -> BatchNorm2d<B> {
        BatchNorm2d {
            gamma: Param::from_tensor(Tensor::ones([self.num_features], device)),
            beta: Param::from_tensor(Tensor::zeros([self.num_features], device)),
            running_mean: RunningState::new(Tensor::zeros([self.num_features], device)),
            running_var: RunningState::new(Tensor::ones([self.num_features], device)),
            momentum: self.momentum,
            epsilon: self.epsilon,
        }
    }
}

impl<B: Backend> BatchNorm2d<B> {
    /// Forward pass in the default mode for the backend.
    ///
    /// Input and output shape: `(batch, channels, height, width)`
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.forward_mode(input, NormMode::for_backend::<B>())
    }

    /// Forward pass with an explicit treatment of the running statistics.
    pub fn forward_mode(&self, input: Tensor<B, 4>, mode: NormMode) -> Tensor<B, 4> {
        let [_, channels, _, _] = input.dims();

        let (centered, var) = match mode {
            NormMode::Inference => {
                let mean = self.running_mean.value_sync().reshape([1, channels, 1, 1]);
                let var = self.running_var.value_sync().reshape([1, channels, 1, 1]);
                (input - mean, var)
            }
            NormMode::Train | NormMode::Frozen => {
                let mean = input.clone().mean_dim(0).mean_dim(2).mean_dim(3);
                let centered = input - mean.clone();
                let var = centered
                    .clone()
                    .powf_scalar(2.0)
                    .mean_dim(0)
                    .mean_dim(2)
                    .mean_dim(3);
                if mode == NormMode::Train {
                    self.update_running(mean, var.clone(), channels);
                }
                (centered, var)
            }
        };

        let normalized = centered / var.add_scalar(self.epsilon).sqrt();
        let gamma = self.gamma.val().reshape([1, channels, 1, 1]);
        let beta = self.beta.val().reshape([1, channels, 1, 1]);
        normalized * gamma + beta
    }

    /// Current running mean, shape `(channels,)`.
    pub fn running_mean(&self) -> Tensor<B, 1> {
        self.running_mean.value_sync()
    }

    /// Current running variance, shape `(channels,)`.
    pub fn running_var(&self) -> Tensor<B, 1> {
        self.running_var.value_sync()
    }

    fn update_running(&self, mean: Tensor<B, 4>, var: Tensor<B, 4>, channels: usize) {
        let mean = mean.detach().reshape([channels]);
        let var = var.detach().reshape([channels]);

        let running_mean = self.running_mean.value_sync().mul_scalar(self.momentum)
            + mean.mul_scalar(1.0 - self.momentum);
        let running_var = self.running_var.value_sync().mul_scalar(self.momentum)
            + var.mul_scalar(1.0 - self.momentum);

        self.running_mean.update(running_mean.detach());
        self.running_var.update(running_var.detach());
    }
}
