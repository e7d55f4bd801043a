//! Composite generator → critic model for the generator's update.
//!
//! The critic inside the composite is a frozen view: gradient tracking is off
//! on all of its parameters, batch normalization runs on batch statistics
//! without touching the running ones, and dropout stays active. The composite
//! is consumed by [`AdversarialModel::adversarial_step`], so the freeze ends
//! with the step that needed it.

use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::model::discriminator::Discriminator;
use crate::model::generator::Generator;
use crate::training::loss::wasserstein_loss;

/// Generator followed by a frozen copy of the critic.
#[derive(Debug)]
pub struct AdversarialModel<B: AutodiffBackend> {
    generator: Generator<B>,
    critic: Discriminator<B>,
}

impl<B: AutodiffBackend> AdversarialModel<B> {
    /// Wrap the generator together with a frozen view of `discriminator`.
    ///
    /// The discriminator itself is not modified.
    pub fn compose(generator: Generator<B>, discriminator: &Discriminator<B>) -> Self {
        Self {
            generator,
            critic: discriminator.clone().no_grad(),
        }
    }

    /// Critic scores of freshly generated images, shape `(batch,)`.
    pub fn forward(&self, noise: Tensor<B, 2>) -> Tensor<B, 1> {
        self.critic.forward_frozen(self.generator.forward(noise))
    }

    /// One optimizer step on the generator's parameters only.
    ///
    /// Returns the updated generator and the scalar loss before the step.
    pub fn adversarial_step<O>(
        self,
        optimizer: &mut O,
        lr: f64,
        noise: Tensor<B, 2>,
        labels: Tensor<B, 1>,
    ) -> (Generator<B>, f64)
    where
        O: Optimizer<Generator<B>, B>,
    {
        let scores = self.forward(noise);
        let loss = wasserstein_loss(labels, scores);
        let loss_val: f64 = loss.clone().into_scalar().elem();

        let grads = GradientsParams::from_grads(loss.backward(), &self.generator);
        let generator = optimizer.step(lr, self.generator, grads);
        (generator, loss_val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use burn::backend::Autodiff;
    use burn::optim::AdamConfig;
    use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};

    use crate::model::discriminator::DiscriminatorConfig;
    use crate::model::generator::{sample_noise, GeneratorConfig};
    use crate::training::loss::Target;

    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    fn fingerprint<M: Module<TestAutodiffBackend>>(module: &M) -> Vec<u8> {
        let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
        Recorder::<TestAutodiffBackend>::record(&recorder, module.clone().into_record(), ())
            .expect("record module")
    }

    fn small_networks(
        device: &<TestAutodiffBackend as Backend>::Device,
    ) -> (Generator<TestAutodiffBackend>, Discriminator<TestAutodiffBackend>) {
        let generator = GeneratorConfig::new()
            .with_latent_dim(8)
            .with_seed_channels(4)
            .with_stage_channels([6, 4, 4])
            .init(device);
        let discriminator = DiscriminatorConfig::new()
            .with_channels([2, 3, 4, 4, 4])
            .init(device);
        (generator, discriminator)
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let (generator, discriminator) = small_networks(&device);
        let model = AdversarialModel::compose(generator, &discriminator);

        let scores = model.forward(sample_noise(5, 8, &device));
        assert_eq!(scores.dims(), [5]);
    }

    #[test]
    fn test_step_updates_generator_only() {
        let device = Default::default();
        let (generator, discriminator) = small_networks(&device);
        let mut optimizer = AdamConfig::new()
            .with_beta_1(0.5)
            .with_beta_2(0.9)
            .init::<TestAutodiffBackend, Generator<TestAutodiffBackend>>();

        let critic_before = fingerprint(&discriminator);
        let generator_before = fingerprint(&generator);

        let model = AdversarialModel::compose(generator, &discriminator);
        let (generator, loss) = model.adversarial_step(
            &mut optimizer,
            1e-3,
            sample_noise(4, 8, &device),
            Target::Real.labels(4, &device),
        );

        assert!(loss.is_finite(), "generator loss should be finite, got {loss}");
        assert_eq!(
            fingerprint(&discriminator),
            critic_before,
            "discriminator state changed during the generator update"
        );
        assert_ne!(
            fingerprint(&generator),
            generator_before,
            "generator state did not change after its update"
        );
    }

    #[test]
    fn test_critic_stays_trainable_after_step() {
        let device = Default::default();
        let (generator, discriminator) = small_networks(&device);
        let mut optimizer = AdamConfig::new().init::<TestAutodiffBackend, Generator<TestAutodiffBackend>>();

        let model = AdversarialModel::compose(generator, &discriminator);
        let _ = model.adversarial_step(
            &mut optimizer,
            1e-3,
            sample_noise(2, 8, &device),
            Target::Real.labels(2, &device),
        );

        // The discriminator passed to compose still produces gradients for its own step.
        let images = Tensor::<TestAutodiffBackend, 4>::ones([2, 1, 28, 28], &device);
        let loss = wasserstein_loss(Target::Real.labels(2, &device), discriminator.forward(images));
        let grads = GradientsParams::from_grads(loss.backward(), &discriminator);
        assert!(!grads.is_empty(), "discriminator parameters lost gradient tracking");
    }
}
