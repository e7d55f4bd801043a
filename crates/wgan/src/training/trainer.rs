//! WGAN training loop with one Adam optimizer per network.
//!
//! Each epoch runs `discriminator_iterations` critic updates (a real batch and
//! a fake batch, stepped separately) followed by one generator update through
//! the frozen-critic composite. Sample grids go to a [`SampleSink`] every
//! `save_interval` epochs; the loss history goes to a [`LossPlotSink`] at the
//! end.

use std::time::Instant;

use anyhow::ensure;
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::model::adversarial::AdversarialModel;
use crate::model::discriminator::{Discriminator, DiscriminatorConfig};
use crate::model::generator::{sample_noise, Generator, GeneratorConfig};
use crate::report::grid::{DisplayRescale, ImageGrid, GRID_IMAGES};
use crate::report::sink::{LossPlotSink, SampleSink};
use crate::report::{epoch_progress, format_eta};
use crate::training::data::ImageSet;
use crate::training::history::{EpochLosses, LossHistory};
use crate::training::loss::{wasserstein_loss, Target};

/// Configuration for WGAN training.
#[derive(Config, Debug)]
pub struct WganTrainingConfig {
    /// Generator architecture (latent size, channel widths).
    pub generator: GeneratorConfig,
    /// Critic architecture.
    pub discriminator: DiscriminatorConfig,
    /// Number of epochs. One epoch is one generator update.
    #[config(default = 10_001)]
    pub epochs: usize,
    /// Images per critic batch and per generator batch.
    #[config(default = 100)]
    pub batch_size: usize,
    /// Epochs between sample grids.
    #[config(default = 50)]
    pub save_interval: usize,
    /// Critic updates per generator update.
    #[config(default = 5)]
    pub discriminator_iterations: usize,
    /// Learning rate of both Adam optimizers.
    #[config(default = 1e-4)]
    pub lr: f64,
    #[config(default = 0.5)]
    pub beta_1: f32,
    #[config(default = 0.9)]
    pub beta_2: f32,
    #[config(default = 1e-8)]
    pub epsilon: f32,
    /// Epochs between info-level loss logs. 0 disables them.
    #[config(default = 100)]
    pub log_interval: usize,
    /// Seeds the tensor backend and batch sampling when set.
    pub seed: Option<u64>,
    /// Mapping from generator output to grid pixel values.
    #[config(default = "DisplayRescale::Unit")]
    pub display_rescale: DisplayRescale,
    /// Draw a progress bar on the terminal.
    #[config(default = true)]
    pub show_progress: bool,
}

impl WganTrainingConfig {
    /// Reject settings the training loop cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.epochs > 0, "epochs must be at least 1");
        ensure!(self.batch_size > 0, "batch_size must be at least 1");
        ensure!(self.save_interval > 0, "save_interval must be at least 1");
        ensure!(
            self.discriminator_iterations > 0,
            "discriminator_iterations must be at least 1"
        );
        ensure!(
            self.lr.is_finite() && self.lr > 0.0,
            "lr must be positive, got {}",
            self.lr
        );
        ensure!(self.generator.latent_dim > 0, "latent_dim must be at least 1");
        for (i, p) in self.discriminator.dropout.iter().enumerate() {
            ensure!(
                (0.0..1.0).contains(p),
                "discriminator dropout[{i}] must be in [0, 1), got {p}"
            );
        }
        Ok(())
    }

    /// Seed the backend, build both networks and their Adam optimizers.
    pub fn init<B: AutodiffBackend>(
        &self,
        device: &B::Device,
    ) -> anyhow::Result<
        WganTrainer<B, impl Optimizer<Discriminator<B>, B>, impl Optimizer<Generator<B>, B>>,
    > {
        self.validate()?;
        if let Some(seed) = self.seed {
            B::seed(seed);
        }

        let generator = self.generator.init::<B>(device);
        let discriminator = self.discriminator.init::<B>(device);

        let adam = AdamConfig::new()
            .with_beta_1(self.beta_1)
            .with_beta_2(self.beta_2)
            .with_epsilon(self.epsilon);
        let critic_optimizer = adam.init::<B, Discriminator<B>>();
        let generator_optimizer = adam.init::<B, Generator<B>>();

        tracing::info!(
            generator_params = generator.num_params(),
            discriminator_params = discriminator.num_params(),
            lr = self.lr,
            beta_1 = self.beta_1,
            beta_2 = self.beta_2,
            "Initialized WGAN networks"
        );

        WganTrainer::new(
            self.clone(),
            generator,
            discriminator,
            critic_optimizer,
            generator_optimizer,
            device.clone(),
        )
    }
}

/// Owns both networks, their optimizers and the loss history.
pub struct WganTrainer<B: AutodiffBackend, OD, OG> {
    config: WganTrainingConfig,
    generator: Generator<B>,
    discriminator: Discriminator<B>,
    critic_optimizer: OD,
    generator_optimizer: OG,
    rng: StdRng,
    device: B::Device,
    history: LossHistory,
}

impl<B, OD, OG> WganTrainer<B, OD, OG>
where
    B: AutodiffBackend,
    OD: Optimizer<Discriminator<B>, B>,
    OG: Optimizer<Generator<B>, B>,
{
    pub fn new(
        config: WganTrainingConfig,
        generator: Generator<B>,
        discriminator: Discriminator<B>,
        critic_optimizer: OD,
        generator_optimizer: OG,
        device: B::Device,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            generator,
            discriminator,
            critic_optimizer,
            generator_optimizer,
            rng,
            device,
            history: LossHistory::new(),
        })
    }

    pub fn config(&self) -> &WganTrainingConfig {
        &self.config
    }

    pub fn generator(&self) -> &Generator<B> {
        &self.generator
    }

    pub fn discriminator(&self) -> &Discriminator<B> {
        &self.discriminator
    }

    pub fn history(&self) -> &LossHistory {
        &self.history
    }

    /// Generate images with the generator in inference mode.
    ///
    /// Runs on the inner backend: no gradient graph, batch normalization on
    /// running statistics, generator state untouched.
    pub fn generate(&self, noise: Tensor<B::InnerBackend, 2>) -> Tensor<B::InnerBackend, 4> {
        self.generator.valid().forward(noise)
    }

    /// One critic optimizer step on a single-provenance batch.
    pub fn critic_step(&mut self, images: Tensor<B, 4>, target: Target) -> f64 {
        let [batch, _, _, _] = images.dims();
        let scores = self.discriminator.forward(images);
        let loss = wasserstein_loss(target.labels(batch, &self.device), scores);
        let loss_val: f64 = loss.clone().into_scalar().elem();

        let grads = GradientsParams::from_grads(loss.backward(), &self.discriminator);
        self.discriminator = self
            .critic_optimizer
            .step(self.config.lr, self.discriminator.clone(), grads);
        loss_val
    }

    /// One critic iteration: a real step and a fake step.
    ///
    /// Returns `real_loss + fake_loss` and the latent batch behind the fakes.
    fn critic_iteration(&mut self, data: &ImageSet<B>) -> (f64, Tensor<B, 2>) {
        let batch_size = self.config.batch_size;
        let real = data.sample_batch(batch_size, &mut self.rng);
        let noise = sample_noise::<B>(batch_size, self.generator.latent_dim(), &self.device);
        let fake = Tensor::<B, 4>::from_inner(self.generate(noise.clone().inner()));

        let real_loss = self.critic_step(real, Target::Real);
        let fake_loss = self.critic_step(fake, Target::Fake);
        (real_loss + fake_loss, noise)
    }

    /// `discriminator_iterations` critic iterations.
    ///
    /// Only the last iteration's loss and latent batch are returned.
    pub fn critic_phase(&mut self, data: &ImageSet<B>) -> (f64, Tensor<B, 2>) {
        let mut last = self.critic_iteration(data);
        for _ in 1..self.config.discriminator_iterations {
            last = self.critic_iteration(data);
        }
        last
    }

    /// One generator update through the frozen critic, target +1.
    pub fn generator_step(&mut self, noise: Tensor<B, 2>) -> f64 {
        let [batch, _] = noise.dims();
        let labels = Target::Real.labels(batch, &self.device);
        let composite = AdversarialModel::compose(self.generator.clone(), &self.discriminator);
        let (generator, loss) =
            composite.adversarial_step(&mut self.generator_optimizer, self.config.lr, noise, labels);
        self.generator = generator;
        loss
    }

    /// Critic phase, generator update, history append.
    pub fn train_epoch(&mut self, data: &ImageSet<B>) -> EpochLosses {
        let (critic, noise) = self.critic_phase(data);
        let generator = self.generator_step(noise);
        let losses = EpochLosses { critic, generator };
        self.history.push(losses);
        losses
    }

    /// A 5×5 grid from fresh latent vectors, in display range.
    pub fn sample_grid(&self) -> anyhow::Result<ImageGrid> {
        let noise = sample_noise::<B::InnerBackend>(
            GRID_IMAGES,
            self.generator.latent_dim(),
            &self.device,
        );
        ImageGrid::from_tensor(self.generate(noise), self.config.display_rescale)
    }

    fn save_samples(&self, epoch: usize, samples: &mut dyn SampleSink) -> anyhow::Result<()> {
        let grid = self.sample_grid()?;
        samples.save(epoch, &grid)
    }

    /// Run the configured number of epochs.
    ///
    /// Sink failures end the run. Non-finite losses are only logged.
    pub fn fit(
        &mut self,
        data: &ImageSet<B>,
        samples: &mut dyn SampleSink,
        plot: &mut dyn LossPlotSink,
    ) -> anyhow::Result<()> {
        let epochs = self.config.epochs;
        let save_interval = self.config.save_interval;
        let log_interval = self.config.log_interval;

        tracing::info!(
            epochs,
            batch_size = self.config.batch_size,
            save_interval,
            discriminator_iterations = self.config.discriminator_iterations,
            images = data.len(),
            display_rescale = %self.config.display_rescale,
            "Starting WGAN training"
        );

        let pb = epoch_progress(epochs as u64, self.config.show_progress);
        let start = Instant::now();
        let mut non_finite = 0usize;

        for epoch in 0..epochs {
            let losses = self.train_epoch(data);

            if !losses.is_finite() {
                non_finite += 1;
                tracing::warn!(
                    epoch,
                    critic_loss = losses.critic,
                    generator_loss = losses.generator,
                    "Non-finite loss"
                );
            }
            tracing::debug!(
                epoch,
                critic_loss = losses.critic,
                generator_loss = losses.generator,
                "Epoch finished"
            );

            if log_interval > 0 && epoch % log_interval == 0 {
                let elapsed = start.elapsed().as_secs_f64();
                let remaining = elapsed * (epochs - epoch - 1) as f64 / (epoch + 1) as f64;
                tracing::info!(
                    epoch,
                    critic_loss = losses.critic,
                    generator_loss = losses.generator,
                    eta = format_eta(remaining),
                    "Training progress"
                );
            }

            if epoch % save_interval == 0 {
                self.save_samples(epoch, samples)?;
            }

            pb.set_message(format!("d={:.4} g={:.4}", losses.critic, losses.generator));
            pb.inc(1);
        }

        // A run of k·save_interval epochs also gets a grid for its end state.
        if epochs % save_interval == 0 {
            self.save_samples(epochs, samples)?;
        }
        pb.finish_and_clear();

        let last = self.history.last();
        tracing::info!(
            epochs,
            non_finite,
            final_critic_loss = ?last.map(|l| l.critic),
            final_generator_loss = ?last.map(|l| l.generator),
            elapsed_secs = format!("{:.1}", start.elapsed().as_secs_f64()),
            "Training complete"
        );

        plot.plot(&self.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use burn::backend::Autodiff;
    use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};
    use mnist::Images;

    use crate::report::sink::RecordingSink;

    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    fn fingerprint<M: Module<TestAutodiffBackend>>(module: &M) -> Vec<u8> {
        let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
        Recorder::<TestAutodiffBackend>::record(&recorder, module.clone().into_record(), ())
            .expect("record module")
    }

    /// Striped digits-like images: image i has bright rows where `(row + i) % 4 == 0`.
    fn synthetic_images(count: usize) -> ImageSet<TestAutodiffBackend> {
        let mut pixels = Vec::with_capacity(count * 28 * 28);
        for i in 0..count {
            for row in 0..28 {
                let value = if (row + i) % 4 == 0 { 255 } else { 0 };
                pixels.extend(std::iter::repeat(value).take(28));
            }
        }
        let images = Images::new(count, 28, 28, pixels).unwrap();
        ImageSet::from_images(&images, &Default::default()).unwrap()
    }

    fn tiny_config(latent_dim: usize) -> WganTrainingConfig {
        WganTrainingConfig::new(
            GeneratorConfig::new()
                .with_latent_dim(latent_dim)
                .with_seed_channels(2)
                .with_stage_channels([4, 4, 2]),
            DiscriminatorConfig::new().with_channels([2, 2, 2, 2, 2]),
        )
        .with_show_progress(false)
        .with_seed(Some(42))
    }

    #[test]
    fn test_defaults() {
        let config = WganTrainingConfig::new(GeneratorConfig::new(), DiscriminatorConfig::new());
        assert_eq!(config.epochs, 10_001);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.save_interval, 50);
        assert_eq!(config.discriminator_iterations, 5);
        assert_eq!(config.lr, 1e-4);
        assert_eq!(config.beta_1, 0.5);
        assert_eq!(config.beta_2, 0.9);
        assert_eq!(config.seed, None);
        assert_eq!(config.display_rescale, DisplayRescale::Unit);
        assert_eq!(config.generator.latent_dim, 100);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_settings() {
        let base = tiny_config(8);
        let cases = [
            (base.clone().with_epochs(0), "epochs"),
            (base.clone().with_batch_size(0), "batch_size"),
            (base.clone().with_save_interval(0), "save_interval"),
            (base.clone().with_discriminator_iterations(0), "discriminator_iterations"),
            (base.clone().with_lr(0.0), "lr"),
        ];
        for (config, field) in cases {
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains(field), "{field}: unexpected error {err}");
        }

        let mut bad_dropout = base;
        bad_dropout.discriminator =
            DiscriminatorConfig::new().with_dropout([0.2, 1.0, 0.4, 0.3, 0.3]);
        assert!(bad_dropout.validate().is_err());
    }

    #[test]
    fn test_critic_phase_leaves_generator_identical() {
        let device = Default::default();
        let data = synthetic_images(6);
        let mut trainer = tiny_config(8)
            .with_batch_size(3)
            .init::<TestAutodiffBackend>(&device)
            .unwrap();

        let generator_before = fingerprint(trainer.generator());
        let critic_before = fingerprint(trainer.discriminator());

        let (loss, noise) = trainer.critic_phase(&data);

        assert!(loss.is_finite());
        assert_eq!(noise.dims(), [3, 8]);
        assert_eq!(
            fingerprint(trainer.generator()),
            generator_before,
            "critic updates must not touch the generator"
        );
        assert_ne!(
            fingerprint(trainer.discriminator()),
            critic_before,
            "critic updates should change the critic"
        );
    }

    #[test]
    fn test_generator_step_leaves_critic_identical() {
        let device = Default::default();
        let mut trainer = tiny_config(8).init::<TestAutodiffBackend>(&device).unwrap();

        let critic_before = fingerprint(trainer.discriminator());
        let generator_before = fingerprint(trainer.generator());

        let noise = sample_noise::<TestAutodiffBackend>(4, 8, &device);
        let loss = trainer.generator_step(noise);

        assert!(loss.is_finite());
        assert_eq!(fingerprint(trainer.discriminator()), critic_before);
        assert_ne!(fingerprint(trainer.generator()), generator_before);
    }

    #[test]
    fn test_single_epoch_records_one_finite_entry() {
        let device = Default::default();
        let data = synthetic_images(10);
        let config = WganTrainingConfig::new(
            GeneratorConfig::new()
                .with_seed_channels(4)
                .with_stage_channels([4, 4, 4]),
            DiscriminatorConfig::new().with_channels([4, 4, 4, 4, 4]),
        )
        .with_epochs(1)
        .with_show_progress(false)
        .with_seed(Some(7));
        assert_eq!(config.generator.latent_dim, 100);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.discriminator_iterations, 5);

        let mut trainer = config.init::<TestAutodiffBackend>(&device).unwrap();
        let mut samples = RecordingSink::new();
        let mut plots = RecordingSink::new();
        trainer.fit(&data, &mut samples, &mut plots).unwrap();

        let history = trainer.history();
        assert_eq!(history.critic.len(), 1);
        assert_eq!(history.generator.len(), 1);
        assert!(history.critic[0].is_finite());
        assert!(history.generator[0].is_finite());

        assert_eq!(samples.epochs(), vec![0]);
        assert_eq!(plots.histories, vec![history.clone()]);
    }

    #[test]
    fn test_grid_schedule_over_three_intervals() {
        let device = Default::default();
        let data = synthetic_images(4);
        let mut trainer = tiny_config(4)
            .with_epochs(150)
            .with_save_interval(50)
            .with_batch_size(2)
            .with_discriminator_iterations(1)
            .init::<TestAutodiffBackend>(&device)
            .unwrap();

        let mut samples = RecordingSink::new();
        let mut plots = RecordingSink::new();
        trainer.fit(&data, &mut samples, &mut plots).unwrap();

        assert_eq!(samples.epochs(), vec![0, 50, 100, 150]);
        assert_eq!(trainer.history().len(), 150);
        assert_eq!(plots.histories.len(), 1);

        for (epoch, grid) in &samples.grids {
            assert_eq!(grid.size(), 140, "grid for epoch {epoch}");
            assert!(
                grid.pixels().iter().all(|v| (0.0..=1.0).contains(v)),
                "unit rescale should keep epoch {epoch} grid in [0, 1]"
            );
        }
    }

    #[test]
    fn test_no_final_grid_off_interval() {
        let device = Default::default();
        let data = synthetic_images(4);
        let mut trainer = tiny_config(4)
            .with_epochs(7)
            .with_save_interval(3)
            .with_batch_size(2)
            .with_discriminator_iterations(2)
            .init::<TestAutodiffBackend>(&device)
            .unwrap();

        let mut samples = RecordingSink::new();
        let mut plots = RecordingSink::new();
        trainer.fit(&data, &mut samples, &mut plots).unwrap();

        assert_eq!(samples.epochs(), vec![0, 3, 6]);
        assert_eq!(trainer.history().len(), 7);
    }

    #[test]
    fn test_generate_is_deterministic_and_bounded() {
        let device = Default::default();
        let trainer = tiny_config(8).init::<TestAutodiffBackend>(&device).unwrap();

        let noise = sample_noise::<NdArray<f32>>(3, 8, &device);
        let a: Vec<f32> = trainer.generate(noise.clone()).into_data().to_vec().unwrap();
        let b: Vec<f32> = trainer.generate(noise).into_data().to_vec().unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|v| (-1.0..=1.0).contains(v)));
    }
}
