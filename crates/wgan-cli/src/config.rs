//! TOML config loading for the WGAN CLI.
//!
//! An optional file with `[training]`, `[generator]` and `[discriminator]`
//! sections overrides the built-in defaults; CLI flags override the file.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use wgan::model::discriminator::DiscriminatorConfig;
use wgan::model::generator::GeneratorConfig;
use wgan::report::grid::DisplayRescale;
use wgan::training::trainer::WganTrainingConfig;

/// Top-level structure of a WGAN config file. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WganToml {
    #[serde(default)]
    pub training: TrainingOverrides,
    #[serde(default)]
    pub generator: GeneratorOverrides,
    #[serde(default)]
    pub discriminator: DiscriminatorOverrides,
}

/// Optional overrides for `WganTrainingConfig` fields.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainingOverrides {
    pub epochs: Option<usize>,
    pub batch_size: Option<usize>,
    pub save_interval: Option<usize>,
    pub discriminator_iterations: Option<usize>,
    pub lr: Option<f64>,
    pub beta_1: Option<f32>,
    pub beta_2: Option<f32>,
    pub epsilon: Option<f32>,
    pub log_interval: Option<usize>,
    pub seed: Option<u64>,
    /// `"unit"` or `"legacy"`.
    pub display_rescale: Option<DisplayRescale>,
    pub show_progress: Option<bool>,
}

/// Optional overrides for `GeneratorConfig` fields.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorOverrides {
    pub latent_dim: Option<usize>,
    pub seed_channels: Option<usize>,
    pub stage_channels: Option<[usize; 3]>,
    pub norm_momentum: Option<f64>,
}

/// Optional overrides for `DiscriminatorConfig` fields.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscriminatorOverrides {
    pub channels: Option<[usize; 5]>,
    pub dropout: Option<[f64; 5]>,
    pub negative_slope: Option<f64>,
    pub norm_momentum: Option<f64>,
    pub sigmoid_output: Option<bool>,
}

/// Training flags given on the command line.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub epochs: Option<usize>,
    pub batch_size: Option<usize>,
    pub save_interval: Option<usize>,
    pub discriminator_iterations: Option<usize>,
    pub seed: Option<u64>,
    pub no_progress: bool,
    pub legacy_rescale: bool,
}

/// Load and deserialize a `WganToml` from a TOML file.
pub fn load_wgan_toml(path: &Path) -> anyhow::Result<WganToml> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: WganToml = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    tracing::info!(path = %path.display(), "Loaded WGAN config");
    Ok(config)
}

/// Load `path` if given, otherwise use empty overrides.
pub fn load_optional_toml(path: Option<&Path>) -> anyhow::Result<WganToml> {
    match path {
        Some(path) => load_wgan_toml(path),
        None => Ok(WganToml::default()),
    }
}

fn build_generator_config(overrides: &GeneratorOverrides) -> GeneratorConfig {
    let mut config = GeneratorConfig::new();
    if let Some(n) = overrides.latent_dim {
        config.latent_dim = n;
    }
    if let Some(n) = overrides.seed_channels {
        config.seed_channels = n;
    }
    if let Some(c) = overrides.stage_channels {
        config.stage_channels = c;
    }
    if let Some(m) = overrides.norm_momentum {
        config.norm_momentum = m;
    }
    config
}

fn build_discriminator_config(overrides: &DiscriminatorOverrides) -> DiscriminatorConfig {
    let mut config = DiscriminatorConfig::new();
    if let Some(c) = overrides.channels {
        config.channels = c;
    }
    if let Some(d) = overrides.dropout {
        config.dropout = d;
    }
    if let Some(s) = overrides.negative_slope {
        config.negative_slope = s;
    }
    if let Some(m) = overrides.norm_momentum {
        config.norm_momentum = m;
    }
    if let Some(s) = overrides.sigmoid_output {
        config.sigmoid_output = s;
    }
    config
}

/// Build a `WganTrainingConfig` from defaults, TOML overrides and CLI flags.
///
/// Priority chain: built-in defaults < TOML values < CLI flags.
pub fn build_training_config(toml: &WganToml, cli: &CliOverrides) -> WganTrainingConfig {
    let mut config = WganTrainingConfig::new(
        build_generator_config(&toml.generator),
        build_discriminator_config(&toml.discriminator),
    );

    // Apply TOML overrides
    let t = &toml.training;
    if let Some(n) = t.epochs {
        config.epochs = n;
    }
    if let Some(n) = t.batch_size {
        config.batch_size = n;
    }
    if let Some(n) = t.save_interval {
        config.save_interval = n;
    }
    if let Some(n) = t.discriminator_iterations {
        config.discriminator_iterations = n;
    }
    if let Some(lr) = t.lr {
        config.lr = lr;
    }
    if let Some(b) = t.beta_1 {
        config.beta_1 = b;
    }
    if let Some(b) = t.beta_2 {
        config.beta_2 = b;
    }
    if let Some(e) = t.epsilon {
        config.epsilon = e;
    }
    if let Some(n) = t.log_interval {
        config.log_interval = n;
    }
    if t.seed.is_some() {
        config.seed = t.seed;
    }
    if let Some(r) = t.display_rescale {
        config.display_rescale = r;
    }
    if let Some(p) = t.show_progress {
        config.show_progress = p;
    }

    // CLI overrides take highest priority
    if let Some(n) = cli.epochs {
        config.epochs = n;
    }
    if let Some(n) = cli.batch_size {
        config.batch_size = n;
    }
    if let Some(n) = cli.save_interval {
        config.save_interval = n;
    }
    if let Some(n) = cli.discriminator_iterations {
        config.discriminator_iterations = n;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.no_progress {
        config.show_progress = false;
    }
    if cli.legacy_rescale {
        config.display_rescale = DisplayRescale::Legacy;
    }

    config
}
