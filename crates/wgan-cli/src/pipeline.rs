//! Training and description pipelines behind the CLI subcommands.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use burn::backend::ndarray::{NdArray, NdArrayDevice};
use burn::backend::Autodiff;
use burn::config::Config;
use burn::module::Module;

use mnist::IdxReader;
use wgan::model::LayerSummary;
use wgan::report::plot::SvgLossPlot;
use wgan::report::sink::PngGridSink;
use wgan::training::data::ImageSet;

use crate::config::{build_training_config, load_optional_toml, CliOverrides};

type TrainBackend = Autodiff<NdArray<f32>>;

/// Arguments for the `train` subcommand.
#[derive(Debug)]
pub struct TrainArgs {
    /// Optional TOML config file.
    pub config: Option<PathBuf>,
    /// Directory holding the train and test IDX image files.
    pub data_dir: PathBuf,
    /// Directory for sample grids, `losses.json`, `losses.svg` and `config.json`.
    pub output_dir: PathBuf,
    /// Flag overrides applied on top of the config file.
    pub overrides: CliOverrides,
}

/// Arguments for the `describe` subcommand.
#[derive(Debug)]
pub struct DescribeArgs {
    pub config: Option<PathBuf>,
}

/// Load the training images, train, and write every report to `output_dir`.
pub fn run_train(args: TrainArgs) -> anyhow::Result<()> {
    let start = Instant::now();

    // 1. Resolve config
    let toml = load_optional_toml(args.config.as_deref())?;
    let config = build_training_config(&toml, &args.overrides);
    config.validate()?;

    // 2. Load the dataset; only the train split feeds the critic
    let dataset = IdxReader::load_dataset(&args.data_dir)
        .with_context(|| format!("failed to load MNIST images from {}", args.data_dir.display()))?;
    tracing::info!(
        train = %dataset.train,
        held_out = dataset.test.count,
        "Using train split for training"
    );

    let device = NdArrayDevice::Cpu;
    let data = ImageSet::<TrainBackend>::from_images(&dataset.train, &device)?;

    // 3. Prepare outputs
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;
    let config_path = args.output_dir.join("config.json");
    config
        .save(&config_path)
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    let mut samples = PngGridSink::new(&args.output_dir)?;
    let mut plot = SvgLossPlot::in_dir(&args.output_dir);

    // 4. Train
    let mut trainer = config.init::<TrainBackend>(&device)?;
    trainer.fit(&data, &mut samples, &mut plot)?;

    tracing::info!(
        output_dir = %args.output_dir.display(),
        epochs = trainer.history().len(),
        elapsed_secs = format!("{:.1}", start.elapsed().as_secs_f64()),
        "Training run finished"
    );
    Ok(())
}

fn print_table(title: &str, layers: &[LayerSummary], total: usize) {
    println!("{title}");
    for layer in layers {
        println!("  {layer}");
    }
    println!("  {:<28} {:>22} params", "total", total);
}

/// Print layer shapes and parameter counts for both networks.
pub fn run_describe(args: DescribeArgs) -> anyhow::Result<()> {
    let toml = load_optional_toml(args.config.as_deref())?;
    let config = build_training_config(&toml, &CliOverrides::default());
    config.validate()?;

    let device = NdArrayDevice::Cpu;
    let generator = config.generator.init::<NdArray<f32>>(&device);
    let discriminator = config.discriminator.init::<NdArray<f32>>(&device);

    println!("input: latent vector ({})", config.generator.latent_dim);
    print_table("Generator", &generator.summary(), generator.num_params());
    println!();
    println!("input: image (1, 28, 28)");
    print_table("Discriminator", &discriminator.summary(), discriminator.num_params());
    Ok(())
}
