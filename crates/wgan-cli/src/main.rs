mod config;
mod pipeline;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::CliOverrides;
use pipeline::{DescribeArgs, TrainArgs};

/// wgan: train a Wasserstein GAN on MNIST digits.
#[derive(Parser)]
#[command(name = "wgan", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands for training and inspecting the networks.
#[derive(Subcommand)]
enum Command {
    /// Train the generator and critic, writing sample grids and loss curves.
    Train {
        /// Path to a TOML config with [training], [generator] and [discriminator] sections.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory containing train-images-idx3-ubyte and t10k-images-idx3-ubyte.
        #[arg(long, default_value = "data/mnist")]
        data_dir: PathBuf,
        /// Directory for sample grids (mnist_<epoch>.png), losses.json and losses.svg.
        #[arg(long, default_value = "images2")]
        output_dir: PathBuf,
        /// Override the number of epochs.
        #[arg(long)]
        epochs: Option<usize>,
        /// Override the batch size.
        #[arg(long)]
        batch_size: Option<usize>,
        /// Override the epochs between sample grids.
        #[arg(long)]
        save_interval: Option<usize>,
        /// Override the critic updates per generator update.
        #[arg(long)]
        discriminator_iterations: Option<usize>,
        /// Seed the backend and batch sampling.
        #[arg(long)]
        seed: Option<u64>,
        /// Hide the progress bar.
        #[arg(long)]
        no_progress: bool,
        /// Rescale grids with 0.5·x + 1 instead of 0.5·x + 0.5.
        #[arg(long)]
        legacy_rescale: bool,
    },
    /// Print layer shapes and parameter counts for both networks.
    Describe {
        /// Path to a TOML config (only [generator] and [discriminator] matter).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Train {
            config,
            data_dir,
            output_dir,
            epochs,
            batch_size,
            save_interval,
            discriminator_iterations,
            seed,
            no_progress,
            legacy_rescale,
        } => pipeline::run_train(TrainArgs {
            config,
            data_dir,
            output_dir,
            overrides: CliOverrides {
                epochs,
                batch_size,
                save_interval,
                discriminator_iterations,
                seed,
                no_progress,
                legacy_rescale,
            },
        }),
        Command::Describe { config } => pipeline::run_describe(DescribeArgs { config }),
    }
}
