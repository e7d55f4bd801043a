//! Wasserstein GAN for 28x28 grayscale digit images.
//!
//! Provides an upsample-then-convolve generator, a strided convolutional
//! critic, the Wasserstein loss, a composite model that trains the generator
//! through a frozen critic, and the alternating training loop with sample-grid
//! and loss-curve reporting.

pub mod model;
pub mod report;
pub mod training;
