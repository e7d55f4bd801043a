//! WGAN training: real-image batches, Wasserstein loss, per-epoch loss
//! history, and the critic/generator alternation loop.

pub mod data;
pub mod history;
pub mod loss;
pub mod trainer;
