//! Wasserstein critic loss and the ±1 targets it pairs with.
//!
//! The loss is `mean(label · score)`: linear in the score and antisymmetric
//! in the label sign. No clipping and no gradient penalty.

use burn::prelude::*;

/// Provenance of a batch, which fixes its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Dataset images, label +1.
    Real,
    /// Generator output, label -1.
    Fake,
}

impl Target {
    /// Scalar label for this provenance.
    pub fn value(self) -> f32 {
        match self {
            Target::Real => 1.0,
            Target::Fake => -1.0,
        }
    }

    /// A `(batch,)` tensor filled with this target's label.
    pub fn labels<B: Backend>(self, batch_size: usize, device: &B::Device) -> Tensor<B, 1> {
        Tensor::full([batch_size], self.value(), device)
    }
}

/// Wasserstein loss.
///
/// # Arguments
/// - `labels`: shape `(batch,)`, entries in {+1, -1}
/// - `scores`: shape `(batch,)`, critic output
///
/// # Returns
/// Scalar loss tensor of shape `(1,)`.
pub fn wasserstein_loss<B: Backend>(labels: Tensor<B, 1>, scores: Tensor<B, 1>) -> Tensor<B, 1> {
    (labels * scores).mean()
}
