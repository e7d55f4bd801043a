//! WGAN model components: generator, critic, batch normalization with an
//! explicit frozen mode, and the composite generator → critic model.

pub mod adversarial;
pub mod batch_norm;
pub mod discriminator;
pub mod generator;

/// Height and width of every image handled by the networks.
pub const IMAGE_SIZE: usize = 28;

/// Grayscale images carry a single channel.
pub const IMAGE_CHANNELS: usize = 1;

/// One row of a network description: layer name, output shape without the
/// batch axis, and trainable parameter count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSummary {
    pub name: String,
    pub output_shape: Vec<usize>,
    pub params: usize,
}

impl std::fmt::Display for LayerSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shape: Vec<String> = self.output_shape.iter().map(|d| d.to_string()).collect();
        write!(f, "{:<28} ({}) {:>10} params", self.name, shape.join(", "), self.params)
    }
}
