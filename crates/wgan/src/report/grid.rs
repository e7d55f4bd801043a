//! 5×5 sample grids in display range.

use std::fmt;

use anyhow::ensure;
use burn::prelude::*;
use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::model::IMAGE_SIZE;

/// Tiles per grid row and column.
pub const GRID_SIDE: usize = 5;

/// Number of images in a grid.
pub const GRID_IMAGES: usize = GRID_SIDE * GRID_SIDE;

/// Map from generator range [-1, 1] to display range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayRescale {
    /// `0.5·x + 0.5`: inverts the pixel normalization exactly, lands in [0, 1].
    #[default]
    Unit,
    /// `0.5·x + 1`: historical mapping into [0.5, 1.5]. Values above 1
    /// saturate when written.
    Legacy,
}

impl DisplayRescale {
    pub fn apply(self, x: f32) -> f32 {
        match self {
            DisplayRescale::Unit => 0.5 * x + 0.5,
            DisplayRescale::Legacy => 0.5 * x + 1.0,
        }
    }
}

impl fmt::Display for DisplayRescale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayRescale::Unit => write!(f, "unit"),
            DisplayRescale::Legacy => write!(f, "legacy"),
        }
    }
}

/// A square mosaic of images, row-major, values in display range.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGrid {
    side: usize,
    tile: usize,
    pixels: Vec<f32>,
}

impl ImageGrid {
    /// Arrange 25 generated images into a 5×5 grid after rescaling.
    ///
    /// Input shape: `(25, 1, 28, 28)`. Image `r·5 + c` lands in row `r`,
    /// column `c`.
    pub fn from_tensor<B: Backend>(images: Tensor<B, 4>, rescale: DisplayRescale) -> anyhow::Result<Self> {
        let [count, channels, height, width] = images.dims();
        ensure!(
            count == GRID_IMAGES,
            "grid needs {GRID_IMAGES} images, got {count}"
        );
        ensure!(
            channels == 1 && height == IMAGE_SIZE && width == IMAGE_SIZE,
            "grid tiles must be 1x{IMAGE_SIZE}x{IMAGE_SIZE}, got {channels}x{height}x{width}"
        );

        let values: Vec<f32> = images
            .into_data()
            .to_vec()
            .map_err(|e| anyhow::anyhow!("failed to read generated images: {e:?}"))?;
        Ok(Self::from_tiles(&values, GRID_SIDE, IMAGE_SIZE, rescale))
    }

    /// Build from `side²` row-major tiles of `tile × tile` raw values.
    fn from_tiles(values: &[f32], side: usize, tile: usize, rescale: DisplayRescale) -> Self {
        let width = side * tile;
        let mut pixels = vec![0.0; width * width];

        for (index, image) in values.chunks(tile * tile).enumerate().take(side * side) {
            let (row, col) = (index / side, index % side);
            for y in 0..tile {
                for x in 0..tile {
                    let target = (row * tile + y) * width + col * tile + x;
                    pixels[target] = rescale.apply(image[y * tile + x]);
                }
            }
        }

        Self { side, tile, pixels }
    }

    /// Width and height in pixels.
    pub fn size(&self) -> usize {
        self.side * self.tile
    }

    /// Display-range value at column `x`, row `y`.
    pub fn pixel(&self, x: usize, y: usize) -> f32 {
        self.pixels[y * self.size() + x]
    }

    /// All display-range values, row-major.
    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// 8-bit grayscale rendering; values outside [0, 1] saturate.
    pub fn to_gray_image(&self) -> GrayImage {
        let size = self.size() as u32;
        GrayImage::from_fn(size, size, |x, y| {
            let v = self.pixel(x as usize, y as usize).clamp(0.0, 1.0);
            Luma([(v * 255.0).round() as u8])
        })
    }
}
