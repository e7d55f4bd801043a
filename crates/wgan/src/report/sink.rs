//! Destinations for sample grids and loss histories.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::report::grid::ImageGrid;
use crate::training::history::LossHistory;

/// Receives a sample grid every `save_interval` epochs.
pub trait SampleSink {
    fn save(&mut self, epoch: usize, grid: &ImageGrid) -> anyhow::Result<()>;
}

/// Receives the complete loss history once training ends.
pub trait LossPlotSink {
    fn plot(&mut self, history: &LossHistory) -> anyhow::Result<()>;
}

/// Writes each grid to `<dir>/mnist_<epoch>.png`.
#[derive(Debug, Clone)]
pub struct PngGridSink {
    dir: PathBuf,
}

impl PngGridSink {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create sample directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File the grid for `epoch` is written to.
    pub fn path_for(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("mnist_{epoch}.png"))
    }
}

impl SampleSink for PngGridSink {
    fn save(&mut self, epoch: usize, grid: &ImageGrid) -> anyhow::Result<()> {
        let path = self.path_for(epoch);
        grid.to_gray_image()
            .save_with_format(&path, image::ImageFormat::Png)
            .with_context(|| format!("failed to write sample grid {}", path.display()))?;
        tracing::info!(epoch, path = %path.display(), "Saved sample grid");
        Ok(())
    }
}

/// Keeps everything it receives in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    /// `(epoch, grid)` in arrival order.
    pub grids: Vec<(usize, ImageGrid)>,
    /// Histories handed to [`LossPlotSink::plot`].
    pub histories: Vec<LossHistory>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Epochs of the recorded grids.
    pub fn epochs(&self) -> Vec<usize> {
        self.grids.iter().map(|(epoch, _)| *epoch).collect()
    }
}

impl SampleSink for RecordingSink {
    fn save(&mut self, epoch: usize, grid: &ImageGrid) -> anyhow::Result<()> {
        self.grids.push((epoch, grid.clone()));
        Ok(())
    }
}

impl LossPlotSink for RecordingSink {
    fn plot(&mut self, history: &LossHistory) -> anyhow::Result<()> {
        self.histories.push(history.clone());
        Ok(())
    }
}
