//! Writes image stacks as IDX3 files.

use std::path::Path;

use crate::types::{Images, MnistDataset, MnistError, IMAGE_MAGIC, TEST_IMAGES_FILE, TRAIN_IMAGES_FILE};

/// Static methods for writing digit images to IDX files.
pub struct IdxWriter;

/// Convert a dimension to its 32-bit IDX header word.
fn header_word(field: &'static str, value: usize) -> Result<u32, MnistError> {
    u32::try_from(value).map_err(|_| MnistError::DimensionTooLarge { field, value })
}

impl IdxWriter {
    /// Encode an image stack as IDX3 bytes.
    ///
    /// Fails when a dimension does not fit the 32-bit header.
    pub fn encode_images(images: &Images) -> Result<Vec<u8>, MnistError> {
        let header = [
            IMAGE_MAGIC,
            header_word("count", images.count)?,
            header_word("rows", images.rows)?,
            header_word("cols", images.cols)?,
        ];
        let mut bytes = Vec::with_capacity(16 + images.pixels.len());
        for word in header {
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        bytes.extend_from_slice(&images.pixels);
        Ok(bytes)
    }

    /// Write an image stack to `path`, replacing any existing file.
    pub fn write_images(path: &Path, images: &Images) -> Result<(), MnistError> {
        std::fs::write(path, Self::encode_images(images)?)?;
        tracing::debug!(count = images.count, path = %path.display(), "Wrote IDX images");
        Ok(())
    }

    /// Write a train/test split into `dir` using the standard MNIST file names.
    pub fn write_dataset(dir: &Path, dataset: &MnistDataset) -> Result<(), MnistError> {
        std::fs::create_dir_all(dir)?;
        Self::write_images(&dir.join(TRAIN_IMAGES_FILE), &dataset.train)?;
        Self::write_images(&dir.join(TEST_IMAGES_FILE), &dataset.test)?;
        Ok(())
    }
}
