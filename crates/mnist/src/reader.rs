//! Reads IDX3 image files.

use std::path::Path;

use crate::types::{pixel_count, Images, MnistDataset, MnistError, IMAGE_MAGIC, TEST_IMAGES_FILE, TRAIN_IMAGES_FILE};

/// Length of the IDX3 header: magic, count, rows, cols as big-endian u32.
const HEADER_LEN: usize = 16;

/// Static methods for reading digit images from IDX files.
pub struct IdxReader;

impl IdxReader {
    /// Read an IDX3 image file.
    pub fn read_images(path: &Path) -> Result<Images, MnistError> {
        let bytes = std::fs::read(path)?;
        let images = Self::parse_images(&bytes, path)?;

        tracing::debug!(
            count = images.count,
            rows = images.rows,
            cols = images.cols,
            path = %path.display(),
            "Read IDX images"
        );

        Ok(images)
    }

    /// Parse an in-memory IDX3 image file. `path` is only used for errors.
    pub fn parse_images(bytes: &[u8], path: &Path) -> Result<Images, MnistError> {
        if bytes.len() < HEADER_LEN {
            return Err(MnistError::Truncated {
                path: path.to_path_buf(),
                expected: HEADER_LEN,
                found: bytes.len(),
            });
        }

        let word = |i: usize| u32::from_be_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        let magic = word(0);
        if magic != IMAGE_MAGIC {
            return Err(MnistError::BadMagic {
                path: path.to_path_buf(),
                found: magic,
            });
        }

        let count = word(4) as usize;
        let rows = word(8) as usize;
        let cols = word(12) as usize;
        let expected = pixel_count(count, rows, cols)?
            .checked_add(HEADER_LEN)
            .ok_or(MnistError::Oversized { count, rows, cols })?;

        if bytes.len() < expected {
            return Err(MnistError::Truncated {
                path: path.to_path_buf(),
                expected,
                found: bytes.len(),
            });
        }
        if bytes.len() > expected {
            return Err(MnistError::TrailingBytes {
                path: path.to_path_buf(),
                extra: bytes.len() - expected,
            });
        }

        Images::new(count, rows, cols, bytes[HEADER_LEN..].to_vec())
    }

    /// Load the train/test split from a directory in the standard MNIST layout.
    pub fn load_dataset(dir: &Path) -> Result<MnistDataset, MnistError> {
        let train = Self::read_images(&dir.join(TRAIN_IMAGES_FILE))?;
        let test = Self::read_images(&dir.join(TEST_IMAGES_FILE))?;

        tracing::info!(
            train = %train,
            test = %test,
            dir = %dir.display(),
            "Loaded MNIST images"
        );

        Ok(MnistDataset { train, test })
    }
}
