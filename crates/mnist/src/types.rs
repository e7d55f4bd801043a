//! Data types for raw digit images and the errors raised while decoding them.

use std::fmt;
use std::path::PathBuf;

/// Magic number of an IDX file holding unsigned bytes in three dimensions.
pub const IMAGE_MAGIC: u32 = 0x0000_0803;

/// File name of the training images inside an MNIST directory.
pub const TRAIN_IMAGES_FILE: &str = "train-images-idx3-ubyte";

/// File name of the test images inside an MNIST directory.
pub const TEST_IMAGES_FILE: &str = "t10k-images-idx3-ubyte";

/// Errors that can occur while reading or writing IDX image files.
#[derive(Debug, thiserror::Error)]
pub enum MnistError {
    /// The header does not start with the IDX3 unsigned-byte magic.
    #[error("bad IDX magic {found:#010x} in {}, expected 0x00000803", .path.display())]
    BadMagic { path: PathBuf, found: u32 },

    /// The file ends before the header or the declared payload.
    #[error("truncated IDX file {}: expected {expected} bytes, found {found}", .path.display())]
    Truncated {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    /// The file has bytes after the declared payload.
    #[error("IDX file {} has {extra} trailing bytes", .path.display())]
    TrailingBytes { path: PathBuf, extra: usize },

    /// Pixel buffer length disagrees with count × rows × cols.
    #[error("pixel buffer holds {found} bytes, expected {expected}")]
    ShapeMismatch { expected: usize, found: usize },

    /// count × rows × cols does not fit in memory sizes.
    #[error("IDX dimensions {count}x{rows}x{cols} overflow the pixel count")]
    Oversized { count: usize, rows: usize, cols: usize },

    /// A dimension does not fit the 32-bit IDX header field.
    #[error("{field} = {value} does not fit a 32-bit IDX header")]
    DimensionTooLarge { field: &'static str, value: usize },

    /// IO error from the filesystem.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Total pixels of `count` images of `rows × cols`, or `Oversized` on overflow.
pub(crate) fn pixel_count(count: usize, rows: usize, cols: usize) -> Result<usize, MnistError> {
    count
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(cols))
        .ok_or(MnistError::Oversized { count, rows, cols })
}

/// A stack of grayscale images with pixel values in `[0, 255]`.
///
/// Pixels are stored row-major, image after image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Images {
    /// Number of images.
    pub count: usize,
    /// Image height in pixels.
    pub rows: usize,
    /// Image width in pixels.
    pub cols: usize,
    /// Raw pixels, `count * rows * cols` bytes.
    pub pixels: Vec<u8>,
}

impl Images {
    /// Build an image stack, checking that the pixel buffer matches the shape.
    pub fn new(count: usize, rows: usize, cols: usize, pixels: Vec<u8>) -> Result<Self, MnistError> {
        let expected = pixel_count(count, rows, cols)?;
        if pixels.len() != expected {
            return Err(MnistError::ShapeMismatch {
                expected,
                found: pixels.len(),
            });
        }
        Ok(Self {
            count,
            rows,
            cols,
            pixels,
        })
    }

    /// Number of pixels in one image.
    pub fn image_len(&self) -> usize {
        self.rows * self.cols
    }

    /// Whether the stack holds no images.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl fmt::Display for Images {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} images of {}x{}", self.count, self.rows, self.cols)
    }
}

/// The standard train/test split of a digit dataset.
#[derive(Debug, Clone)]
pub struct MnistDataset {
    pub train: Images,
    pub test: Images,
}
