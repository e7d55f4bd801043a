//! IDX file I/O for the MNIST handwritten-digit images.
//!
//! Provides the raw image container, a reader that parses IDX3 image files
//! (single files or the standard train/test directory layout), and a writer
//! producing the same format for fixtures and synthetic datasets.

pub mod reader;
pub mod types;
pub mod writer;

pub use reader::IdxReader;
pub use types::{Images, MnistDataset, MnistError, IMAGE_MAGIC, TEST_IMAGES_FILE, TRAIN_IMAGES_FILE};
pub use writer::IdxWriter;
