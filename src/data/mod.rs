//! Dataset storage
//!
//! - `dataset`: the in-memory image set and its batch views
//! - `idx`: reading and writing IDX3 image files

pub mod dataset;
pub mod idx;

pub use dataset::{Batch, Dataset, IMAGE_HEIGHT, IMAGE_SIZE, IMAGE_WIDTH};
pub use idx::{load_images, write_images, write_images_file, IMAGE_MAGIC};
