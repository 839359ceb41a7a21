//! In-memory image dataset and batch views over it.

use crate::error::{Result, ServeError};

/// Expected image width in pixels.
pub const IMAGE_WIDTH: usize = 28;
/// Expected image height in pixels.
pub const IMAGE_HEIGHT: usize = 28;
/// Bytes per image record.
pub const IMAGE_SIZE: usize = IMAGE_WIDTH * IMAGE_HEIGHT;

/// A fixed set of images held contiguously in memory.
///
/// The image count is fixed when the dataset is built and the storage is
/// never resized afterwards.
#[derive(Debug, Clone)]
pub struct Dataset {
    pixels: Vec<u8>,
    count: usize,
}

/// A borrowed, contiguous window of images from a [`Dataset`].
///
/// The last window of a dataset may be shorter than the requested batch size.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    start: usize,
    pixels: &'a [u8],
}

impl Dataset {
    /// Build a dataset from `count` images of [`IMAGE_SIZE`] bytes stored
    /// back to back.
    pub fn from_pixels(pixels: Vec<u8>, count: usize) -> Result<Self> {
        let expected = count * IMAGE_SIZE;
        if pixels.len() != expected {
            return Err(ServeError::Dimension {
                what: "image buffer",
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self { pixels, count })
    }

    /// Build a dataset from individual images.
    pub fn from_images(images: &[[u8; IMAGE_SIZE]]) -> Self {
        let mut pixels = Vec::with_capacity(images.len() * IMAGE_SIZE);
        for image in images {
            pixels.extend_from_slice(image);
        }
        Self {
            pixels,
            count: images.len(),
        }
    }

    /// Number of images.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Pixels of the image at `index`.
    pub fn image(&self, index: usize) -> Option<&[u8]> {
        if index >= self.count {
            return None;
        }
        let start = index * IMAGE_SIZE;
        Some(&self.pixels[start..start + IMAGE_SIZE])
    }

    /// View batch number `batch_number` of `batch_size` images.
    ///
    /// Returns `None` when the batch would start at or past the end of the
    /// dataset; callers treat that as zero images. A batch overlapping the
    /// end is clipped to the images that remain.
    pub fn batch(&self, batch_size: usize, batch_number: usize) -> Option<Batch<'_>> {
        let start = batch_size.checked_mul(batch_number)?;
        if start >= self.count {
            return None;
        }

        let len = batch_size.min(self.count - start);
        let begin = start * IMAGE_SIZE;
        Some(Batch {
            start,
            pixels: &self.pixels[begin..begin + len * IMAGE_SIZE],
        })
    }
}

impl<'a> Batch<'a> {
    /// Index of the first image of the batch within its dataset.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of images in the batch.
    pub fn len(&self) -> usize {
        self.pixels.len() / IMAGE_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Iterate over the images in order.
    pub fn images(&self) -> impl ExactSizeIterator<Item = &'a [u8]> + 'a {
        self.pixels.chunks_exact(IMAGE_SIZE)
    }
}
