//! IDX3 image file reading and writing
//!
//! File format: a 16 byte header of four big-endian u32 fields (magic number,
//! image count, rows, columns) followed by `count` images of unsigned byte
//! pixels.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{info, warn};

use super::dataset::{Dataset, IMAGE_HEIGHT, IMAGE_SIZE, IMAGE_WIDTH};
use crate::error::{Result, ServeError};

/// Magic number of an IDX3 unsigned byte image file.
pub const IMAGE_MAGIC: u32 = 0x0000_0803;

/// Length of the IDX3 image header in bytes.
pub const HEADER_LEN: usize = 16;

/// Decoded IDX3 image header, already converted to host byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageFileHeader {
    pub magic_number: u32,
    pub number_of_images: u32,
    pub number_of_rows: u32,
    pub number_of_columns: u32,
}

/// Read a big-endian u32 at `offset` and advance it.
///
/// Independent of the host byte order.
fn read_be_u32(data: &[u8], offset: &mut usize) -> u32 {
    let b0 = (data[*offset] as u32) << 24;
    let b1 = (data[*offset + 1] as u32) << 16;
    let b2 = (data[*offset + 2] as u32) << 8;
    let b3 = data[*offset + 3] as u32;
    *offset += 4;
    b0 | b1 | b2 | b3
}

impl ImageFileHeader {
    /// Decode the raw header bytes, converting every field from big-endian.
    pub fn decode(raw: &[u8; HEADER_LEN]) -> Self {
        let mut offset = 0usize;
        Self {
            magic_number: read_be_u32(raw, &mut offset),
            number_of_images: read_be_u32(raw, &mut offset),
            number_of_rows: read_be_u32(raw, &mut offset),
            number_of_columns: read_be_u32(raw, &mut offset),
        }
    }

    /// Encode the header back into its big-endian on-disk form.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut raw = [0u8; HEADER_LEN];
        raw[0..4].copy_from_slice(&self.magic_number.to_be_bytes());
        raw[4..8].copy_from_slice(&self.number_of_images.to_be_bytes());
        raw[8..12].copy_from_slice(&self.number_of_rows.to_be_bytes());
        raw[12..16].copy_from_slice(&self.number_of_columns.to_be_bytes());
        raw
    }
}

/// Load an IDX3 image file into a dataset.
///
/// A header whose dimensions differ from 28 × 28 only produces a warning:
/// records are still read as fixed 784 byte images. Whether that is intended
/// is unresolved, so the lenient behaviour is kept as is.
///
/// # Errors
///
/// * `ServeError::Io` if the file cannot be opened, the header is short, or
///   fewer images are present than the header declares.
/// * `ServeError::Format` if the magic number is not [`IMAGE_MAGIC`].
pub fn load_images<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| ServeError::io(format!("Could not open file: {}", path.display()), e))?;
    let mut reader = BufReader::new(file);

    let mut raw = [0u8; HEADER_LEN];
    reader.read_exact(&mut raw).map_err(|e| {
        ServeError::io(
            format!("Could not read image file header from: {}", path.display()),
            e,
        )
    })?;
    let header = ImageFileHeader::decode(&raw);

    if header.magic_number != IMAGE_MAGIC {
        return Err(ServeError::Format {
            path: path.to_path_buf(),
            found: header.magic_number,
            expected: IMAGE_MAGIC,
        });
    }

    if header.number_of_rows as usize != IMAGE_WIDTH {
        warn!(
            path = %path.display(),
            rows = header.number_of_rows,
            expected = IMAGE_WIDTH,
            "Invalid number of image rows in image file"
        );
    }
    if header.number_of_columns as usize != IMAGE_HEIGHT {
        warn!(
            path = %path.display(),
            columns = header.number_of_columns,
            expected = IMAGE_HEIGHT,
            "Invalid number of image columns in image file"
        );
    }

    let count = header.number_of_images as usize;
    let total_bytes = count.checked_mul(IMAGE_SIZE).ok_or_else(|| {
        ServeError::io(
            format!("Could not allocate memory for {} images", count),
            std::io::Error::from(std::io::ErrorKind::OutOfMemory),
        )
    })?;

    let mut pixels: Vec<u8> = Vec::new();
    pixels.try_reserve_exact(total_bytes).map_err(|_| {
        ServeError::io(
            format!("Could not allocate memory for {} images", count),
            std::io::Error::from(std::io::ErrorKind::OutOfMemory),
        )
    })?;
    pixels.resize(total_bytes, 0);

    reader.read_exact(&mut pixels).map_err(|e| {
        ServeError::io(
            format!("Could not read {} images from: {}", count, path.display()),
            e,
        )
    })?;

    info!(path = %path.display(), images = count, "Loaded image dataset");
    Dataset::from_pixels(pixels, count)
}

/// Write images in IDX3 format.
///
/// `pixels` holds `count` images of `rows × cols` bytes back to back.
pub fn write_images<W: Write>(
    writer: W,
    pixels: &[u8],
    count: usize,
    rows: usize,
    cols: usize,
) -> std::io::Result<()> {
    if pixels.len() != count * rows * cols {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "pixel buffer does not match count × rows × cols",
        ));
    }

    let header = ImageFileHeader {
        magic_number: IMAGE_MAGIC,
        number_of_images: count as u32,
        number_of_rows: rows as u32,
        number_of_columns: cols as u32,
    };

    let mut writer = BufWriter::new(writer);
    writer.write_all(&header.encode())?;
    writer.write_all(pixels)?;
    writer.flush()
}

/// Write images in IDX3 format to a file at `path`.
pub fn write_images_file<P: AsRef<Path>>(
    path: P,
    pixels: &[u8],
    count: usize,
    rows: usize,
    cols: usize,
) -> std::io::Result<()> {
    write_images(File::create(path)?, pixels, count, rows, cols)
}
