//! Tests for dataset loading and batch views
//!
//! This file covers:
//! - Loading IDX3 image files (valid, bad magic, truncated, missing)
//! - The lenient handling of unexpected image dimensions
//! - Batch windows: full, clipped and past-the-end

mod common;

use std::io::Write;

use rust_mnist_server::data::{
    load_images, write_images, write_images_file, Dataset, IMAGE_MAGIC, IMAGE_SIZE,
};
use rust_mnist_server::ServeError;
use tempfile::{tempdir, NamedTempFile};

fn idx_file(pixels: &[u8], count: usize, rows: usize, cols: usize) -> NamedTempFile {
    let file = NamedTempFile::new().expect("failed to create temp file");
    write_images(file.reopen().unwrap(), pixels, count, rows, cols).expect("failed to write idx");
    file
}

// ============================================================================
// IDX Loading Tests
// ============================================================================

mod idx_loading_tests {
    use super::*;

    #[test]
    fn test_load_valid_file() {
        let pixels = common::synthetic_pixels(30);
        let file = idx_file(&pixels, 30, 28, 28);

        let dataset = load_images(file.path()).expect("load failed");

        assert_eq!(dataset.len(), 30);
        assert_eq!(dataset.image(0).unwrap(), &pixels[..IMAGE_SIZE]);
        assert_eq!(dataset.image(29).unwrap(), &pixels[29 * IMAGE_SIZE..]);
    }

    #[test]
    fn test_load_via_path_helper() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t10k-images-idx3-ubyte");
        write_images_file(&path, &[7u8; IMAGE_SIZE * 2], 2, 28, 28).unwrap();

        let dataset = load_images(&path).unwrap();
        assert_eq!(dataset.len(), 2);
        assert!(dataset.image(1).unwrap().iter().all(|&p| p == 7));
    }

    #[test]
    fn test_header_fields_are_big_endian() {
        // Count of 3 stored big-endian; little-endian decoding would read 0x0300_0000.
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0, 0, 8, 3, 0, 0, 0, 3, 0, 0, 0, 28, 0, 0, 0, 28])
            .unwrap();
        file.write_all(&vec![1u8; IMAGE_SIZE * 3]).unwrap();
        file.flush().unwrap();

        let dataset = load_images(file.path()).unwrap();
        assert_eq!(dataset.len(), 3);
    }

    #[test]
    fn test_bad_magic_is_format_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0, 0, 8, 1, 0, 0, 0, 1, 0, 0, 0, 28, 0, 0, 0, 28])
            .unwrap();
        file.write_all(&[0u8; IMAGE_SIZE]).unwrap();
        file.flush().unwrap();

        match load_images(file.path()) {
            Err(ServeError::Format {
                found, expected, ..
            }) => {
                assert_eq!(found, 0x0801);
                assert_eq!(expected, IMAGE_MAGIC);
            }
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = load_images(dir.path().join("does-not-exist"));
        assert!(matches!(result, Err(ServeError::Io { .. })));
    }

    #[test]
    fn test_short_header_is_io_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0, 0, 8, 3, 0, 0]).unwrap();
        file.flush().unwrap();

        assert!(matches!(load_images(file.path()), Err(ServeError::Io { .. })));
    }

    #[test]
    fn test_fewer_images_than_declared_is_io_error() {
        let pixels = common::synthetic_pixels(2);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0, 0, 8, 3, 0, 0, 0, 5, 0, 0, 0, 28, 0, 0, 0, 28])
            .unwrap();
        file.write_all(&pixels).unwrap();
        file.flush().unwrap();

        match load_images(file.path()) {
            Err(ServeError::Io { context, .. }) => assert!(context.contains("5 images")),
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let pixels = common::synthetic_pixels(2);
        let file = idx_file(&pixels, 2, 28, 28);
        {
            let mut handle = std::fs::OpenOptions::new()
                .append(true)
                .open(file.path())
                .unwrap();
            handle.write_all(&[9u8; 100]).unwrap();
        }

        let dataset = load_images(file.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.image(1).unwrap(), &pixels[IMAGE_SIZE..]);
    }

    #[test]
    fn test_dimension_mismatch_only_warns() {
        // Header claims 14 × 56; records are still read as 784 byte images.
        let pixels = common::synthetic_pixels(4);
        let file = idx_file(&pixels, 4, 14, 56);

        let dataset = load_images(file.path()).expect("mismatch must not be fatal");
        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.image(3).unwrap(), &pixels[3 * IMAGE_SIZE..]);
    }
}

// ============================================================================
// Batch View Tests
// ============================================================================

mod batch_view_tests {
    use super::*;

    #[test]
    fn test_every_full_batch_has_batch_size_images() {
        let dataset = common::synthetic_dataset(100);
        for n in 0..5 {
            let batch = dataset.batch(20, n).unwrap();
            assert_eq!(batch.len(), 20);
            assert_eq!(batch.start(), n * 20);
        }
    }

    #[test]
    fn test_clipped_batch_length() {
        let dataset = common::synthetic_dataset(50);
        // start 40, 40 + 20 > 50
        let batch = dataset.batch(20, 2).unwrap();
        assert_eq!(batch.len(), 50 - 40);
    }

    #[test]
    fn test_start_past_end_is_empty_signal() {
        let dataset = common::synthetic_dataset(40);
        assert!(dataset.batch(20, 2).is_none());
        assert!(dataset.batch(20, 1000).is_none());
    }

    #[test]
    fn test_batch_images_are_the_dataset_images() {
        let dataset = common::synthetic_dataset(12);
        let batch = dataset.batch(5, 1).unwrap();
        for (offset, image) in batch.images().enumerate() {
            assert_eq!(image, dataset.image(5 + offset).unwrap());
        }
    }

    #[test]
    fn test_empty_dataset_has_no_batches() {
        let dataset = Dataset::from_images(&[]);
        assert!(dataset.is_empty());
        assert!(dataset.batch(20, 0).is_none());
    }
}
