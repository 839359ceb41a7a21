//! Layer implementations
//!
//! The classifier is a single dense layer over raw pixel intensities.

pub mod dense;

pub use dense::{pixel_scale, DenseLayer};
