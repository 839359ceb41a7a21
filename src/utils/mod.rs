//! Shared utilities for the classifier
//!
//! This module provides random number generation and the activation helpers
//! used by the inference path.

pub mod activations;
pub mod rng;

pub use activations::{argmax, softmax_inplace, softmax_rows};
pub use rng::SimpleRng;
