//! Dense (fully connected) layer implementation
//!
//! This module provides the single linear layer the classifier is built from:
//! `output[c] = bias[c] + sum_d weight[c][d] * input[d]`.

use crate::error::{Result, ServeError};
use crate::utils::SimpleRng;

/// Scale a raw pixel intensity from 0..=255 to 0..=1.
#[inline]
pub fn pixel_scale(pixel: u8) -> f32 {
    pixel as f32 / 255.0
}

/// Dense (fully connected) layer with weights and biases.
///
/// # Fields
///
/// * `input_size` - Number of input features (D)
/// * `output_size` - Number of output features (L)
/// * `weights` - Weight matrix stored row-major, one row per output (L × D)
/// * `biases` - Bias vector (L)
///
/// The shape is fixed at construction and the layer exposes no mutating
/// methods, so a built layer can be shared across threads freely.
///
/// # Example
///
/// ```
/// use rust_mnist_server::layers::DenseLayer;
/// use rust_mnist_server::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let layer = DenseLayer::new_uniform(784, 10, &mut rng);
/// assert_eq!(layer.input_size(), 784);
/// assert_eq!(layer.output_size(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct DenseLayer {
    input_size: usize,
    output_size: usize,
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl DenseLayer {
    /// Create a new DenseLayer with every parameter drawn uniformly from [0, 1).
    ///
    /// Parameters are drawn output by output: the bias first, then that
    /// output's row of weights.
    pub fn new_uniform(input_size: usize, output_size: usize, rng: &mut SimpleRng) -> Self {
        let mut weights = vec![0.0f32; input_size * output_size];
        let mut biases = vec![0.0f32; output_size];

        for (bias, row) in biases
            .iter_mut()
            .zip(weights.chunks_exact_mut(input_size.max(1)))
        {
            *bias = rng.next_f32();
            for value in row.iter_mut() {
                *value = rng.next_f32();
            }
        }

        Self {
            input_size,
            output_size,
            weights,
            biases,
        }
    }

    /// Build a layer from explicit parameters.
    ///
    /// `weights` is row-major with `biases.len()` rows of `input_size` values.
    pub fn from_parameters(weights: Vec<f32>, biases: Vec<f32>, input_size: usize) -> Result<Self> {
        let output_size = biases.len();
        if weights.len() != output_size * input_size {
            return Err(ServeError::Dimension {
                what: "weight matrix",
                expected: output_size * input_size,
                actual: weights.len(),
            });
        }

        Ok(Self {
            input_size,
            output_size,
            weights,
            biases,
        })
    }

    /// Forward pass over raw pixels.
    ///
    /// Each pixel is scaled to [0, 1] with floating point division before it
    /// is multiplied in. `output` must hold `output_size` values.
    ///
    /// # Panics
    ///
    /// Panics if `pixels` is not `input_size` long or `output` is not
    /// `output_size` long.
    pub fn forward_pixels(&self, pixels: &[u8], output: &mut [f32]) {
        assert_eq!(pixels.len(), self.input_size, "input length mismatch");
        assert_eq!(output.len(), self.output_size, "output length mismatch");

        for ((out, &bias), row) in output
            .iter_mut()
            .zip(self.biases.iter())
            .zip(self.weights.chunks_exact(self.input_size.max(1)))
        {
            let mut activation = bias;
            for (&w, &p) in row.iter().zip(pixels.iter()) {
                activation += w * pixel_scale(p);
            }
            *out = activation;
        }
    }

    /// Get the input size of the layer.
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Get the output size of the layer.
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Row-major weight matrix.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Bias vector.
    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    /// Get the number of parameters.
    ///
    /// Returns input_size × output_size (weights) + output_size (biases).
    pub fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }
}
