//! Linear softmax classifier over raw images
//!
//! The classifier is initialized once and only read afterwards. Every method
//! takes `&self` and keeps scratch space local to the call, so one instance
//! can serve any number of threads without locking.

use tracing::info;

use crate::data::{Batch, IMAGE_SIZE};
use crate::error::Result;
use crate::layers::DenseLayer;
use crate::utils::{argmax, softmax_inplace, softmax_rows, SimpleRng};

/// Number of digit classes.
pub const NUM_CLASSES: usize = 10;

/// Class index produced for one image.
pub type Prediction = i32;

/// Single-layer classifier: a dense layer followed by a stable softmax.
#[derive(Debug, Clone)]
pub struct Classifier {
    layer: DenseLayer,
}

impl Classifier {
    /// Classifier with `classes` outputs over `input_size` pixels and every
    /// parameter drawn uniformly from [0, 1).
    pub fn random(classes: usize, input_size: usize, rng: &mut SimpleRng) -> Self {
        let layer = DenseLayer::new_uniform(input_size, classes, rng);
        info!(
            classes,
            input_size,
            parameters = layer.parameter_count(),
            "Initialized classifier with random weights"
        );
        Self { layer }
    }

    /// Ten-class classifier over 28 × 28 images with random parameters.
    pub fn random_mnist(rng: &mut SimpleRng) -> Self {
        Self::random(NUM_CLASSES, IMAGE_SIZE, rng)
    }

    /// Classifier from explicit parameters: row-major `classes × input_size`
    /// weights and one bias per class.
    pub fn from_parameters(weights: Vec<f32>, biases: Vec<f32>, input_size: usize) -> Result<Self> {
        Ok(Self {
            layer: DenseLayer::from_parameters(weights, biases, input_size)?,
        })
    }

    /// Number of classes.
    pub fn classes(&self) -> usize {
        self.layer.output_size()
    }

    /// Pixels expected per image.
    pub fn input_size(&self) -> usize {
        self.layer.input_size()
    }

    pub fn layer(&self) -> &DenseLayer {
        &self.layer
    }

    /// Raw per-class activations for one image.
    pub fn forward(&self, image: &[u8]) -> Vec<f32> {
        let mut activations = vec![0.0f32; self.classes()];
        self.layer.forward_pixels(image, &mut activations);
        activations
    }

    /// Class probabilities for one image.
    pub fn probabilities(&self, image: &[u8]) -> Vec<f32> {
        let mut activations = self.forward(image);
        softmax_inplace(&mut activations);
        activations
    }

    /// Most likely class for one image; ties go to the lowest index.
    pub fn predict(&self, image: &[u8]) -> Prediction {
        argmax(&self.probabilities(image)) as Prediction
    }

    /// Predict every image of a batch, in order.
    ///
    /// An empty batch yields an empty vector.
    pub fn predict_batch(&self, batch: &Batch<'_>) -> Vec<Prediction> {
        self.predict_images(batch.images())
    }

    /// Predict a sequence of images, in order.
    pub fn predict_images<'a, I>(&self, images: I) -> Vec<Prediction>
    where
        I: ExactSizeIterator<Item = &'a [u8]>,
    {
        let classes = self.classes();
        let rows = images.len();
        let mut outputs = vec![0.0f32; rows * classes];

        for (image, row) in images.zip(outputs.chunks_exact_mut(classes.max(1))) {
            self.layer.forward_pixels(image, row);
        }
        softmax_rows(&mut outputs, rows, classes);

        outputs
            .chunks_exact(classes.max(1))
            .take(rows)
            .map(|row| argmax(row) as Prediction)
            .collect()
    }
}
