//! Shared, read-only state handed to every connection.

use tracing::{info, warn};

use crate::classifier::{Classifier, Prediction, NUM_CLASSES};
use crate::config::ServerConfig;
use crate::data::{load_images, Dataset, IMAGE_SIZE};
use crate::error::{Result, ServeError};
use crate::resolver::BatchResolver;
use crate::utils::SimpleRng;

/// Dataset, model and batching parameters.
///
/// Built once before the server accepts anything, then shared behind an
/// `Arc`. Nothing in here is mutated after construction.
#[derive(Debug)]
pub struct InferenceContext {
    dataset: Dataset,
    classifier: Classifier,
    batch_size: usize,
    resolver: BatchResolver,
}

impl InferenceContext {
    /// Assemble a context, computing the batch count for wrap-around.
    ///
    /// # Errors
    ///
    /// * `ServeError::Dimension` if the classifier does not take 784 pixel
    ///   inputs or has no output classes.
    /// * `ServeError::Config` if the dataset holds less than one batch.
    pub fn new(dataset: Dataset, classifier: Classifier, batch_size: usize) -> Result<Self> {
        if classifier.input_size() != IMAGE_SIZE {
            return Err(ServeError::Dimension {
                what: "classifier input",
                expected: IMAGE_SIZE,
                actual: classifier.input_size(),
            });
        }
        if classifier.classes() == 0 {
            return Err(ServeError::Dimension {
                what: "classifier output",
                expected: NUM_CLASSES,
                actual: 0,
            });
        }

        let resolver = BatchResolver::new(dataset.len(), batch_size)?;
        if dataset.len() % batch_size != 0 {
            warn!(
                images = dataset.len(),
                batch_size,
                "Batch size does not divide the dataset; trailing images are never served"
            );
        }
        info!(
            images = dataset.len(),
            batch_size,
            batches = resolver.batches(),
            "Inference context ready"
        );

        Ok(Self {
            dataset,
            classifier,
            batch_size,
            resolver,
        })
    }

    /// Load the dataset named by `config` and initialize a random model.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let dataset = load_images(&config.dataset_path)?;
        let mut rng = match config.seed {
            Some(seed) => SimpleRng::new(seed),
            None => SimpleRng::from_time(),
        };
        let classifier = Classifier::random_mnist(&mut rng);
        Self::new(dataset, classifier, config.batch_size)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches requests wrap around.
    pub fn batches(&self) -> usize {
        self.resolver.batches()
    }

    /// Effective batch number for a requested index.
    pub fn resolve(&self, requested: i64) -> usize {
        self.resolver.resolve(requested)
    }

    /// Predictions for the batch a request resolves to.
    ///
    /// Returns the effective batch number with the predictions; an empty
    /// batch view yields no predictions.
    pub fn predict_request(&self, requested: i64) -> (usize, Vec<Prediction>) {
        let batch_number = self.resolve(requested);
        let predictions = match self.dataset.batch(self.batch_size, batch_number) {
            Some(batch) => self.classifier.predict_batch(&batch),
            None => Vec::new(),
        };
        (batch_number, predictions)
    }
}
