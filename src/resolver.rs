//! Maps client-supplied batch indices onto batches that exist.

use crate::error::{Result, ServeError};

/// Wrap-around resolver for batch indices.
///
/// Holds the number of whole batches in the dataset. Any requested index,
/// including negative ones, maps into `[0, batches)` with a true modulo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchResolver {
    batches: usize,
}

impl BatchResolver {
    /// Resolver for a dataset of `dataset_len` images split into batches of
    /// `batch_size`. Fails when not even one whole batch fits.
    pub fn new(dataset_len: usize, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(ServeError::Config("batch_size must be positive".into()));
        }
        let batches = dataset_len / batch_size;
        if batches == 0 {
            return Err(ServeError::Config(format!(
                "dataset holds {} images, fewer than one batch of {}",
                dataset_len, batch_size
            )));
        }
        Ok(Self { batches })
    }

    /// Number of batches requests wrap around.
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Effective batch number for a requested index.
    pub fn resolve(&self, requested: i64) -> usize {
        requested.rem_euclid(self.batches as i64) as usize
    }
}
