//! Activation functions used by the classifier
//!
//! - Softmax (f32, in place) with the max-subtraction trick
//! - Argmax with lowest-index tie breaking

/// Softmax activation function (f32 version) applied in place.
///
/// Converts logits to probabilities. The maximum is subtracted before
/// exponentiating so large activations cannot overflow. The result is
/// non-negative, sums to one and keeps the argmax of the input.
pub fn softmax_inplace(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }

    let mut max_value = values[0];
    for &value in values.iter().skip(1) {
        if value > max_value {
            max_value = value;
        }
    }

    let mut sum = 0.0f32;
    for value in values.iter_mut() {
        *value = (*value - max_value).exp();
        sum += *value;
    }

    for value in values.iter_mut() {
        *value /= sum;
    }
}

/// Softmax applied row-wise over a flat row-major matrix.
///
/// # Arguments
/// * `outputs` - Flat array containing row-major matrix data
/// * `rows` - Number of rows in the matrix
/// * `cols` - Number of columns in the matrix
pub fn softmax_rows(outputs: &mut [f32], rows: usize, cols: usize) {
    if cols == 0 {
        return;
    }
    assert_eq!(outputs.len(), rows * cols, "outputs length mismatch in softmax_rows");

    for row in outputs.chunks_exact_mut(cols) {
        softmax_inplace(row);
    }
}

/// Index of the largest entry.
///
/// Scans in increasing index order and only moves on a strictly greater value,
/// so ties resolve to the lowest index. Returns 0 for an empty slice.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0usize;
    let mut best_value = match values.first() {
        Some(&v) => v,
        None => return 0,
    };
    for (i, &value) in values.iter().enumerate().skip(1) {
        if value > best_value {
            best_value = value;
            best = i;
        }
    }
    best
}
