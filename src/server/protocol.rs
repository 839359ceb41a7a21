//! Wire format
//!
//! Requests are ASCII decimal batch indices with no terminator or length
//! prefix. The first request on a connection may use up to
//! [`FIRST_REQUEST_LEN`] bytes, later ones up to [`NEXT_REQUEST_LEN`].
//! A response is one native-endian `i32` per image of the resolved batch.

use crate::classifier::Prediction;

/// Read size for the first request on a connection.
pub const FIRST_REQUEST_LEN: usize = 20;
/// Read size for every later request on the same connection.
pub const NEXT_REQUEST_LEN: usize = 4;
/// Bytes per encoded prediction.
pub const PREDICTION_LEN: usize = std::mem::size_of::<Prediction>();

/// Decode a request payload into a batch index.
///
/// Parsing is permissive and never fails: leading whitespace is skipped, an
/// optional sign is honoured, and digits are consumed up to the first other
/// byte. A payload without leading digits decodes to 0. Values beyond the
/// `i64` range saturate.
pub fn parse_batch_index(payload: &[u8]) -> i64 {
    let mut bytes = payload
        .iter()
        .copied()
        .skip_while(|b| b.is_ascii_whitespace())
        .peekable();

    let negative = match bytes.peek() {
        Some(b'-') => {
            bytes.next();
            true
        }
        Some(b'+') => {
            bytes.next();
            false
        }
        _ => false,
    };

    let mut value: i64 = 0;
    for b in bytes {
        if !b.is_ascii_digit() {
            break;
        }
        let digit = (b - b'0') as i64;
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }
    value
}

/// Request bytes for a batch index.
pub fn encode_request(index: i64) -> Vec<u8> {
    index.to_string().into_bytes()
}

/// Response bytes: each prediction as a native-endian `i32`.
pub fn encode_predictions(predictions: &[Prediction]) -> Vec<u8> {
    let mut out = Vec::with_capacity(predictions.len() * PREDICTION_LEN);
    for p in predictions {
        out.extend_from_slice(&p.to_ne_bytes());
    }
    out
}

/// Inverse of [`encode_predictions`]. Trailing bytes short of a full value
/// are ignored.
pub fn decode_predictions(bytes: &[u8]) -> Vec<Prediction> {
    bytes
        .chunks_exact(PREDICTION_LEN)
        .map(|chunk| {
            let mut raw = [0u8; PREDICTION_LEN];
            raw.copy_from_slice(chunk);
            Prediction::from_ne_bytes(raw)
        })
        .collect()
}
