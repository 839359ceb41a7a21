//! Blocking client for the batch prediction protocol.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};

use tracing::debug;

use crate::classifier::Prediction;
use crate::error::{Result, ServeError};
use crate::server::protocol::{
    decode_predictions, encode_request, FIRST_REQUEST_LEN, NEXT_REQUEST_LEN, PREDICTION_LEN,
};

/// One connection to the server, issuing requests in sequence.
///
/// Tracks whether the first request has been sent, since later requests must
/// fit in the shorter read the server uses for them.
pub struct BatchClient<S> {
    stream: S,
    batch_len: usize,
    requests_sent: u64,
}

impl BatchClient<TcpStream> {
    /// Connect to a server answering `batch_len` predictions per request.
    pub fn connect(addr: SocketAddr, batch_len: usize) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| ServeError::io(format!("Connect failed to {}", addr), e))?;
        Ok(Self::new(stream, batch_len))
    }

    /// Local address of the connection.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.stream
            .local_addr()
            .map_err(|e| ServeError::io("Failed to retrieve socket address", e))
    }
}

impl<S: Read + Write> BatchClient<S> {
    pub fn new(stream: S, batch_len: usize) -> Self {
        Self {
            stream,
            batch_len,
            requests_sent: 0,
        }
    }

    /// Largest request the server will read next.
    pub fn next_request_limit(&self) -> usize {
        if self.requests_sent == 0 {
            FIRST_REQUEST_LEN
        } else {
            NEXT_REQUEST_LEN
        }
    }

    /// Ask for batch `index` and wait for its predictions.
    pub fn request(&mut self, index: i64) -> Result<Vec<Prediction>> {
        let payload = encode_request(index);
        let limit = self.next_request_limit();
        if payload.len() > limit {
            return Err(ServeError::Config(format!(
                "request {} does not fit in {} bytes",
                index, limit
            )));
        }

        let predictions = request_batch(&mut self.stream, index, self.batch_len)?;
        self.requests_sent += 1;
        Ok(predictions)
    }

    /// Give the stream back, e.g. to close it explicitly.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

/// Send batch `index` as a request and read back `batch_len` predictions.
///
/// Does not check the request against the server's read size; see
/// [`BatchClient`] for that.
pub fn request_batch<S: Read + Write>(
    stream: &mut S,
    index: i64,
    batch_len: usize,
) -> Result<Vec<Prediction>> {
    stream
        .write_all(&encode_request(index))
        .and_then(|()| stream.flush())
        .map_err(|e| ServeError::io("Write error", e))?;

    let mut response = vec![0u8; batch_len * PREDICTION_LEN];
    stream
        .read_exact(&mut response)
        .map_err(|e| ServeError::io("Read error", e))?;

    let predictions = decode_predictions(&response);
    debug!(index, predictions = ?predictions, "Buffer received");
    Ok(predictions)
}
