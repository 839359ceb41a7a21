//! Per-connection request loop.

use std::io::{ErrorKind, Read, Write};

use tracing::{debug, error, info, warn};

use super::protocol::{encode_predictions, parse_batch_index, FIRST_REQUEST_LEN, NEXT_REQUEST_LEN};
use crate::context::InferenceContext;
use crate::error::{Result, ServeError};

/// Where a connection is in its request/response cycle.
#[derive(Debug)]
enum State {
    /// Waiting for up to `limit` request bytes.
    AwaitingRequest { limit: usize },
    /// Answering a decoded request.
    Processing { requested: i64 },
    /// Finished; carries how the connection ended.
    Closed(Result<()>),
}

/// Counters for one finished connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Requests answered (including ones whose response write failed).
    pub requests: u64,
    /// Responses that could not be written.
    pub write_failures: u64,
}

/// Serves one client connection until it closes.
///
/// Requests on a connection are answered strictly in order. A failed write is
/// logged and the loop goes back to reading, so the next read detects a dead
/// peer. Read errors end the connection.
pub struct ConnectionHandler<'a, S> {
    stream: &'a mut S,
    ctx: &'a InferenceContext,
    peer: &'a str,
    buffer: [u8; FIRST_REQUEST_LEN],
    stats: ConnectionStats,
}

impl<'a, S: Read + Write> ConnectionHandler<'a, S> {
    pub fn new(stream: &'a mut S, ctx: &'a InferenceContext, peer: &'a str) -> Self {
        Self {
            stream,
            ctx,
            peer,
            buffer: [0u8; FIRST_REQUEST_LEN],
            stats: ConnectionStats::default(),
        }
    }

    /// Run the request loop to completion.
    ///
    /// Returns the connection's counters on a clean close, or the read error
    /// that ended it.
    pub fn run(mut self) -> Result<ConnectionStats> {
        let mut state = State::AwaitingRequest {
            limit: FIRST_REQUEST_LEN,
        };

        loop {
            state = match state {
                State::AwaitingRequest { limit } => self.await_request(limit),
                State::Processing { requested } => self.process(requested),
                State::Closed(outcome) => {
                    return outcome.map(|()| self.stats);
                }
            };
        }
    }

    fn await_request(&mut self, limit: usize) -> State {
        loop {
            match self.stream.read(&mut self.buffer[..limit]) {
                Ok(0) => {
                    info!(peer = self.peer, "Client disconnected");
                    return State::Closed(Ok(()));
                }
                Ok(n) => {
                    return State::Processing {
                        requested: parse_batch_index(&self.buffer[..n]),
                    };
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!(peer = self.peer, error = %e, "Read error");
                    return State::Closed(Err(ServeError::io("Read error", e)));
                }
            }
        }
    }

    fn process(&mut self, requested: i64) -> State {
        let (batch_number, predictions) = self.ctx.predict_request(requested);
        let payload = encode_predictions(&predictions);
        self.stats.requests += 1;

        match self
            .stream
            .write_all(&payload)
            .and_then(|()| self.stream.flush())
        {
            Ok(()) => {
                debug!(
                    peer = self.peer,
                    requested,
                    batch = batch_number,
                    predictions = ?predictions,
                    "Buffer sent"
                );
            }
            Err(e) => {
                self.stats.write_failures += 1;
                warn!(peer = self.peer, batch = batch_number, error = %e, "Write error");
            }
        }

        State::AwaitingRequest {
            limit: NEXT_REQUEST_LEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::data::{Dataset, IMAGE_SIZE};
    use crate::server::protocol::decode_predictions;
    use crate::utils::SimpleRng;
    use std::collections::VecDeque;
    use std::io;

    /// Stream that hands out scripted reads and records writes.
    struct ScriptedStream {
        reads: VecDeque<io::Result<Vec<u8>>>,
        read_sizes: Vec<usize>,
        written: Vec<u8>,
        fail_writes: bool,
    }

    impl ScriptedStream {
        fn new(reads: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                reads: reads.into(),
                read_sizes: Vec::new(),
                written: Vec::new(),
                fail_writes: false,
            }
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.read_sizes.push(buf.len());
            match self.reads.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
            }
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn context() -> InferenceContext {
        let images: Vec<[u8; IMAGE_SIZE]> = (0..40).map(|i| [(i * 6) as u8; IMAGE_SIZE]).collect();
        let classifier = Classifier::random_mnist(&mut SimpleRng::new(9));
        InferenceContext::new(Dataset::from_images(&images), classifier, 4).unwrap()
    }

    #[test]
    fn test_single_request_then_clean_close() {
        let ctx = context();
        let mut stream = ScriptedStream::new(vec![Ok(b"3".to_vec())]);

        let stats = ConnectionHandler::new(&mut stream, &ctx, "test").run().unwrap();

        assert_eq!(stats.requests, 1);
        assert_eq!(stream.written.len(), 16);
        let (_, expected) = ctx.predict_request(3);
        assert_eq!(decode_predictions(&stream.written), expected);
    }

    #[test]
    fn test_read_sizes_shrink_after_first_request() {
        let ctx = context();
        let mut stream = ScriptedStream::new(vec![Ok(b"1".to_vec()), Ok(b"2".to_vec())]);

        ConnectionHandler::new(&mut stream, &ctx, "test").run().unwrap();

        assert_eq!(stream.read_sizes, vec![FIRST_REQUEST_LEN, NEXT_REQUEST_LEN, NEXT_REQUEST_LEN]);
    }

    #[test]
    fn test_read_error_closes_with_error() {
        let ctx = context();
        let mut stream = ScriptedStream::new(vec![
            Ok(b"0".to_vec()),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ]);

        let err = ConnectionHandler::new(&mut stream, &ctx, "test").run().unwrap_err();
        assert!(matches!(err, ServeError::Io { .. }));
        assert_eq!(stream.written.len(), 16);
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        let ctx = context();
        let mut stream = ScriptedStream::new(vec![
            Err(io::Error::new(io::ErrorKind::Interrupted, "signal")),
            Ok(b"0".to_vec()),
        ]);

        let stats = ConnectionHandler::new(&mut stream, &ctx, "test").run().unwrap();
        assert_eq!(stats.requests, 1);
    }

    #[test]
    fn test_write_failure_keeps_reading() {
        let ctx = context();
        let mut stream = ScriptedStream::new(vec![Ok(b"0".to_vec()), Ok(b"1".to_vec())]);
        stream.fail_writes = true;

        let stats = ConnectionHandler::new(&mut stream, &ctx, "test").run().unwrap();

        assert_eq!(stats.requests, 2);
        assert_eq!(stats.write_failures, 2);
    }

    #[test]
    fn test_garbage_request_served_as_batch_zero() {
        let ctx = context();
        let mut stream = ScriptedStream::new(vec![Ok(b"zz".to_vec())]);

        ConnectionHandler::new(&mut stream, &ctx, "test").run().unwrap();

        let (_, expected) = ctx.predict_request(0);
        assert_eq!(decode_predictions(&stream.written), expected);
    }
}
