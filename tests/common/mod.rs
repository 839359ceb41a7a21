//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use rust_mnist_server::classifier::Classifier;
use rust_mnist_server::data::{Dataset, IMAGE_SIZE};
use rust_mnist_server::server::{Server, ServerOptions};
use rust_mnist_server::utils::SimpleRng;
use rust_mnist_server::InferenceContext;

/// Deterministic, varied pixel data for `count` images.
pub fn synthetic_pixels(count: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(count * IMAGE_SIZE);
    for i in 0..count {
        for p in 0..IMAGE_SIZE {
            pixels.push(((i * 31 + p * 7 + (i * p) % 13) % 256) as u8);
        }
    }
    pixels
}

pub fn synthetic_dataset(count: usize) -> Dataset {
    Dataset::from_pixels(synthetic_pixels(count), count).expect("valid synthetic dataset")
}

/// Context over `count` synthetic images with a seeded random model.
pub fn synthetic_context(count: usize, batch_size: usize, seed: u64) -> Arc<InferenceContext> {
    let classifier = Classifier::random_mnist(&mut SimpleRng::new(seed));
    Arc::new(
        InferenceContext::new(synthetic_dataset(count), classifier, batch_size)
            .expect("valid context"),
    )
}

/// Bind a server on an ephemeral loopback port and run it on a background
/// thread. The thread is left running for the rest of the test process.
pub fn start_server(ctx: Arc<InferenceContext>, options: ServerOptions) -> SocketAddr {
    let server = Server::bind("127.0.0.1:0".parse().unwrap(), ctx, options)
        .expect("failed to bind test server");
    let addr = server.local_addr().expect("no local address");
    thread::spawn(move || server.run());
    addr
}
