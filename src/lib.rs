//! Rust MNIST batch inference server
//!
//! This library serves batched digit classification over TCP. A client sends
//! a batch index; the server picks that slice of a held-out image set, runs a
//! single-layer softmax classifier over it and replies with one class per
//! image.
//!
//! # Modules
//!
//! - `data`: IDX3 image loading and batch views over the dataset
//! - `layers`: the dense layer the classifier is built on
//! - `classifier`: forward pass, softmax and batch prediction
//! - `resolver`: wrap-around mapping of requested batch indices
//! - `context`: immutable state shared by all connections
//! - `server`: wire protocol, connection loop and accept loop
//! - `client`: blocking client for the same protocol
//! - `config`: server configuration
//! - `utils`: RNG and activation helpers

pub mod classifier;
pub mod client;
pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod layers;
pub mod resolver;
pub mod server;
pub mod utils;

pub use classifier::{Classifier, Prediction, NUM_CLASSES};
pub use context::InferenceContext;
pub use error::{Result, ServeError};
