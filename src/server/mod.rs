//! TCP serving
//!
//! - `protocol`: request decoding and response encoding
//! - `handler`: the per-connection request loop
//! - `limiter`: optional bound on live connections
//! - `listener`: the listening socket and accept loop

pub mod handler;
pub mod limiter;
pub mod listener;
pub mod protocol;

pub use handler::{ConnectionHandler, ConnectionStats};
pub use limiter::{ConnectionLimiter, ConnectionPermit};
pub use listener::{LoopExit, Server, ServerOptions};
