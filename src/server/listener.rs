//! Listening socket and accept loop.

use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

use super::handler::ConnectionHandler;
use super::limiter::{ConnectionLimiter, ConnectionPermit};
use crate::config::ServerConfig;
use crate::context::InferenceContext;
use crate::error::{Result, ServeError};

/// Socket options applied to each accepted connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerOptions {
    pub max_connections: Option<usize>,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

impl From<&ServerConfig> for ServerOptions {
    fn from(config: &ServerConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
        }
    }
}

/// Why the accept loop stopped.
#[derive(Debug)]
pub struct LoopExit {
    /// Connections handed to a thread before the loop stopped.
    pub accepted: u64,
    /// The failure that stopped it.
    pub cause: ServeError,
}

/// A bound listener plus the shared context its connections serve.
///
/// Each accepted connection runs on its own thread against the same
/// read-only [`InferenceContext`].
pub struct Server {
    listener: TcpListener,
    ctx: Arc<InferenceContext>,
    limiter: Arc<ConnectionLimiter>,
    options: ServerOptions,
}

impl Server {
    /// Bind and listen on `addr`.
    ///
    /// On Unix the standard library enables `SO_REUSEADDR` on listeners, so a
    /// restarted server can rebind while old connections sit in TIME_WAIT.
    pub fn bind(addr: SocketAddr, ctx: Arc<InferenceContext>, options: ServerOptions) -> Result<Self> {
        info!(%addr, "Bind socket");
        let listener =
            TcpListener::bind(addr).map_err(|e| ServeError::io(format!("Bind failed on {}", addr), e))?;

        let limiter = ConnectionLimiter::new(options.max_connections);
        match limiter.max() {
            Some(max) => info!(max_connections = max, "Connection limit enabled"),
            None => info!("No connection limit; one thread per connection"),
        }

        Ok(Self {
            listener,
            ctx,
            limiter,
            options,
        })
    }

    /// Bind on the address and options named by `config`.
    pub fn from_config(config: &ServerConfig, ctx: Arc<InferenceContext>) -> Result<Self> {
        Self::bind(config.bind_addr(), ctx, ServerOptions::from(config))
    }

    /// Address actually bound (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| ServeError::io("Failed to retrieve socket address", e))
    }

    /// Connections currently being served.
    pub fn active_connections(&self) -> usize {
        self.limiter.active()
    }

    /// Accept connections until accepting fails.
    ///
    /// Only an accept failure or a failure to start a connection thread ends
    /// the loop. Connections already running are left to finish on their own.
    pub fn run(self) -> LoopExit {
        info!("Wait for clients to connect ..");
        let mut accepted = 0u64;

        loop {
            let permit = self.limiter.acquire();

            let (stream, peer) = match self.listener.accept() {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "Accept failed");
                    return LoopExit {
                        accepted,
                        cause: ServeError::io("Accept failed", e),
                    };
                }
            };
            info!(%peer, "Client connected");

            if let Err(cause) = self.spawn_connection(stream, peer, accepted, permit) {
                return LoopExit { accepted, cause };
            }
            accepted += 1;
        }
    }

    fn spawn_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        id: u64,
        permit: ConnectionPermit,
    ) -> Result<()> {
        if let Err(e) = stream
            .set_read_timeout(self.options.read_timeout)
            .and_then(|()| stream.set_write_timeout(self.options.write_timeout))
        {
            warn!(%peer, error = %e, "Could not set socket timeouts");
        }

        let ctx = Arc::clone(&self.ctx);
        // Kept so the socket can be shut down if the thread never starts.
        let fallback = stream.try_clone().ok();

        let spawned = thread::Builder::new()
            .name(format!("conn-{}", id))
            .spawn(move || serve_connection(stream, peer, &ctx, permit));

        match spawned {
            Ok(_detached) => Ok(()),
            Err(e) => {
                error!(%peer, error = %e, "Create a worker thread failed");
                if let Some(stream) = fallback {
                    let _ = stream.shutdown(Shutdown::Both);
                }
                Err(ServeError::io("Create a worker thread failed", e))
            }
        }
    }
}

/// Body of a connection thread.
fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    ctx: &InferenceContext,
    _permit: ConnectionPermit,
) {
    let peer_name = peer.to_string();
    info!(peer = %peer_name, "Communicate with the new connection ..");

    match ConnectionHandler::new(&mut stream, ctx, &peer_name).run() {
        Ok(stats) => info!(
            peer = %peer_name,
            requests = stats.requests,
            write_failures = stats.write_failures,
            "Connection finished"
        ),
        Err(e) => warn!(peer = %peer_name, error = %e, "Connection ended with error"),
    }

    info!(peer = %peer_name, "Shutting down the connection ..");
    let _ = stream.shutdown(Shutdown::Both);
}
