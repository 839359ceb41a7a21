//! Configuration structures for the server
//!
//! Settings can come from a JSON file; every field has a default so an empty
//! object (or no file at all) yields the stock configuration.

use std::fs;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, ServeError};

/// Default location of the held-out image set.
pub const DEFAULT_DATASET_PATH: &str = "data/t10k-images-idx3-ubyte";
/// Port the server listens on.
pub const DEFAULT_PORT: u16 = 1234;
/// Images per batch. Must divide the dataset size (10000).
pub const DEFAULT_BATCH_SIZE: usize = 20;
/// Pause before the process exits, for in-flight connections.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 3000;

/// Which socket address family to listen on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    #[default]
    Inet,
    Inet6,
}

impl AddressFamily {
    /// Wildcard address of this family.
    pub fn unspecified(self) -> IpAddr {
        match self {
            AddressFamily::Inet => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            AddressFamily::Inet6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }

    /// Loopback address of this family.
    pub fn loopback(self) -> IpAddr {
        match self {
            AddressFamily::Inet => IpAddr::V4(Ipv4Addr::LOCALHOST),
            AddressFamily::Inet6 => IpAddr::V6(Ipv6Addr::LOCALHOST),
        }
    }
}

/// Server configuration.
///
/// # Example
///
/// ```json
/// {
///   "dataset_path": "data/t10k-images-idx3-ubyte",
///   "port": 1234,
///   "address_family": "inet6",
///   "batch_size": 20,
///   "max_connections": 64,
///   "read_timeout_ms": 30000
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Path of the IDX3 image file to serve.
    pub dataset_path: PathBuf,

    /// Listening port.
    pub port: u16,

    /// Listen on IPv4 or IPv6.
    pub address_family: AddressFamily,

    /// Images per batch.
    pub batch_size: usize,

    /// Bound on concurrently served connections. `None` spawns a thread for
    /// every accepted connection without limit.
    pub max_connections: Option<usize>,

    /// Per-read timeout on client sockets.
    pub read_timeout_ms: Option<u64>,

    /// Per-write timeout on client sockets.
    pub write_timeout_ms: Option<u64>,

    /// Pause before exiting after the accept loop stops.
    pub shutdown_grace_ms: u64,

    /// Fixed seed for the model parameters. `None` seeds from the clock.
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            port: DEFAULT_PORT,
            address_family: AddressFamily::Inet,
            batch_size: DEFAULT_BATCH_SIZE,
            max_connections: None,
            read_timeout_ms: None,
            write_timeout_ms: None,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
            seed: None,
        }
    }
}

impl ServerConfig {
    /// Address to bind: the family's wildcard address on the configured port.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address_family.unspecified(), self.port)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Check field ranges.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ServeError::Config("batch_size must be positive".into()));
        }

        if self.max_connections == Some(0) {
            return Err(ServeError::Config(
                "max_connections must be positive when set".into(),
            ));
        }

        if self.read_timeout_ms == Some(0) {
            return Err(ServeError::Config(
                "read_timeout_ms must be positive when set".into(),
            ));
        }

        if self.write_timeout_ms == Some(0) {
            return Err(ServeError::Config(
                "write_timeout_ms must be positive when set".into(),
            ));
        }

        Ok(())
    }
}

/// Parse and validate a configuration from a JSON string.
pub fn parse_config(contents: &str) -> Result<ServerConfig> {
    let config: ServerConfig = serde_json::from_str(contents)
        .map_err(|e| ServeError::Config(format!("malformed JSON: {}", e)))?;
    config.validate()?;
    Ok(config)
}

/// Loads a server configuration from a JSON file.
///
/// Reads the file at `path` and deserializes its JSON contents into a
/// `ServerConfig`, then validates it.
///
/// # Examples
///
/// ```no_run
/// use rust_mnist_server::config::load_config;
///
/// let cfg = load_config("config/server.json").unwrap();
/// assert_eq!(cfg.batch_size, 20);
/// ```
pub fn load_config(path: &str) -> Result<ServerConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ServeError::io(format!("Could not read config file {}", path), e))?;
    parse_config(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 1234);
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.address_family, AddressFamily::Inet);
        assert!(config.max_connections.is_none());
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:1234");
    }

    #[test]
    fn test_inet6_bind_addr() {
        let config = parse_config(r#"{"address_family": "inet6"}"#).unwrap();
        assert_eq!(config.bind_addr().to_string(), "[::]:1234");
    }

    #[test]
    fn test_empty_object_is_default() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.shutdown_grace(), Duration::from_secs(3));
        assert!(config.read_timeout().is_none());
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        assert!(matches!(
            parse_config(r#"{"batch_size": 0}"#),
            Err(ServeError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_field() {
        assert!(parse_config(r#"{"batchsize": 10}"#).is_err());
    }
}
