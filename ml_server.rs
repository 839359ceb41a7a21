use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use rust_mnist_server::config::{
    load_config, AddressFamily, ServerConfig, DEFAULT_SHUTDOWN_GRACE_MS,
};
use rust_mnist_server::server::Server;
use rust_mnist_server::{InferenceContext, Result};
use tracing::{error, info, Level};

// Batched MNIST inference over TCP: one thread per client connection.

/// Serve batch predictions for a held-out MNIST image set.
#[derive(Parser, Debug)]
#[command(name = "ml_server", version, about, long_about = None)]
struct Cli {
    /// Address family: `inet6` listens on [::], anything else on 0.0.0.0
    #[arg(value_name = "FAMILY")]
    family: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// IDX3 image file to serve (overrides the config file)
    #[arg(short, long)]
    dataset: Option<String>,

    /// Listening port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bound on concurrently served connections
    #[arg(long)]
    max_connections: Option<usize>,

    /// Log every served batch
    #[arg(long)]
    debug: bool,
}

/// Merge the config file (if any) with command line overrides.
fn resolve_config(cli: &Cli) -> Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    if let Some(family) = &cli.family {
        config.address_family = if family == "inet6" {
            AddressFamily::Inet6
        } else {
            AddressFamily::Inet
        };
    }
    if let Some(dataset) = &cli.dataset {
        config.dataset_path = dataset.into();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.max_connections.is_some() {
        config.max_connections = cli.max_connections;
    }

    config.validate()?;
    Ok(config)
}

/// Load the data, build the model and bind the listener.
fn setup(config: &ServerConfig) -> Result<Server> {
    info!(path = %config.dataset_path.display(), "Loading test data...");
    let ctx = Arc::new(InferenceContext::from_config(config)?);
    Server::from_config(config, ctx)
}

fn shutdown(grace: Duration) {
    info!("Shutting down ..");
    thread::sleep(grace);
    info!("BYE");
}

/// Run the server until the accept loop stops.
///
/// Both arms carry the grace period to wait before exiting. A configuration
/// that fails to resolve falls back to the default grace period.
fn serve(cli: &Cli) -> std::result::Result<Duration, Duration> {
    let config = match resolve_config(cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(Duration::from_millis(DEFAULT_SHUTDOWN_GRACE_MS));
        }
    };

    let server = match setup(&config) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "Server setup failed");
            return Err(config.shutdown_grace());
        }
    };

    match server.local_addr() {
        Ok(addr) => info!(%addr, "Listening on socket"),
        Err(e) => error!(error = %e, "Listening on unknown address"),
    }

    let exit = server.run();
    info!(
        accepted = exit.accepted,
        cause = %exit.cause,
        "Accept loop stopped"
    );
    Ok(config.shutdown_grace())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    match serve(&cli) {
        Ok(grace) => {
            shutdown(grace);
            ExitCode::SUCCESS
        }
        Err(grace) => {
            shutdown(grace);
            ExitCode::FAILURE
        }
    }
}
