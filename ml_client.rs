use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;
use rust_mnist_server::client::BatchClient;
use rust_mnist_server::config::{AddressFamily, DEFAULT_BATCH_SIZE, DEFAULT_PORT};
use tracing::{error, info, Level};

// Minimal client: connect, request a batch (or several), print predictions.

/// Request batch predictions from a running ml_server.
#[derive(Parser, Debug)]
#[command(name = "ml_client", version, about, long_about = None)]
struct Cli {
    /// Address family: `inet6` connects to [::1], anything else to 127.0.0.1
    #[arg(value_name = "FAMILY")]
    family: Option<String>,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// First batch index to request
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    index: i64,

    /// Number of consecutive batches to request on the same connection
    #[arg(short = 'n', long, default_value_t = 1)]
    count: u32,

    /// Images per batch on the server
    #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Log raw protocol traffic
    #[arg(long)]
    debug: bool,
}

/// Index of the `offset`-th request, clamped at the i64 bounds.
fn request_index(start: i64, offset: u32) -> i64 {
    start.saturating_add(i64::from(offset))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let family = match cli.family.as_deref() {
        Some("inet6") => AddressFamily::Inet6,
        _ => AddressFamily::Inet,
    };
    let addr = SocketAddr::new(family.loopback(), cli.port);

    info!(%addr, "Connect socket");
    let mut client = match BatchClient::connect(addr, cli.batch_size) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Connect failed");
            return ExitCode::FAILURE;
        }
    };

    if let Ok(local) = client.local_addr() {
        info!(%local, "Local address");
    }

    for offset in 0..cli.count {
        let index = request_index(cli.index, offset);
        match client.request(index) {
            Ok(predictions) => {
                let rendered: Vec<String> = predictions.iter().map(|p| p.to_string()).collect();
                println!("Buffer received ({}): {}", index, rendered.join(" "));
            }
            Err(e) => {
                error!(index, error = %e, "Request failed");
                return ExitCode::FAILURE;
            }
        }
    }

    info!("BYE");
    ExitCode::SUCCESS
}
