//! Path-masking reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────────┐
//!                         │                 PATH-MASK PROXY                    │
//!     Client Request      │  ┌─────────┐   ┌──────────────┐   ┌────────────┐  │
//!     ────────────────────┼─▶│  http   │──▶│   routing    │──▶│  upstream  │──┼──▶ Application
//!     /media/a.jpg        │  │ server  │   │ masked→real  │   │   client   │  │    /wp-content/uploads/a.jpg
//!                         │  └─────────┘   └──────────────┘   └─────┬──────┘  │
//!                         │                                         │         │
//!     Client Response     │  ┌──────────────────────────────┐       │         │
//!     ◀───────────────────┼──│ masking: headers + body      │◀──────┘         │
//!                         │  │ (snapshot → table → rewrite) │                 │
//!                         │  └──────────────────────────────┘                 │
//!                         │                                                   │
//!                         │  config (hot reload) · admin API · artifact sync  │
//!                         └───────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use path_mask_proxy::config::{load_config, watcher::ConfigWatcher, ProxyConfig};
use path_mask_proxy::http::HttpServer;
use path_mask_proxy::lifecycle::{signals, startup, Shutdown};
use path_mask_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "path-mask-proxy")]
#[command(about = "Reverse proxy that masks internal application paths", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("path-mask-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        origins = ?config.site.origins,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Hot reload. The watcher handle must outlive the server.
    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (rx, Some(handle)),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable; hot reload disabled");
                    (rx, None)
                }
            }
        }
        None => {
            let (_tx, rx) = mpsc::unbounded_channel();
            (rx, None)
        }
    };

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_handler(Arc::clone(&shutdown));

    let server = HttpServer::new(config.clone())?;
    let control = Arc::clone(&server.state().control);
    startup::activate(&control);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    server.run(listener, config_updates, shutdown.subscribe()).await?;

    startup::deactivate(&control);
    tracing::info!("Shutdown complete");
    Ok(())
}
