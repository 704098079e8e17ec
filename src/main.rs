//! User gateway (v1)
//!
//! Edge service that fronts the auth, profile and orchestrator services.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                  GATEWAY                     │
//!   Client Request     │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!   ───────────────────┼─▶│  http   │──▶│ handlers │──▶│ aggregate │  │
//!                      │  │ server  │   └──────────┘   └─────┬─────┘  │
//!                      │  └─────────┘                        │        │
//!                      │                                     ▼        │
//!   Client Response    │                              ┌───────────┐   │     auth
//!   ◀──────────────────┼──────────────────────────────│ upstream  │◀──┼──── profile
//!                      │                              │  fan-out  │   │     orchestrator
//!                      │                              └───────────┘   │
//!                      │   config · observability · lifecycle         │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use user_gateway::config::watcher::ConfigWatcher;
use user_gateway::config::{load_config, load_from_env};
use user_gateway::lifecycle::{log_startup, spawn_signal_handler, Shutdown};
use user_gateway::net::load_tls_config;
use user_gateway::observability::{logging, metrics};
use user_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "user-gateway", version, about = "Edge gateway for the user services")]
struct Args {
    /// TOML config file. Without it, defaults plus environment variables are used.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(config = ?args.config, "user-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    log_startup(&config, local_addr);

    let tls = config.listener.tls.clone();
    let server = HttpServer::new(config)?;

    match tls {
        Some(tls) => {
            let rustls = load_tls_config(&tls).await?;
            server
                .run_tls(listener.into_std()?, rustls, config_updates, shutdown.subscribe())
                .await?;
        }
        None => {
            server
                .run(listener, config_updates, shutdown.subscribe())
                .await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
