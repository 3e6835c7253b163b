//! Health-checking HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                 BALANCER                      │
//!                      │                                               │
//!   Client Request     │  ┌────────┐   ┌───────────────┐   ┌────────┐ │
//!   ───────────────────┼─▶│ http   │──▶│ load_balancer │──▶│ http   │─┼──▶ Backend
//!                      │  │ server │   │  (round robin)│   │ client │ │    Server
//!                      │  └────────┘   └───────┬───────┘   └────────┘ │
//!                      │                       │ health flags          │
//!                      │                ┌──────┴───────┐              │
//!                      │                │    health    │◀─── periodic │
//!                      │                │    prober    │     /health  │
//!                      │                └──────────────┘     probes   │
//!                      │                                               │
//!                      │  config · lifecycle · observability           │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use balancer::config::{load_config, BalancerConfig};
use balancer::observability::{logging, metrics};
use balancer::{HttpServer, Shutdown};

/// Health-checking HTTP reverse proxy / load balancer.
#[derive(Debug, Parser)]
#[command(name = "balancer", version)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => BalancerConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        pool_size = config.backends.len(),
        probe_interval_ms = config.health_check.interval_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
