//! Reverse-proxy load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                    LOAD BALANCER                     │
//!                     │                                                      │
//!   Client Request    │  ┌────────────┐   ┌────────────┐   ┌─────────────┐  │
//!   ──────────────────┼─▶│ throttling │──▶│  strategy  │──▶│  forwarder  │──┼──▶ Upstream
//!                     │  │  (window)  │   │  (select)  │   │  (stream)   │  │
//!                     │  └─────┬──────┘   └─────┬──────┘   └──────┬──────┘  │
//!   429 when full  ◀──┼────────┘                │ release         │         │
//!                     │                         └──◀── guard ◀────┘         │
//!   Client Response ◀─┼──────────────── streamed body / 502 ────────┘        │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use lb_proxy::config::load_config;
use lb_proxy::observability::{logging, metrics};
use lb_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "lb-proxy")]
#[command(about = "Reverse-proxy load balancer", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            tracing::error!(path = %cli.config.display(), error = %e, "Invalid configuration, refusing to start");
            return Err(e.into());
        }
    };

    logging::init(&config.observability.log_level);
    tracing::info!(
        bind_address = %config.listener.bind_address,
        strategy = %config.load_balancer.strategy,
        servers = config.load_balancer.servers.len(),
        request_limit = config.throttling.request_limit,
        "Configuration loaded"
    );

    // Build everything before binding so a bad config never serves traffic.
    let server = HttpServer::new(config.clone())?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
