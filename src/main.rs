//! Realtime gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌────────────────────────────────────────────────┐
//!                       │                   GATEWAY                      │
//!   Client Request      │  ┌──────────┐   ┌────────────┐   ┌──────────┐  │
//!   ────────────────────┼─▶│ request  │──▶│ rate limit │──▶│ cache /  │  │
//!                       │  │   id     │   │  (429?)    │   │  cors    │  │
//!                       │  └──────────┘   └────────────┘   └────┬─────┘  │
//!                       │                                       ▼        │
//!                       │                              ┌──────────────┐  │
//!                       │                              │   routing    │  │
//!                       │                              │  (classify)  │  │
//!                       │                              └──┬────┬────┬─┘  │
//!                       │                                 ▼    ▼    ▼    │
//!                       │                        messaging   api   static│
//!                       └────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use realtime_gateway::config::{load_config, validation::validate_config};
use realtime_gateway::observability::{logging, metrics};
use realtime_gateway::security::rate_limit::spawn_sweeper;
use realtime_gateway::{GatewayServer, Handlers, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "realtime-gateway")]
#[command(about = "Rate-limited router for messaging, API and frontend traffic", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// Validate the configuration, print it, and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config)
            .map_err(realtime_gateway::config::ConfigError::Validation)?;
    }

    if cli.check_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "realtime-gateway starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let handlers = Handlers::from_config(&config)?;
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = GatewayServer::new(config, handlers)?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();
    let sweeper = spawn_sweeper(Arc::clone(server.limiter()), shutdown.subscribe());

    server.run(listener, shutdown.subscribe()).await?;
    shutdown.trigger();
    let _ = sweeper.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
