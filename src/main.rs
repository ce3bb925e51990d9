//! Payment failover service.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌───────────────────────────────────────────────────┐
//!                    │                 PAYMENT SERVICE                    │
//!   GET|POST /pay    │  ┌─────────┐    ┌────────────┐    ┌────────────┐  │
//!  ──────────────────┼─▶│  http   │───▶│ dispatcher │───▶│  breaker   │──┼──▶ Primary
//!                    │  │ server  │    │            │    │ (resilience│  │    gateway
//!                    │  └─────────┘    │            │    └────────────┘  │
//!                    │                 │            │  on failure/reject │
//!                    │                 │            │───────────────────-┼──▶ Secondary
//!                    │                 └────────────┘                    │    gateway
//!                    │                                                   │
//!                    │  config · observability · lifecycle · admin       │
//!                    └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use payment_failover::config::{load_config, FailoverConfig};
use payment_failover::observability::init_logging;
use payment_failover::{AppResult, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "payment-failover")]
#[command(about = "Payment service with circuit-breaker guarded failover", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => FailoverConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability)?;
    tracing::info!("payment-failover v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        breaker = %config.breaker.name,
        request_timeout_secs = config.timeouts.request_secs,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
