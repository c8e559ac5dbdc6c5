//! Fleet telemetry ingestion daemon
//!
//! Accepts authenticated telemetry submissions over HTTP, fans each
//! accepted reading out to the bulk, state, and alert pipelines, and
//! exposes the ingestion counters on `/metrics`.
//!
//! # Usage
//!
//! ```bash
//! # All configuration comes from the environment; defaults target local stores
//! fleet-ingestd
//! fleet-ingestd --log-level debug
//! ```

mod http;
mod serve;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Fleet telemetry ingestion service
#[derive(Parser, Debug)]
#[command(name = "fleet-ingestd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let config = fleet_config::Config::from_env();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.http_port,
        "fleet ingestion starting"
    );

    serve::run(config).await
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
