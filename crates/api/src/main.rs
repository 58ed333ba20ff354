//! Fraud Scoring API - Main Entry Point

use anyhow::{Context, Result};
use api::config::ServerConfig;
use api::{init_logging, run_server};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fraud-api", version, about = "Serve fraud predictions over HTTP", long_about = None)]
struct Cli {
    /// TOML configuration file, overridden by FRAUD_* environment variables
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ServerConfig::load(cli.config.as_deref())
        .context("Failed to load server configuration")?;
    init_logging(&config.logging)?;

    info!("=== Fraud Scoring API v{} ===", env!("CARGO_PKG_VERSION"));
    run_server(config).await?;

    Ok(())
}
