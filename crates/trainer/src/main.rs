//! Fraud Model Trainer - Command Line Entry Point

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trainer::config::{LoggingConfig, TrainerConfig};
use trainer::synthetic::generate_datasets;

#[derive(Parser, Debug)]
#[command(name = "fraud-trainer", version, about = "Train the fraud scoring model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// TOML configuration file, overridden by FRAUD_* environment variables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Write seeded synthetic train and test CSVs
    Generate,
    /// Fit the pipeline and classifier, then persist the artifacts (default)
    Train,
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Invalid log filter")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
    .map_err(|e| anyhow!("Failed to set tracing subscriber: {}", e))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = TrainerConfig::load(cli.config.as_deref())
        .context("Failed to load trainer configuration")?;
    init_logging(&config.logging)?;
    info!("=== Fraud Model Trainer v{} ===", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Command::Train) {
        Command::Generate => {
            let now = chrono::Local::now().naive_local();
            let (train, test) = generate_datasets(&config.synthetic, now)
                .context("Failed to generate synthetic data")?;
            println!("Wrote {} and {}", train.display(), test.display());
        }
        Command::Train => {
            let summary = trainer::train(&config).context("Training failed")?;
            println!("{}", summary.report);
            println!(
                "Run {}: {} rows loaded, {} skipped, {} after balancing, {} features",
                summary.run_id,
                summary.rows_loaded,
                summary.rows_skipped,
                summary.rows_balanced,
                summary.n_features
            );
        }
    }
    Ok(())
}
