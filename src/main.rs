use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use talent_workflow::cli::{self, Cli};
use talent_workflow::core::ConfigManager;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "talent_workflow=info,talentflow=info,rocket::server=off";

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("Invalid log filter")?;

    // JSON lines to a file when asked, human-readable stderr otherwise
    match std::env::var("TALENTFLOW_LOG_FILE") {
        Ok(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(file)
                        .with_current_span(false)
                        .with_span_list(false),
                )
                .with(filter)
                .init();
        }
        Err(_) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let cli = Cli::parse();
    let config = ConfigManager::load()?;
    cli::run(cli, config).await
}
