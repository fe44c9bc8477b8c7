use anyhow::{Context, Result};
use clap::Parser;

mod cli;
mod config;
mod env;
mod output;
mod runner;

use cli::Cli;
use config::{ProjectConfig, RunSettings};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let dotenv_path = env::load_dotenv_from_ancestors()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("feedwatch=info".parse()?),
        )
        .init();

    if let Some(path) = dotenv_path {
        tracing::debug!(path = %path.display(), "Using .env");
    }

    let cli = Cli::parse();

    let config = ProjectConfig::load(&cli.config)?;
    let settings = RunSettings::resolve(&config, &cli).context("Invalid configuration")?;

    runner::run(settings).await
}
