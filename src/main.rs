use clap::Parser;
use config::ConfigError;
use front_office::adapters::NbaStatsClient;
use front_office::cache::CacheStore;
use front_office::cli::{self, Cli};
use front_office::config::AppConfig;
use front_office::error::{FrontOfficeError, Result};
use front_office::logging::init_logging;
use front_office::services::FetchOrchestrator;
use std::sync::Arc;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)?;
    if let Err(errors) = config.validate() {
        return Err(ConfigError::Message(errors.join("; ")).into());
    }

    let _log_guard = init_logging(&config.logging)?;

    let policy = config
        .refresh_policy()
        .map_err(|e| FrontOfficeError::Config(ConfigError::Message(e)))?;
    let client = NbaStatsClient::new(&config.upstream)?;
    let store = CacheStore::new(config.cache.resolved_path(), policy);
    debug!("Using cache at {}", store.path().display());

    let orchestrator = FetchOrchestrator::new(
        Arc::new(client),
        store,
        config.rate_limiter(),
        config.retry_policy(),
    )
    .await;

    cli::run(cli.command, &orchestrator).await;
    Ok(())
}
