pub mod cli;
pub mod core;
pub mod notifiers;
pub mod providers;
pub mod reports;
pub mod store;

use crate::cli::export::ExportArgs;
use crate::cli::forecast::ForecastArgs;
use crate::cli::show::ShowArgs;
use crate::cli::watch::WatchArgs;
use crate::core::QuoteProvider;
use crate::core::config::AppConfig;
use crate::providers::awesome_api::AwesomeApiProvider;
use crate::store::KeyValueStore;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    Show(ShowArgs),
    Forecast(ForecastArgs),
    Export(ExportArgs),
    Watch(WatchArgs),
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("dashfin starting...");

    let mut config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    config.apply_env()?;
    config.normalize()?;
    debug!(
        currencies = ?config.currencies,
        reference = %config.reference_currency,
        "Loaded config"
    );

    let data_path = config.default_data_path()?;
    let store = Arc::new(KeyValueStore::new(Some(&data_path)));
    debug!(
        "Using data path {} (persistent: {})",
        data_path.display(),
        store.is_persistent()
    );

    let provider: Arc<dyn QuoteProvider> = Arc::new(AwesomeApiProvider::new(
        &config.providers.awesome_api.base_url,
        &store,
        quote_cache_ttl(&config, &command),
    )?);

    match command {
        AppCommand::Show(args) => cli::show::run(&args, &config, provider.as_ref(), &store).await,
        AppCommand::Forecast(args) => {
            cli::forecast::run(&args, &config, provider.as_ref(), &store).await
        }
        AppCommand::Export(args) => cli::export::run(&args, &config, provider.as_ref(), &store)
            .await
            .map(|_| ()),
        AppCommand::Watch(args) => cli::watch::run(&args, &config, provider, store).await,
    }
}

/// How long fetched quotes are reused. `watch` never reuses quotes across
/// refreshes.
fn quote_cache_ttl(config: &AppConfig, command: &AppCommand) -> Duration {
    let ttl = Duration::from_secs(config.providers.awesome_api.cache_ttl_secs);
    match command {
        AppCommand::Watch(args) => ttl.min(args.interval(config)),
        _ => ttl,
    }
}
