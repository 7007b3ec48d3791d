pub mod export;
pub mod forecast;
pub mod setup;
pub mod show;
pub mod ui;
pub mod watch;

use crate::core::config::AppConfig;
use crate::core::quote::normalize_currency;
use crate::core::{QuoteProvider, QuoteSeries};
use anyhow::Result;

/// The requested currency, or the first configured one.
pub(crate) fn resolve_currency(requested: Option<&str>, config: &AppConfig) -> Result<String> {
    normalize_currency(requested.unwrap_or_else(|| config.default_currency()))
}

/// Fetches a series behind a spinner.
pub(crate) async fn fetch_series(
    provider: &dyn QuoteProvider,
    currency: &str,
    reference: &str,
    days: u32,
) -> Result<QuoteSeries> {
    let spinner = ui::new_spinner(&format!("Fetching {currency}/{reference} quotes"));
    let result = provider.fetch_daily(currency, reference, days).await;
    spinner.finish_and_clear();
    result
}
