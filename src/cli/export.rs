use super::{fetch_series, resolve_currency};
use crate::core::QuoteProvider;
use crate::core::config::AppConfig;
use crate::reports::{self, ReportFormat};
use crate::store::KeyValueStore;
use anyhow::{Result, bail};
use chrono::Local;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ExportArgs {
    pub currency: Option<String>,
    pub format: ReportFormat,
    /// Fetch fresh quotes instead of exporting the stored snapshot.
    pub refresh: bool,
    pub days: Option<u32>,
}

pub async fn run(
    args: &ExportArgs,
    config: &AppConfig,
    provider: &dyn QuoteProvider,
    store: &KeyValueStore,
) -> Result<PathBuf> {
    let currency = resolve_currency(args.currency.as_deref(), config)?;
    let reference = &config.reference_currency;

    let series = if args.refresh {
        let days = args.days.unwrap_or(config.history_days);
        let series = fetch_series(provider, &currency, reference, days).await?;
        store.save_snapshot(&series).await?;
        series
    } else {
        match store.load_snapshot(&currency, reference).await? {
            Some(series) => {
                debug!("Exporting stored snapshot with {} quotes", series.len());
                series
            }
            None => bail!(
                "No stored quotes for {currency}/{reference}. Run `dashfin show {currency}` \
                 or pass --refresh first"
            ),
        }
    };

    let path = reports::write_report(
        &config.reports.folder,
        &series,
        args.format,
        Local::now().naive_local(),
    )?;
    println!("Report saved to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Quote, QuoteSeries};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    struct StaticProvider;

    #[async_trait]
    impl QuoteProvider for StaticProvider {
        async fn fetch_daily(&self, currency: &str, reference: &str, days: u32) -> Result<QuoteSeries> {
            let quotes = (0..days)
                .map(|i| Quote {
                    timestamp: Utc.timestamp_opt(1_709_251_200 + i as i64 * 86_400, 0).unwrap(),
                    bid: 5.0 + i as f64 * 0.01,
                })
                .collect();
            Ok(QuoteSeries::new(currency, reference, quotes))
        }
    }

    fn config(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.reports.folder = dir.path().join("reports");
        config
    }

    fn args(refresh: bool) -> ExportArgs {
        ExportArgs {
            currency: Some("usd".to_string()),
            format: ReportFormat::Csv,
            refresh,
            days: Some(4),
        }
    }

    #[tokio::test]
    async fn test_export_without_snapshot_fails() {
        let dir = TempDir::new().unwrap();
        let store = KeyValueStore::in_memory();

        let err = run(&args(false), &config(&dir), &StaticProvider, &store)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("No stored quotes for USD/BRL"));
    }

    #[tokio::test]
    async fn test_export_refresh_then_from_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = KeyValueStore::in_memory();
        let config = config(&dir);

        let fresh = run(&args(true), &config, &StaticProvider, &store).await.unwrap();
        assert!(fresh.starts_with(dir.path().join("reports")));
        assert!(
            fresh
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("USD_quotes_")
        );

        let stored = store.load_snapshot("USD", "BRL").await.unwrap().unwrap();
        assert_eq!(stored.len(), 4);

        let pdf = ExportArgs {
            format: ReportFormat::Pdf,
            ..args(false)
        };
        let path = run(&pdf, &config, &StaticProvider, &store).await.unwrap();
        assert_eq!(path.extension().unwrap(), "pdf");
        assert!(path.exists());
    }
}
