use super::{resolve_currency, ui};
use crate::core::alert::{AlertOutcome, AlertRule, CooldownTracker, Notifier, check_and_alert};
use crate::core::automation::Automator;
use crate::core::config::{AlertsConfig, AppConfig};
use crate::core::{QuoteProvider, QuoteSeries};
use crate::notifiers::{EmailNotifier, WhatsAppNotifier};
use crate::reports::{self, ReportFormat};
use crate::store::KeyValueStore;
use anyhow::{Context, Result};
use chrono::{Local, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct WatchArgs {
    pub currency: Option<String>,
    pub days: Option<u32>,
    pub interval_secs: Option<u64>,
    pub target: Option<f64>,
    pub cooldown_secs: Option<u64>,
    pub email: bool,
    pub whatsapp: bool,
    pub email_to: Option<String>,
    pub whatsapp_to: Option<String>,
    /// Write XLSX and PDF reports on every refresh.
    pub reports: bool,
}

impl WatchArgs {
    /// Seconds between refreshes, from the command line or the config.
    pub fn interval(&self, config: &AppConfig) -> Duration {
        Duration::from_secs(
            self.interval_secs
                .unwrap_or(config.automation.interval_secs),
        )
    }
}

/// Builds the notifiers to alert through. Without `--email` or `--whatsapp`
/// every configured channel is used.
pub fn build_notifiers(args: &WatchArgs, alerts: &AlertsConfig) -> Vec<Box<dyn Notifier>> {
    let all_configured = !args.email && !args.whatsapp;
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

    if args.email || (all_configured && alerts.email.is_configured()) {
        match EmailNotifier::from_config(&alerts.email, args.email_to.as_deref()) {
            Some(notifier) => notifiers.push(Box::new(notifier)),
            None => warn!("E-mail alerts need a host, user, password and recipient; skipping"),
        }
    }

    if args.whatsapp || (all_configured && alerts.whatsapp.is_configured()) {
        match WhatsAppNotifier::from_config(&alerts.whatsapp, args.whatsapp_to.as_deref()) {
            Some(notifier) => notifiers.push(Box::new(notifier)),
            None => warn!("WhatsApp alerts need an account SID, token, sender and recipient; skipping"),
        }
    }

    notifiers
}

/// State shared by every refresh of the watch loop.
pub struct WatchContext {
    provider: Arc<dyn QuoteProvider>,
    store: Arc<KeyValueStore>,
    currency: String,
    reference: String,
    days: u32,
    rule: Option<AlertRule>,
    tracker: CooldownTracker,
    notifiers: Vec<Box<dyn Notifier>>,
    reports_folder: Option<PathBuf>,
}

impl WatchContext {
    pub fn new(
        args: &WatchArgs,
        config: &AppConfig,
        provider: Arc<dyn QuoteProvider>,
        store: Arc<KeyValueStore>,
    ) -> Result<Self> {
        let currency = resolve_currency(args.currency.as_deref(), config)?;
        let cooldown =
            Duration::from_secs(args.cooldown_secs.unwrap_or(config.alerts.cooldown_secs));
        let rule = args
            .target
            .or(config.alerts.target)
            .map(|target| AlertRule::new(&currency, target, cooldown));

        Ok(Self {
            provider,
            store,
            days: args.days.unwrap_or(config.history_days),
            reference: config.reference_currency.clone(),
            currency,
            rule,
            tracker: CooldownTracker::new(),
            notifiers: build_notifiers(args, &config.alerts),
            reports_folder: args.reports.then(|| config.reports.folder.clone()),
        })
    }

    /// One refresh: fetch, store, alert, then report. Only a failed fetch
    /// fails the tick; storage and report errors are logged.
    pub async fn tick(&self) -> Result<Option<AlertOutcome>> {
        let series = self
            .provider
            .fetch_daily(&self.currency, &self.reference, self.days)
            .await?;
        if let Err(e) = self.store.save_snapshot(&series).await {
            warn!("Failed to store quotes for {}: {:#}", series.pair(), e);
        }
        println!("{}", self.status_line(&series));

        let outcome = match &self.rule {
            Some(rule) => Some(self.alert(&series, rule).await),
            None => None,
        };

        if let Some(folder) = &self.reports_folder {
            let now = Local::now().naive_local();
            for format in [ReportFormat::Xlsx, ReportFormat::Pdf] {
                if let Err(e) = reports::write_report(folder, &series, format, now) {
                    warn!("{:#}", e);
                }
            }
        }

        Ok(outcome)
    }

    async fn alert(&self, series: &QuoteSeries, rule: &AlertRule) -> AlertOutcome {
        let outcome = check_and_alert(series, rule, &self.tracker, &self.notifiers, Utc::now()).await;
        if let AlertOutcome::Triggered { message, deliveries } = &outcome {
            println!("{}", ui::style_text(&message.subject, ui::StyleType::Alert));
            if deliveries.is_empty() {
                println!(
                    "{}",
                    ui::style_text("No alert channel configured", ui::StyleType::Subtle)
                );
            }
            for delivery in deliveries {
                match &delivery.error {
                    None => println!("  sent via {}", delivery.channel),
                    Some(e) => println!(
                        "  {}",
                        ui::style_text(
                            &format!("{} failed: {}", delivery.channel, e),
                            ui::StyleType::Error
                        )
                    ),
                }
            }
        }
        outcome
    }

    fn status_line(&self, series: &QuoteSeries) -> String {
        let time = Local::now().format("%H:%M:%S");
        let current = series
            .last()
            .map_or_else(|| "no quotes".to_string(), |q| format!("{} {:.4}", self.reference, q.bid));
        match &self.rule {
            Some(rule) => format!(
                "[{time}] {} {current} (target {} {:.2})",
                series.pair(),
                self.reference,
                rule.target
            ),
            None => format!("[{time}] {} {current}", series.pair()),
        }
    }
}

pub async fn run(
    args: &WatchArgs,
    config: &AppConfig,
    provider: Arc<dyn QuoteProvider>,
    store: Arc<KeyValueStore>,
) -> Result<()> {
    let context = Arc::new(WatchContext::new(args, config, provider, store)?);
    if context.rule.is_some() && context.notifiers.is_empty() {
        warn!("No alert channel configured; alerts will only be printed");
    }

    let interval = args.interval(config);
    println!(
        "Watching {}/{} every {:?}. Press Ctrl-C to stop.",
        context.currency, context.reference, interval
    );

    let mut automator = Automator::new();
    let tick_context = Arc::clone(&context);
    automator.start(interval, move || {
        let context = Arc::clone(&tick_context);
        async move { context.tick().await.map(|_| ()) }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    automator.stop().await;
    info!("Watch stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Quote;
    use crate::core::alert::AlertMessage;
    use crate::core::config::{EmailConfig, WhatsAppConfig};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct StaticProvider {
        bid: f64,
    }

    #[async_trait]
    impl QuoteProvider for StaticProvider {
        async fn fetch_daily(&self, currency: &str, reference: &str, days: u32) -> Result<QuoteSeries> {
            let quotes = (0..days)
                .map(|i| Quote {
                    timestamp: Utc.timestamp_opt(1_709_251_200 + i as i64 * 86_400, 0).unwrap(),
                    bid: self.bid,
                })
                .collect();
            Ok(QuoteSeries::new(currency, reference, quotes))
        }
    }

    struct CountingNotifier {
        sent: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        fn channel(&self) -> &str {
            "counting"
        }

        async fn send(&self, _message: &AlertMessage) -> Result<()> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn context(bid: f64, args: &WatchArgs, config: &AppConfig) -> WatchContext {
        WatchContext::new(
            args,
            config,
            Arc::new(StaticProvider { bid }),
            Arc::new(KeyValueStore::in_memory()),
        )
        .unwrap()
    }

    fn full_alerts() -> AlertsConfig {
        AlertsConfig {
            email: EmailConfig {
                host: Some("smtp.example.com".to_string()),
                port: None,
                user: Some("alerts@example.com".to_string()),
                password: Some("secret".to_string()),
                to: Some("me@example.com".to_string()),
            },
            whatsapp: WhatsAppConfig {
                account_sid: Some("AC123".to_string()),
                auth_token: Some("token".to_string()),
                from: Some("whatsapp:+14155238886".to_string()),
                to: Some("whatsapp:+5511999999999".to_string()),
                ..WhatsAppConfig::default()
            },
            ..AlertsConfig::default()
        }
    }

    fn channels(notifiers: &[Box<dyn Notifier>]) -> Vec<&str> {
        notifiers.iter().map(|n| n.channel()).collect()
    }

    #[test]
    fn test_build_notifiers_defaults_to_configured() {
        let notifiers = build_notifiers(&WatchArgs::default(), &full_alerts());
        assert_eq!(channels(&notifiers), vec!["email", "whatsapp"]);

        let notifiers = build_notifiers(&WatchArgs::default(), &AlertsConfig::default());
        assert!(notifiers.is_empty());
    }

    #[test]
    fn test_build_notifiers_honours_flags() {
        let args = WatchArgs {
            whatsapp: true,
            ..WatchArgs::default()
        };
        let notifiers = build_notifiers(&args, &full_alerts());
        assert_eq!(channels(&notifiers), vec!["whatsapp"]);

        // Requested but not configured.
        let args = WatchArgs {
            email: true,
            ..WatchArgs::default()
        };
        assert!(build_notifiers(&args, &AlertsConfig::default()).is_empty());
    }

    #[tokio::test]
    async fn test_tick_without_target_only_refreshes() {
        let ctx = context(5.0, &WatchArgs::default(), &AppConfig::default());
        assert!(ctx.tick().await.unwrap().is_none());

        let stored = ctx.store.load_snapshot("USD", "BRL").await.unwrap().unwrap();
        assert_eq!(stored.len(), 7);
    }

    #[tokio::test]
    async fn test_tick_alerts_once_per_cooldown() {
        let args = WatchArgs {
            target: Some(6.0),
            ..WatchArgs::default()
        };
        let mut ctx = context(6.1, &args, &AppConfig::default());
        let sent = Arc::new(AtomicUsize::new(0));
        ctx.notifiers = vec![Box::new(CountingNotifier {
            sent: Arc::clone(&sent),
        })];

        let first = ctx.tick().await.unwrap().unwrap();
        assert!(matches!(first, AlertOutcome::Triggered { .. }));
        let second = ctx.tick().await.unwrap().unwrap();
        assert!(matches!(second, AlertOutcome::CoolingDown { .. }));
        assert_eq!(sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tick_below_target() {
        let args = WatchArgs {
            target: Some(6.0),
            ..WatchArgs::default()
        };
        let ctx = context(5.2, &args, &AppConfig::default());
        let outcome = ctx.tick().await.unwrap().unwrap();
        assert_eq!(outcome, AlertOutcome::BelowTarget { current: 5.2 });
    }

    #[tokio::test]
    async fn test_tick_writes_reports() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.reports.folder = dir.path().to_path_buf();
        let args = WatchArgs {
            reports: true,
            ..WatchArgs::default()
        };

        context(5.0, &args, &config).tick().await.unwrap();

        let mut extensions: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| {
                entry
                    .unwrap()
                    .path()
                    .extension()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        extensions.sort();
        assert_eq!(extensions, vec!["pdf", "xlsx"]);
    }

    #[tokio::test]
    async fn test_unwritable_reports_folder_does_not_block_alerts() {
        let dir = TempDir::new().unwrap();
        let not_a_folder = dir.path().join("reports");
        std::fs::write(&not_a_folder, "taken").unwrap();
        let mut config = AppConfig::default();
        config.reports.folder = not_a_folder;
        let args = WatchArgs {
            target: Some(6.0),
            reports: true,
            ..WatchArgs::default()
        };
        let mut ctx = context(6.5, &args, &config);
        let sent = Arc::new(AtomicUsize::new(0));
        ctx.notifiers = vec![Box::new(CountingNotifier {
            sent: Arc::clone(&sent),
        })];

        let outcome = ctx.tick().await.unwrap().unwrap();
        assert!(matches!(outcome, AlertOutcome::Triggered { .. }));
        assert_eq!(sent.load(Ordering::SeqCst), 1);
    }
}
