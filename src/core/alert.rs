//! Threshold alerts with a per-rule cooldown.

use crate::core::forecast::{self, ForecastModel};
use crate::core::quote::QuoteSeries;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Days of forecast used to estimate when a target will be reached.
pub const TARGET_FORECAST_DAYS: usize = 14;

#[derive(Debug, Clone, PartialEq)]
pub struct AlertRule {
    pub currency: String,
    pub target: f64,
    pub cooldown: Duration,
}

impl AlertRule {
    pub fn new(currency: &str, target: f64, cooldown: Duration) -> Self {
        Self {
            currency: currency.to_string(),
            target,
            cooldown,
        }
    }

    fn key(&self) -> (String, u64) {
        (self.currency.to_uppercase(), self.target.to_bits())
    }
}

/// Remembers when each (currency, target) pair last produced an alert.
#[derive(Default)]
pub struct CooldownTracker {
    last_sent: Mutex<HashMap<(String, u64), DateTime<Utc>>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn can_send(&self, rule: &AlertRule, now: DateTime<Utc>) -> bool {
        let last_sent = self.last_sent.lock().await;
        match last_sent.get(&rule.key()) {
            None => true,
            // A negative elapsed time means the clock moved back; stay quiet.
            Some(last) => (now - *last)
                .to_std()
                .is_ok_and(|elapsed| elapsed >= rule.cooldown),
        }
    }

    pub async fn mark_sent(&self, rule: &AlertRule, now: DateTime<Utc>) {
        self.last_sent.lock().await.insert(rule.key(), now);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short channel name used in logs, e.g. `email`.
    fn channel(&self) -> &str;
    async fn send(&self, message: &AlertMessage) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub channel: String,
    pub error: Option<String>,
}

impl Delivery {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertOutcome {
    NoData,
    BelowTarget { current: f64 },
    CoolingDown { current: f64 },
    Triggered {
        message: AlertMessage,
        deliveries: Vec<Delivery>,
    },
}

pub fn compose_message(
    series: &QuoteSeries,
    target: f64,
    days_to_target: Option<usize>,
) -> Option<AlertMessage> {
    let last = series.last()?;
    let pair = series.pair();
    let reference = &series.reference;

    let forecast_line = match days_to_target {
        Some(days) => format!("Forecast: target reached in ~{days} day(s)"),
        None => format!("Forecast: not expected within the next {TARGET_FORECAST_DAYS} days"),
    };

    let subject = format!("[Alert] {pair} crossed {reference} {target:.2}");
    let body = format!(
        "Automatic alert: {pair} crossed the target value!\n\n\
         Current value: {reference} {:.4}\n\
         Target: {reference} {target:.2}\n\
         Last quote at: {}\n\
         {forecast_line}\n\n\
         Sent by dashfin.",
        last.bid,
        last.timestamp.format("%Y-%m-%d %H:%M"),
    );

    Some(AlertMessage { subject, body })
}

/// Alerts through every notifier when the last quote is at or above the
/// rule's target and the rule is not cooling down. The cooldown restarts only
/// if at least one channel delivered.
pub async fn check_and_alert(
    series: &QuoteSeries,
    rule: &AlertRule,
    tracker: &CooldownTracker,
    notifiers: &[Box<dyn Notifier>],
    now: DateTime<Utc>,
) -> AlertOutcome {
    let Some(current) = series.last().map(|q| q.bid) else {
        return AlertOutcome::NoData;
    };

    if current < rule.target {
        debug!(current, target = rule.target, "Below alert target");
        return AlertOutcome::BelowTarget { current };
    }

    if !tracker.can_send(rule, now).await {
        info!("Cooldown active for {} at {}, skipping alert", series.pair(), rule.target);
        return AlertOutcome::CoolingDown { current };
    }

    let days = match forecast::forecast(series, TARGET_FORECAST_DAYS, ForecastModel::Linear) {
        Ok(points) => forecast::days_to_target(&points, rule.target),
        Err(e) => {
            warn!("Forecast failed for {}: {}", series.pair(), e);
            None
        }
    };

    let Some(message) = compose_message(series, rule.target, days) else {
        return AlertOutcome::NoData;
    };

    let deliveries: Vec<Delivery> = join_all(notifiers.iter().map(|notifier| {
        let message = &message;
        async move {
            let result = notifier.send(message).await;
            if let Err(e) = &result {
                warn!("Failed to send {} alert: {:#}", notifier.channel(), e);
            }
            Delivery {
                channel: notifier.channel().to_string(),
                error: result.err().map(|e| e.to_string()),
            }
        }
    }))
    .await;

    if deliveries.iter().any(Delivery::succeeded) {
        tracker.mark_sent(rule, now).await;
    }

    AlertOutcome::Triggered {
        message,
        deliveries,
    }
}
