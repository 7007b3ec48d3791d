//! Quote abstractions and core types

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single bid price observed at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub timestamp: DateTime<Utc>,
    pub bid: f64,
}

/// Quotes for one currency pair, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSeries {
    pub currency: String,
    pub reference: String,
    pub quotes: Vec<Quote>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub last: f64,
}

impl QuoteSeries {
    /// Builds a series sorted by timestamp. For duplicate timestamps the last
    /// occurrence wins.
    pub fn new(currency: &str, reference: &str, mut quotes: Vec<Quote>) -> Self {
        quotes.reverse();
        quotes.sort_by_key(|q| q.timestamp);
        quotes.dedup_by_key(|q| q.timestamp);

        Self {
            currency: currency.to_string(),
            reference: reference.to_string(),
            quotes,
        }
    }

    pub fn pair(&self) -> String {
        format!("{}/{}", self.currency, self.reference)
    }

    pub fn last(&self) -> Option<&Quote> {
        self.quotes.last()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn bids(&self) -> Vec<f64> {
        self.quotes.iter().map(|q| q.bid).collect()
    }

    pub fn stats(&self) -> Option<SeriesStats> {
        let last = self.last()?.bid;
        let (sum, min, max) = self.quotes.iter().fold(
            (0.0, f64::INFINITY, f64::NEG_INFINITY),
            |(sum, min, max), q| (sum + q.bid, min.min(q.bid), max.max(q.bid)),
        );

        Some(SeriesStats {
            mean: sum / self.quotes.len() as f64,
            min,
            max,
            last,
        })
    }
}

/// Normalizes a currency code such as ` usd ` into `USD`.
pub fn normalize_currency(code: &str) -> Result<String> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        bail!("Currency code must not be empty");
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        bail!("Invalid currency code: {}", code);
    }
    Ok(code)
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetches the last `days` daily quotes of `currency` priced in `reference`.
    async fn fetch_daily(&self, currency: &str, reference: &str, days: u32)
    -> Result<QuoteSeries>;
}
