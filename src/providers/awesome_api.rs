use crate::core::cache::{KeyValueCollection, Store};
use crate::core::{Quote, QuoteProvider, QuoteSeries};
use crate::providers::util::{RetryPolicy, with_retry};
use crate::store::KeyValueStore;
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Daily quotes from the AwesomeAPI currency endpoint.
pub struct AwesomeApiProvider {
    base_url: String,
    cache: Arc<dyn KeyValueCollection>,
    ttl: Duration,
}

impl AwesomeApiProvider {
    pub fn new(base_url: &str, store: &KeyValueStore, ttl: Duration) -> Result<Self> {
        let collection = store
            .get_collection("quotes", true, true)
            .ok_or_else(|| anyhow!("Could not open the quotes cache"))?;
        Ok(Self::new_with_collection(base_url, collection, ttl))
    }

    pub fn new_with_collection(
        base_url: &str,
        cache: Arc<dyn KeyValueCollection>,
        ttl: Duration,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            ttl,
        }
    }
}

/// The endpoint sends numbers as JSON strings, but accept plain numbers too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Number {
    Float(f64),
    Text(String),
}

impl Number {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Number::Float(v) => Some(*v),
            Number::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Number::Float(v) => Some(*v as i64),
            Number::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DailyQuote {
    bid: Number,
    timestamp: Number,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

fn parse_quotes(pair: &str, items: &[DailyQuote]) -> Result<Vec<Quote>> {
    items
        .iter()
        .map(|item| {
            let bid = item
                .bid
                .as_f64()
                .filter(|bid| bid.is_finite())
                .ok_or_else(|| anyhow!("Invalid bid {:?} for pair: {}", item.bid, pair))?;
            let timestamp = item
                .timestamp
                .as_i64()
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
                .ok_or_else(|| {
                    anyhow!("Invalid timestamp {:?} for pair: {}", item.timestamp, pair)
                })?;
            Ok(Quote { timestamp, bid })
        })
        .collect()
}

#[async_trait]
impl QuoteProvider for AwesomeApiProvider {
    #[instrument(name = "AwesomeApiFetch", skip(self))]
    async fn fetch_daily(
        &self,
        currency: &str,
        reference: &str,
        days: u32,
    ) -> Result<QuoteSeries> {
        if days == 0 {
            bail!("At least one day of history is required");
        }

        let pair = format!("{currency}-{reference}");
        let cache_key = format!("{pair}/{days}");
        if let Some(cached) = self.cache.get(cache_key.as_bytes()).await {
            match serde_json::from_slice(&cached) {
                Ok(series) => return Ok(series),
                Err(e) => debug!("Ignoring unreadable cache entry {}: {}", cache_key, e),
            }
        }

        let url = format!("{}/json/daily/{}/{}", self.base_url, pair, days);
        debug!("Requesting quotes from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("dashfin/1.0")
            .timeout(Duration::from_secs(30))
            .build()?;
        let response = with_retry(RetryPolicy::default(), || client.get(&url).send())
            .await
            .with_context(|| format!("Failed to send request for pair: {pair}"))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .with_context(|| format!("Failed to get response text for pair: {pair}"))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&response_text)
                .ok()
                .and_then(|e| e.message)
                .map(|m| format!(" ({m})"))
                .unwrap_or_default();
            bail!("HTTP error: {} for pair: {}{}", status, pair, detail);
        }

        let items: Vec<DailyQuote> = serde_json::from_str(&response_text)
            .with_context(|| format!("Failed to parse quotes for pair: {pair}"))?;
        if items.is_empty() {
            bail!("No quotes found for pair: {}", pair);
        }

        let series = QuoteSeries::new(currency, reference, parse_quotes(&pair, &items)?);
        debug!(
            "Fetched {} quotes for {}, last bid {:?}",
            series.len(),
            pair,
            series.last().map(|q| q.bid)
        );

        self.cache
            .put(
                cache_key.as_bytes(),
                &serde_json::to_vec(&series)?,
                Some(self.ttl),
            )
            .await;

        Ok(series)
    }
}
