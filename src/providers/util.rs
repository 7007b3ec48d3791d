use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// How often and how patiently a request is repeated.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub retries: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Sends a request until it gets a response. Only transport failures are
/// repeated; an HTTP error status is a response and is returned as is.
pub async fn with_retry<F, Fut, T>(policy: RetryPolicy, mut send: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut failures = 0;
    loop {
        match send().await {
            Ok(response) => return Ok(response),
            Err(e) if failures < policy.retries => {
                failures += 1;
                debug!(
                    "Request failed ({}/{}): {}. Retrying in {:?}",
                    failures, policy.retries, e, policy.delay
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
