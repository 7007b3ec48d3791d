//! Periodic refresh loop.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const MIN_INTERVAL: Duration = Duration::from_secs(1);
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs a tick function on a background task, sleeping `interval` between
/// runs, until stopped.
#[derive(Default)]
pub struct Automator {
    handle: Option<JoinHandle<()>>,
    stop_tx: Option<watch::Sender<bool>>,
    min_interval: Option<Duration>,
}

impl Automator {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn with_min_interval(min_interval: Duration) -> Self {
        Self {
            min_interval: Some(min_interval),
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Starts the loop. Returns `false` if it is already running.
    pub fn start<F, Fut>(&mut self, interval: Duration, mut tick: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        if self.is_running() {
            return false;
        }

        let interval = interval.max(self.min_interval.unwrap_or(MIN_INTERVAL));
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            loop {
                if *stop_rx.borrow() {
                    break;
                }
                if let Err(e) = tick().await {
                    warn!("Refresh failed: {:#}", e);
                }
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Automation loop finished");
        });

        self.handle = Some(handle);
        self.stop_tx = Some(stop_tx);
        debug!(?interval, "Automation started");
        true
    }

    /// Stops the loop and waits briefly for it to finish, aborting a tick that
    /// overruns the wait. Returns `false` if nothing was running. A loop that
    /// survives the abort still counts as running, so `start` refuses.
    pub async fn stop(&mut self) -> bool {
        let running = self.is_running();
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        if let Some(mut handle) = self.handle.take() {
            if tokio::time::timeout(STOP_TIMEOUT, &mut handle).await.is_err() {
                warn!(
                    "Automation loop did not stop within {:?}, aborting it",
                    STOP_TIMEOUT
                );
                handle.abort();
                // Abort lands at the tick's next await point.
                let _ = tokio::time::timeout(STOP_TIMEOUT, &mut handle).await;
                if !handle.is_finished() {
                    self.handle = Some(handle);
                }
            }
        }
        running
    }
}
