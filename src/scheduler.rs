//! Background price refresh task

use crate::aggregator::PriceAggregator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Handle to the periodic refresh task
///
/// The task goes through the aggregator's normal read path, so while the
/// cache is fresh a tick costs no outbound request. Dropping the handle
/// stops the task; [`RefreshScheduler::shutdown`] also waits for it.
pub struct RefreshScheduler {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Starts the background task; the first tick fires immediately
    pub fn spawn(aggregator: Arc<PriceAggregator>, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            tracing::info!(
                refresh_interval_secs = period.as_secs(),
                "Starting background price refresh"
            );

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                // Shutdown wins over a tick that came due during a slow refresh
                tokio::select! {
                    biased;

                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let snapshot = aggregator.get_all_prices(false).await;
                        tracing::debug!(count = snapshot.len(), "Background refresh tick done");
                    }
                }
            }

            tracing::info!("Background price refresh stopped");
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Signals the task to stop and waits for its current iteration to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);

        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Background price refresh ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
