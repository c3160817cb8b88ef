//! Fixed-cadence tick loop
//!
//! Ticks run inline in the loop, so a slow tick delays the next one instead
//! of overlapping it. The first tick fires immediately at startup.

use super::chain_client::ChainClient;
use super::market_lifecycle::MarketLifecycle;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Tick `lifecycle` every `interval` until `shutdown` resolves.
///
/// Shutdown is only observed between ticks; an in-flight transaction wait is
/// allowed to finish. Afterwards any deferred replacement is cancelled or
/// awaited via [`MarketLifecycle::shutdown`].
pub async fn run_until<C, F>(lifecycle: &MarketLifecycle<C>, interval: Duration, shutdown: F)
where
    C: ChainClient + 'static,
    F: Future<Output = ()>,
{
    info!("[Scheduler] Checking every {}s for markets to resolve/create", interval.as_secs_f64());

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("[Scheduler] Shutting down automation service...");
                break;
            }
            _ = ticker.tick() => {
                lifecycle.tick().await;
            }
        }
    }

    lifecycle.shutdown().await;
    info!("[Scheduler] Stopped");
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("[Scheduler] Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
