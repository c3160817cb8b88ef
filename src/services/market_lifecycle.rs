//! Market Lifecycle Controller
//!
//! Once per tick the controller re-derives what to do from chain state alone:
//! create the automatic daily market when none is live, resolve it once its
//! end time has passed, or wait. Nothing is carried between ticks except the
//! handle of a deferred replacement, so a restart at any point loses nothing.
//!
//! Every chain interaction is guarded. A failure is logged and turns the tick
//! into a no-op; the next tick sees unchanged chain state and retries.
//!
//! Only one instance may run against a contract. Concurrent creates from two
//! processes are not prevented here.

use super::chain_client::ChainClient;
use super::metrics::Metrics;
use super::price_drift::PriceDrift;
use crate::config::{Config, CycleMode};
use crate::types::{format_price, format_timestamp, Decision, Market, TransactionResult};
use alloy::primitives::Address;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Pause between the oracle update and the create call so the pending nonce advances
const NONCE_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Controller settings
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub oracle_address: Address,
    pub mode: CycleMode,
    /// Delay between a successful resolve and the replacement create
    pub recreate_delay: Duration,
    pub nonce_settle_delay: Duration,
    /// Upper bound on one tick, including every transaction wait
    pub tick_timeout: Duration,
    pub drift: PriceDrift,
}

impl LifecycleSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            oracle_address: config.oracle_address,
            mode: config.mode,
            recreate_delay: config.mode.recreate_delay(),
            nonce_settle_delay: NONCE_SETTLE_DELAY,
            tick_timeout: config.tick_timeout,
            drift: PriceDrift::default(),
        }
    }
}

/// Result of a single tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do yet
    Idle(Decision),
    /// A new automatic market was created
    Created(TransactionResult),
    /// The market was resolved and its replacement scheduled
    Resolved { market_id: u64, result: TransactionResult },
    /// A deferred replacement is still pending; the tick did nothing
    Skipped,
    /// Something failed; chain state is left for the next tick to re-evaluate
    Failed(String),
}

/// Pure transition function over the scan result
pub fn decide(now: i64, market: Option<&Market>, recreate_delay: Duration) -> Decision {
    let Some(market) = market else {
        return Decision::Create;
    };

    if market.resolved {
        let ready_at = market.end_time + recreate_delay.as_secs() as i64;
        return if now >= ready_at {
            Decision::Recreate { market_id: market.id }
        } else {
            Decision::AwaitRecreation {
                market_id: market.id,
                remaining_secs: ready_at - now,
            }
        };
    }

    if now >= market.end_time {
        Decision::Resolve { market_id: market.id }
    } else {
        Decision::Wait {
            market_id: market.id,
            remaining_secs: market.end_time - now,
        }
    }
}

struct PendingRecreation {
    handle: JoinHandle<()>,
    cancel: Arc<Notify>,
}

/// Drives the automatic daily market through create -> resolve -> recreate
pub struct MarketLifecycle<C: ChainClient + 'static> {
    client: Arc<C>,
    settings: LifecycleSettings,
    metrics: Metrics,
    pending: Mutex<Option<PendingRecreation>>,
}

impl<C: ChainClient + 'static> MarketLifecycle<C> {
    pub fn new(client: Arc<C>, settings: LifecycleSettings, metrics: Metrics) -> Self {
        Self {
            client,
            settings,
            metrics,
            pending: Mutex::new(None),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run one tick against the wall clock
    pub async fn tick(&self) -> TickOutcome {
        self.tick_at(Utc::now().timestamp()).await
    }

    /// Run one tick as if the time were `now` (Unix seconds)
    pub async fn tick_at(&self, now: i64) -> TickOutcome {
        info!("[Lifecycle] [{}] Checking for tasks...", format_timestamp(now));

        if self.recreation_pending() {
            info!("[Lifecycle] Replacement market creation still pending, skipping tick");
            self.metrics.inc_ticks_skipped();
            return TickOutcome::Skipped;
        }

        self.metrics.inc_ticks_run();

        let outcome = match tokio::time::timeout(self.settings.tick_timeout, self.run_tick(now)).await {
            Ok(outcome) => outcome,
            Err(_) => TickOutcome::Failed(format!(
                "tick exceeded {}s, will re-evaluate next tick",
                self.settings.tick_timeout.as_secs_f64()
            )),
        };

        if let TickOutcome::Failed(reason) = &outcome {
            self.metrics.inc_ticks_failed();
            error!("[Lifecycle] Tick failed: {}", reason);
        }

        info!("---");
        outcome
    }

    async fn run_tick(&self, now: i64) -> TickOutcome {
        let market = match self.client.active_automatic_market().await {
            Ok(market) => market,
            Err(e) => return TickOutcome::Failed(format!("error getting active daily market: {}", e)),
        };

        if let Some(m) = &market {
            info!("[Lifecycle] Active daily market found (ID: {})", m.id);
            info!("[Lifecycle] End time: {}", format_timestamp(m.end_time));
            info!("[Lifecycle] Resolved: {}", m.resolved);
            info!("[Lifecycle] Time until end: {}s", m.seconds_until_end(now));
        }

        let decision = decide(now, market.as_ref(), self.settings.recreate_delay);

        match decision {
            Decision::Create => {
                info!("[Lifecycle] No active daily market found. Creating one...");
                create_market(&*self.client, &self.settings, &self.metrics, now).await
            }
            Decision::Wait { .. } => {
                info!("[Lifecycle] Market is active. Waiting for end time...");
                TickOutcome::Idle(decision)
            }
            Decision::Resolve { market_id } => {
                info!("[Lifecycle] Time to resolve the market!");
                self.resolve_and_schedule(market_id).await
            }
            Decision::Recreate { market_id } => {
                info!("[Lifecycle] Market #{} resolved without a replacement. Creating one...", market_id);
                create_market(&*self.client, &self.settings, &self.metrics, now).await
            }
            Decision::AwaitRecreation { remaining_secs, .. } => {
                info!("[Lifecycle] Market resolved, replacement due in {}s", remaining_secs);
                TickOutcome::Idle(decision)
            }
        }
    }

    async fn resolve_and_schedule(&self, market_id: u64) -> TickOutcome {
        info!("[Lifecycle] Resolving daily market #{}...", market_id);

        match self.client.resolve_market(market_id).await {
            Ok(result) if result.success => {
                self.metrics.inc_markets_resolved();
                info!("[Lifecycle] Market resolved! Gas used: {}", result.gas_used);
                self.schedule_recreation();
                TickOutcome::Resolved { market_id, result }
            }
            Ok(result) => TickOutcome::Failed(format!(
                "resolution of market #{} reverted (tx {})",
                market_id, result.tx_hash
            )),
            Err(e) => TickOutcome::Failed(format!("error resolving market #{}: {}", market_id, e)),
        }
    }

    /// Spawn the delayed replacement as a tracked, cancellable task
    fn schedule_recreation(&self) {
        let client = self.client.clone();
        let settings = self.settings.clone();
        let metrics = self.metrics.clone();
        let cancel = Arc::new(Notify::new());
        let cancelled = cancel.clone();

        info!(
            "[Lifecycle] Waiting {}s before creating new market...",
            settings.recreate_delay.as_secs_f64()
        );

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(settings.recreate_delay) => {}
                _ = cancelled.notified() => {
                    info!("[Lifecycle] Pending market creation cancelled");
                    return;
                }
            }

            let now = Utc::now().timestamp();
            let outcome = match tokio::time::timeout(
                settings.tick_timeout,
                create_market(&*client, &settings, &metrics, now),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => TickOutcome::Failed("deferred market creation timed out".to_string()),
            };

            if let TickOutcome::Failed(reason) = outcome {
                metrics.inc_ticks_failed();
                warn!("[Lifecycle] Deferred market creation failed: {}; next tick will retry", reason);
            }
        });

        *self.pending_slot() = Some(PendingRecreation { handle, cancel });
    }

    /// The slot only ever holds a handle, so a panic elsewhere cannot leave it half-written
    fn pending_slot(&self) -> MutexGuard<'_, Option<PendingRecreation>> {
        self.pending.lock().unwrap_or_else(|poisoned| {
            warn!("[Lifecycle] Recreation guard lock was poisoned; recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    /// Whether a deferred replacement is still sleeping or submitting
    pub fn recreation_pending(&self) -> bool {
        let mut pending = self.pending_slot();
        match pending.as_ref() {
            Some(p) if !p.handle.is_finished() => true,
            Some(_) => {
                *pending = None;
                false
            }
            None => false,
        }
    }

    fn take_pending(&self) -> Option<PendingRecreation> {
        self.pending_slot().take()
    }

    /// Let a deferred replacement run to completion
    pub async fn wait_for_recreation(&self) {
        if let Some(pending) = self.take_pending() {
            if let Err(e) = pending.handle.await {
                error!("[Lifecycle] Deferred market creation task panicked: {}", e);
            }
        }
    }

    /// Cancel a replacement that is still in its delay; wait for one already submitting
    pub async fn shutdown(&self) {
        if let Some(pending) = self.take_pending() {
            pending.cancel.notify_one();
            if let Err(e) = pending.handle.await {
                error!("[Lifecycle] Deferred market creation task panicked: {}", e);
            }
        }
    }
}

/// Nudge the oracle, then create a market ending per the cycle mode
async fn create_market<C: ChainClient + ?Sized>(
    client: &C,
    settings: &LifecycleSettings,
    metrics: &Metrics,
    now: i64,
) -> TickOutcome {
    info!("[Lifecycle] Creating new daily over/under market...");

    let current = match client.latest_oracle_price().await {
        Ok(price) => price,
        Err(e) => return TickOutcome::Failed(format!("error reading oracle price: {}", e)),
    };
    info!("[Oracle] Current price: {}", format_price(current));

    // ThreadRng is !Send; keep it out of any await
    let delta = {
        let mut rng = rand::thread_rng();
        settings.drift.sample(&mut rng)
    };
    let next = match PriceDrift::apply(current, delta) {
        Ok(price) => price,
        Err(e) => return TickOutcome::Failed(format!("error computing oracle price: {}", e)),
    };

    info!(
        "[Oracle] Updating price by {}${} to ${}",
        if delta >= 0 { "+" } else { "-" },
        delta.abs(),
        format_price(next)
    );
    match client.set_oracle_price(next).await {
        Ok(result) if result.success => {
            metrics.inc_oracle_updates();
            info!("[Oracle] Price updated! Tx: {}", result.tx_hash);
        }
        Ok(result) => {
            return TickOutcome::Failed(format!("oracle update reverted (tx {})", result.tx_hash))
        }
        Err(e) => return TickOutcome::Failed(format!("error updating oracle price: {}", e)),
    }

    if !settings.nonce_settle_delay.is_zero() {
        tokio::time::sleep(settings.nonce_settle_delay).await;
    }

    let end_time = settings.mode.next_end_time(now);
    info!("[Lifecycle] Market will end at: {}", format_timestamp(end_time));

    match client.create_daily_market(settings.oracle_address, end_time).await {
        Ok(result) if result.success => {
            metrics.inc_markets_created();
            info!("[Lifecycle] Market created! Gas used: {}", result.gas_used);
            TickOutcome::Created(result)
        }
        Ok(result) => TickOutcome::Failed(format!("market creation reverted (tx {})", result.tx_hash)),
        Err(e) => TickOutcome::Failed(format!("error creating daily market: {}", e)),
    }
}
