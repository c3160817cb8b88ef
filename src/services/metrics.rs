//! Metrics collection for monitoring the automation service

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Collected counters for the automation service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Ticks that ran the decision logic
    pub ticks_run: u64,
    /// Ticks skipped because a deferred creation was still pending
    pub ticks_skipped: u64,
    /// Ticks that ended in an error or a reverted transaction
    pub ticks_failed: u64,
    /// Markets created (including replacements)
    pub markets_created: u64,
    pub markets_resolved: u64,
    pub oracle_updates: u64,
}

/// Thread-safe metrics collector
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    ticks_run: AtomicU64,
    ticks_skipped: AtomicU64,
    ticks_failed: AtomicU64,
    markets_created: AtomicU64,
    markets_resolved: AtomicU64,
    oracle_updates: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_ticks_run(&self) {
        self.inner.ticks_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ticks_skipped(&self) {
        self.inner.ticks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ticks_failed(&self) {
        self.inner.ticks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_markets_created(&self) {
        self.inner.markets_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_markets_resolved(&self) {
        self.inner.markets_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_oracle_updates(&self) {
        self.inner.oracle_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks_run: self.inner.ticks_run.load(Ordering::Relaxed),
            ticks_skipped: self.inner.ticks_skipped.load(Ordering::Relaxed),
            ticks_failed: self.inner.ticks_failed.load(Ordering::Relaxed),
            markets_created: self.inner.markets_created.load(Ordering::Relaxed),
            markets_resolved: self.inner.markets_resolved.load(Ordering::Relaxed),
            oracle_updates: self.inner.oracle_updates.load(Ordering::Relaxed),
        }
    }
}
