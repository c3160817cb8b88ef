//! Market Automation Library
//!
//! Keeps an automatic daily over/under market alive on an EVM prediction
//! market contract:
//!
//! 1. **Create**: when no automatic market is live, nudge the test oracle by a
//!    random whole-dollar amount and create a new market.
//! 2. **Resolve**: once the live market's end time has passed, resolve it and
//!    create its replacement after a short buffer.
//!
//! All decisions are re-derived from chain state on every tick.

pub mod config;
pub mod services;
pub mod types;

pub use config::{Config, CycleMode};
pub use services::{ChainClient, ChainError, MarketLifecycle, Metrics, RpcChainClient, TickOutcome};
pub use types::{Decision, Market, MarketType, TransactionResult};
