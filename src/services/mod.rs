//! Chain access and the market automation loop

pub mod chain_client;
pub mod market_lifecycle;
pub mod metrics;
pub mod price_drift;
pub mod retry;
pub mod rpc_errors;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod mock_chain;

pub use chain_client::{ChainClient, ChainSettings, RpcChainClient};
pub use market_lifecycle::{decide, LifecycleSettings, MarketLifecycle, TickOutcome};
pub use metrics::{Metrics, MetricsSnapshot};
pub use price_drift::PriceDrift;
pub use retry::{with_retry, RetryConfig};
pub use rpc_errors::ChainError;
