//! Core types for the market automation service

use alloy::primitives::{Address, B256, I256, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Oracle prices carry 8 implied decimals
pub const PRICE_DECIMALS: u32 = 8;

/// Market kind as stored by the contract (`uint8 marketType`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketType {
    Race,
    DailyOverUnder,
}

impl TryFrom<u8> for MarketType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MarketType::Race),
            1 => Ok(MarketType::DailyOverUnder),
            other => Err(other),
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketType::Race => write!(f, "RACE"),
            MarketType::DailyOverUnder => write!(f, "DAILY_OVER_UNDER"),
        }
    }
}

/// Canonical market record, decoded once at the chain client boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    pub id: u64,
    pub name: String,
    pub outcome_a: String,
    pub outcome_b: String,
    pub oracle_a: Address,
    pub oracle_b: Address,
    pub target_price: I256,
    pub total_pool_a: U256,
    pub total_pool_b: U256,
    /// Unix seconds; resolution is allowed at or after this moment
    pub end_time: i64,
    pub resolved: bool,
    pub outcome_a_won: bool,
    pub fee: U256,
    pub market_type: MarketType,
    pub creation_price: I256,
    pub is_automatic: bool,
}

impl Market {
    /// Whether this is the automatic daily market the service manages
    pub fn is_active_automatic(&self) -> bool {
        self.market_type == MarketType::DailyOverUnder && self.is_automatic && !self.resolved
    }

    /// Seconds left until `end_time`, floored at zero
    pub fn seconds_until_end(&self, now: i64) -> i64 {
        (self.end_time - now).max(0)
    }
}

/// Outcome of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResult {
    pub tx_hash: B256,
    pub gas_used: u64,
    /// Receipt status; `false` means the transaction was mined but reverted
    pub success: bool,
}

/// What the controller should do on a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No automatic market is live; create one
    Create,
    /// The live market has not reached its end time yet
    Wait { market_id: u64, remaining_secs: i64 },
    /// The live market is due; resolve it and schedule a replacement
    Resolve { market_id: u64 },
    /// The market is resolved and no replacement exists yet
    Recreate { market_id: u64 },
    /// Resolved, but the recreation buffer has not elapsed
    AwaitRecreation { market_id: u64, remaining_secs: i64 },
}

impl Decision {
    /// Whether acting on this decision submits any transaction
    pub fn writes(&self) -> bool {
        matches!(self, Decision::Create | Decision::Resolve { .. } | Decision::Recreate { .. })
    }
}

/// Format an 8-decimal fixed point price for display
pub fn format_price(price: I256) -> String {
    match i128::try_from(price) {
        Ok(raw) => Decimal::try_from_i128_with_scale(raw, PRICE_DECIMALS)
            .map(|d| d.normalize().to_string())
            .unwrap_or_else(|_| price.to_string()),
        Err(_) => price.to_string(),
    }
}

/// Format Unix seconds for log lines
pub fn format_timestamp(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}
