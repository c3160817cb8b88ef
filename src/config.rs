//! Configuration management for the market automation service

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use chrono::{DateTime, Days, Utc};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Market cycle timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleMode {
    /// 5 minute markets, replacement 10 seconds after resolution
    Test,
    /// Markets end at the next UTC midnight, replacement 60 seconds after
    Production,
}

impl CycleMode {
    /// End time for a market created at `now`
    pub fn next_end_time(&self, now: i64) -> i64 {
        match self {
            CycleMode::Test => now + 5 * 60,
            CycleMode::Production => next_utc_midnight(now),
        }
    }

    /// Buffer between resolving a market and creating its replacement
    pub fn recreate_delay(&self) -> Duration {
        match self {
            CycleMode::Test => Duration::from_secs(10),
            CycleMode::Production => Duration::from_secs(60),
        }
    }
}

impl FromStr for CycleMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "test" | "testing" => Ok(CycleMode::Test),
            "production" | "prod" => Ok(CycleMode::Production),
            other => anyhow::bail!("unknown AUTOMATION_MODE '{}' (expected test or production)", other),
        }
    }
}

impl fmt::Display for CycleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleMode::Test => write!(f, "test (5 minute markets)"),
            CycleMode::Production => write!(f, "production (daily at UTC midnight)"),
        }
    }
}

/// First UTC midnight strictly after `now`
pub fn next_utc_midnight(now: i64) -> i64 {
    DateTime::<Utc>::from_timestamp(now, 0)
        .and_then(|dt| dt.date_naive().checked_add_days(Days::new(1)))
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp())
        // Only reachable for timestamps outside chrono's range
        .unwrap_or_else(|| (now.div_euclid(86_400) + 1) * 86_400)
}

/// Service configuration loaded from environment
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON-RPC endpoint
    pub rpc_url: String,

    /// Signing key for the automation account
    pub signer: PrivateKeySigner,

    /// Prediction market contract
    pub market_address: Address,

    /// Price oracle the daily market settles against
    pub oracle_address: Address,

    /// Market cycle timing
    pub mode: CycleMode,

    /// How often the controller ticks
    pub tick_interval: Duration,

    /// Upper bound on waiting for one transaction receipt
    pub confirmation_timeout: Duration,

    /// Receipt polling period
    pub receipt_poll_interval: Duration,

    /// Upper bound on a whole tick
    pub tick_timeout: Duration,

    /// Gas limit headroom over `eth_estimateGas` (120 = +20%)
    pub gas_limit_multiplier_percent: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from any key lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());

        let rpc_url = var("RPC_URL").unwrap_or_else(|| "http://localhost:8545".to_string());

        let private_key = var("PRIVATE_KEY").context("PRIVATE_KEY must be set")?;
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .context("PRIVATE_KEY is not a valid secp256k1 key")?;

        let market_raw = var("CONTRACT_ADDRESS").context("CONTRACT_ADDRESS must be set")?;
        let market_address = parse_address("CONTRACT_ADDRESS", &market_raw)?;

        let oracle_raw = var("BITCOIN_ORACLE_ADDRESS")
            .or_else(|| var("ORACLE_ADDRESS"))
            .context("BITCOIN_ORACLE_ADDRESS (or ORACLE_ADDRESS) must be set")?;
        let oracle_address = parse_address("BITCOIN_ORACLE_ADDRESS", &oracle_raw)?;

        let mode = var("AUTOMATION_MODE")
            .map(|v| v.parse::<CycleMode>())
            .transpose()?
            .unwrap_or(CycleMode::Test);

        let number = |name: &str, default: u64| positive(name, var(name), default);
        let tick_interval = Duration::from_secs(number("TICK_INTERVAL_SECONDS", 60)?);
        let confirmation_timeout = Duration::from_secs(number("CONFIRMATION_TIMEOUT_SECONDS", 120)?);
        let receipt_poll_interval = Duration::from_millis(number("RECEIPT_POLL_INTERVAL_MS", 2000)?);
        let tick_timeout = Duration::from_secs(number("TICK_TIMEOUT_SECONDS", 600)?);
        let gas_limit_multiplier_percent = number("GAS_LIMIT_MULTIPLIER_PERCENT", 120)?;

        // Validate configuration
        if gas_limit_multiplier_percent < 100 {
            anyhow::bail!("GAS_LIMIT_MULTIPLIER_PERCENT must be at least 100");
        }
        if tick_timeout < confirmation_timeout {
            anyhow::bail!("TICK_TIMEOUT_SECONDS must not be shorter than CONFIRMATION_TIMEOUT_SECONDS");
        }

        Ok(Self {
            rpc_url,
            signer,
            market_address,
            oracle_address,
            mode,
            tick_interval,
            confirmation_timeout,
            receipt_poll_interval,
            tick_timeout,
            gas_limit_multiplier_percent,
        })
    }
}

fn parse_address(name: &str, value: &str) -> Result<Address> {
    Address::from_str(value.trim()).with_context(|| format!("{} is not a valid address: {}", name, value))
}

fn positive(name: &str, raw: Option<String>, default: u64) -> Result<u64> {
    match raw {
        None => Ok(default),
        Some(raw) => {
            let value: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a positive integer, got '{}'", name, raw))?;
            if value == 0 {
                anyhow::bail!("{} must be greater than zero", name);
            }
            Ok(value)
        }
    }
}
