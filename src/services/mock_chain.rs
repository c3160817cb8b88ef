//! In-memory chain used by unit tests

use super::chain_client::ChainClient;
use super::rpc_errors::ChainError;
use crate::types::{Market, MarketType, TransactionResult};
use alloy::primitives::{Address, B256, I256, U256};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

/// Write calls observed by the mock, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetOraclePrice(I256),
    Create { oracle: Address, end_time: i64 },
    Resolve(u64),
}

#[derive(Debug, Default)]
struct State {
    markets: Vec<Market>,
    oracle_price: I256,
    calls: Vec<Call>,
    undecodable: HashSet<u64>,
    fail_reads: bool,
    fail_oracle_update: bool,
    revert_create: bool,
    fail_resolve: bool,
    write_delay: Duration,
}

/// Market contract + oracle kept in memory
#[derive(Debug, Default)]
pub struct MockChainClient {
    state: Mutex<State>,
}

/// An unresolved automatic DAILY_OVER_UNDER market
pub fn automatic_daily(id: u64, end_time: i64) -> Market {
    Market {
        id,
        name: "BTC Daily Over/Under".to_string(),
        outcome_a: "Over".to_string(),
        outcome_b: "Under".to_string(),
        oracle_a: Address::repeat_byte(0x11),
        oracle_b: Address::ZERO,
        target_price: I256::ZERO,
        total_pool_a: U256::ZERO,
        total_pool_b: U256::ZERO,
        end_time,
        resolved: false,
        outcome_a_won: false,
        fee: U256::ZERO,
        market_type: MarketType::DailyOverUnder,
        creation_price: I256::ZERO,
        is_automatic: true,
    }
}

impl MockChainClient {
    pub fn with_markets(markets: Vec<Market>) -> Self {
        let client = Self::default();
        {
            let mut state = client.state.lock().unwrap();
            state.markets = markets;
            state.oracle_price = I256::try_from(5_000_000_000_000i64).unwrap();
        }
        client
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn markets(&self) -> Vec<Market> {
        self.state.lock().unwrap().markets.clone()
    }

    pub fn oracle_price(&self) -> I256 {
        self.state.lock().unwrap().oracle_price
    }

    pub fn fail_decode(&self, market_id: u64) {
        self.state.lock().unwrap().undecodable.insert(market_id);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    pub fn fail_oracle_update(&self, fail: bool) {
        self.state.lock().unwrap().fail_oracle_update = fail;
    }

    pub fn revert_create(&self, revert: bool) {
        self.state.lock().unwrap().revert_create = revert;
    }

    pub fn fail_resolve(&self, fail: bool) {
        self.state.lock().unwrap().fail_resolve = fail;
    }

    /// Simulated confirmation latency for every write
    pub fn set_write_delay(&self, delay: Duration) {
        self.state.lock().unwrap().write_delay = delay;
    }

    fn check_reads(&self) -> Result<(), ChainError> {
        if self.state.lock().unwrap().fail_reads {
            return Err(ChainError::Network("connection failed".to_string()));
        }
        Ok(())
    }

    async fn confirm(&self) {
        let delay = self.state.lock().unwrap().write_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn receipt(&self, success: bool) -> TransactionResult {
        let n = self.state.lock().unwrap().calls.len() as u8;
        TransactionResult {
            tx_hash: B256::repeat_byte(n),
            gas_used: 21_000,
            success,
        }
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn market_count(&self) -> Result<u64, ChainError> {
        self.check_reads()?;
        Ok(self.state.lock().unwrap().markets.len() as u64)
    }

    async fn market(&self, market_id: u64) -> Result<Market, ChainError> {
        self.check_reads()?;
        let state = self.state.lock().unwrap();
        if state.undecodable.contains(&market_id) {
            return Err(ChainError::Decode(format!("market #{} shape mismatch", market_id)));
        }
        state
            .markets
            .get(market_id as usize)
            .cloned()
            .ok_or_else(|| ChainError::Reverted("Invalid market".to_string()))
    }

    async fn latest_oracle_price(&self) -> Result<I256, ChainError> {
        self.check_reads()?;
        Ok(self.state.lock().unwrap().oracle_price)
    }

    async fn set_oracle_price(&self, price: I256) -> Result<TransactionResult, ChainError> {
        self.confirm().await;
        let fail = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::SetOraclePrice(price));
            if !state.fail_oracle_update {
                state.oracle_price = price;
            }
            state.fail_oracle_update
        };
        if fail {
            return Err(ChainError::Network("connection reset".to_string()));
        }
        Ok(self.receipt(true))
    }

    async fn create_daily_market(
        &self,
        oracle: Address,
        end_time: i64,
    ) -> Result<TransactionResult, ChainError> {
        self.confirm().await;
        let reverted = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Create { oracle, end_time });
            if !state.revert_create {
                let id = state.markets.len() as u64;
                let mut market = automatic_daily(id, end_time);
                market.oracle_a = oracle;
                market.creation_price = state.oracle_price;
                market.target_price = state.oracle_price;
                state.markets.push(market);
            }
            state.revert_create
        };
        Ok(self.receipt(!reverted))
    }

    async fn resolve_market(&self, market_id: u64) -> Result<TransactionResult, ChainError> {
        self.confirm().await;
        let fail = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Resolve(market_id));
            if !state.fail_resolve {
                if let Some(market) = state.markets.get_mut(market_id as usize) {
                    market.resolved = true;
                }
            }
            state.fail_resolve
        };
        if fail {
            return Err(ChainError::ConfirmationTimeout {
                tx_hash: B256::ZERO,
                waited_secs: 120,
            });
        }
        Ok(self.receipt(true))
    }
}
