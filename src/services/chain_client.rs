//! Chain Client for the Market and Oracle contracts
//!
//! Reads go through `eth_call` with ABI-encoded calldata. Writes are signed
//! locally as EIP-155 legacy transactions, submitted with
//! `eth_sendRawTransaction` and then polled for a receipt. Submission and
//! confirmation are separate checkpoints: a transaction that never produces
//! a receipt within the confirmation timeout is reported as failed.
//!
//! Contract results are decoded exactly once here into [`Market`]; callers
//! never see the raw tuple.

use super::retry::{with_retry, RetryConfig};
use super::rpc_errors::ChainError;
use crate::config::Config;
use crate::types::{Market, MarketType, TransactionResult};
use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, Bytes, TxKind, B256, I256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

sol! {
    struct MarketRecord {
        string name;
        string outcomeA;
        string outcomeB;
        address oracleA;
        address oracleB;
        int256 targetPrice;
        uint256 totalPoolA;
        uint256 totalPoolB;
        uint256 endTime;
        bool resolved;
        bool outcomeAWon;
        uint256 fee;
        uint8 marketType;
        int256 creationPrice;
        bool isAutomatic;
    }

    function createDailyOverUnder(address oracle, uint256 endTime) external;
    function resolveMarket(uint256 marketId) external;
    function getMarketCount() external view returns (uint256);
    function getMarket(uint256 marketId) external view returns (MarketRecord);
}

// Chainlink-style aggregator used as the test price feed
mod oracle_abi {
    alloy::sol! {
        function updateAnswer(int256 answer) external;
        function latestRoundData() external view returns (
            uint80 roundId,
            int256 answer,
            uint256 startedAt,
            uint256 updatedAt,
            uint80 answeredInRound
        );
    }
}

/// Operations the lifecycle controller needs from the chain
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Number of markets ever created; ids are `0..count`
    async fn market_count(&self) -> Result<u64, ChainError>;

    /// Fetch and decode a single market
    async fn market(&self, market_id: u64) -> Result<Market, ChainError>;

    /// Latest oracle answer (8-decimal fixed point)
    async fn latest_oracle_price(&self) -> Result<I256, ChainError>;

    /// Push a new answer to the test oracle and wait for confirmation
    async fn set_oracle_price(&self, price: I256) -> Result<TransactionResult, ChainError>;

    /// Create the automatic daily over/under market and wait for confirmation
    async fn create_daily_market(
        &self,
        oracle: Address,
        end_time: i64,
    ) -> Result<TransactionResult, ChainError>;

    /// Resolve a market and wait for confirmation
    async fn resolve_market(&self, market_id: u64) -> Result<TransactionResult, ChainError>;

    /// Newest unresolved automatic DAILY_OVER_UNDER market, if any.
    ///
    /// Scans from the highest id down and stops at the first match. A market
    /// that fails to decode is logged and skipped; any other error aborts the
    /// scan so the caller can treat the tick as a no-op.
    async fn active_automatic_market(&self) -> Result<Option<Market>, ChainError> {
        let count = self.market_count().await?;
        debug!("[Chain] Scanning {} markets for the active automatic market", count);

        for market_id in (0..count).rev() {
            match self.market(market_id).await {
                Ok(market) if market.is_active_automatic() => return Ok(Some(market)),
                Ok(_) => continue,
                Err(e) if e.is_decode() => {
                    error!("[Chain] Skipping market #{}: {}", market_id, e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }
}

/// Connection parameters for [`RpcChainClient`]
#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub rpc_url: String,
    pub market_address: Address,
    pub oracle_address: Address,
    pub confirmation_timeout: Duration,
    pub receipt_poll_interval: Duration,
    /// Gas limit = estimate * percent / 100
    pub gas_limit_multiplier_percent: u64,
    pub retry: RetryConfig,
}

impl ChainSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            rpc_url: config.rpc_url.clone(),
            market_address: config.market_address,
            oracle_address: config.oracle_address,
            confirmation_timeout: config.confirmation_timeout,
            receipt_poll_interval: config.receipt_poll_interval,
            gas_limit_multiplier_percent: config.gas_limit_multiplier_percent,
            retry: RetryConfig::default(),
        }
    }
}

/// JSON-RPC backed chain client
pub struct RpcChainClient {
    client: reqwest::Client,
    settings: ChainSettings,
    signer: PrivateKeySigner,
    chain_id: u64,
    request_id: AtomicU64,
}

impl RpcChainClient {
    /// Connect to the RPC endpoint and read its chain id
    pub async fn connect(settings: ChainSettings, signer: PrivateKeySigner) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ChainError::from_network_error(&e))?;

        let mut this = Self {
            client,
            settings,
            signer,
            chain_id: 0,
            request_id: AtomicU64::new(1),
        };

        let chain_id = this.read("eth_chainId", json!([])).await?;
        this.chain_id = parse_u64(&chain_id, "chain id")?;

        info!(
            "[Chain] Connected to {} (chain id {}) as {}",
            this.settings.rpc_url, this.chain_id, this.signer.address()
        );

        Ok(this)
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }

    /// Single JSON-RPC request, returning the raw `result` value
    async fn request(&self, method: &str, params: &Value) -> Result<Value, ChainError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.request_id.fetch_add(1, Ordering::Relaxed),
        });

        let resp = self
            .client
            .post(&self.settings.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChainError::from_network_error(&e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ChainError::Network(format!("HTTP {}: {}", status, body)));
        }

        let mut body: Value = resp
            .json()
            .await
            .map_err(|e| ChainError::Decode(format!("{} response: {}", method, e)))?;

        if let Some(err) = body.get("error") {
            let code = err.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = err.get("message").and_then(Value::as_str).unwrap_or("unknown error");
            return Err(ChainError::from_rpc_error(code, message));
        }

        Ok(body.get_mut("result").map(Value::take).unwrap_or(Value::Null))
    }

    /// Idempotent request with retry on transient errors
    async fn read(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        with_retry(&self.settings.retry, method, || self.request(method, &params)).await
    }

    async fn eth_call(&self, to: Address, calldata: Vec<u8>) -> Result<Vec<u8>, ChainError> {
        let params = json!([{
            "to": format!("{:?}", to),
            "data": format!("0x{}", hex::encode(calldata)),
        }, "latest"]);

        let result = self.read("eth_call", params).await?;
        let data = result
            .as_str()
            .ok_or_else(|| ChainError::Decode(format!("eth_call returned {}", result)))?;
        decode_hex(data)
    }

    /// Sign, submit and confirm a contract call
    async fn send_transaction(
        &self,
        to: Address,
        calldata: Vec<u8>,
        label: &str,
    ) -> Result<TransactionResult, ChainError> {
        let from = self.signer.address();
        let data_hex = format!("0x{}", hex::encode(&calldata));

        let nonce = parse_u64(
            &self.read("eth_getTransactionCount", json!([format!("{:?}", from), "pending"])).await?,
            "nonce",
        )?;
        let gas_price = parse_quantity(&self.read("eth_gasPrice", json!([])).await?)?;

        // Reverts surface here, before anything is broadcast
        let estimate = parse_u64(
            &self
                .read(
                    "eth_estimateGas",
                    json!([{ "from": format!("{:?}", from), "to": format!("{:?}", to), "data": data_hex }]),
                )
                .await?,
            "gas estimate",
        )?;
        let gas_limit = estimate.saturating_mul(self.settings.gas_limit_multiplier_percent) / 100;

        let tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(to),
            value: U256::ZERO,
            input: Bytes::from(calldata),
        };

        let signature = self
            .signer
            .sign_hash_sync(&tx.signature_hash())
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        let envelope = TxEnvelope::from(tx.into_signed(signature));
        let raw = format!("0x{}", hex::encode(envelope.encoded_2718()));

        debug!(
            "[Chain] {}: nonce={} gas_price={} gas_limit={}",
            label, nonce, gas_price, gas_limit
        );

        // Never retried: a duplicate broadcast of a signed tx is harmless, but a
        // re-signed one with a fresh nonce is not
        let sent = self.request("eth_sendRawTransaction", &json!([raw])).await?;
        let tx_hash = sent
            .as_str()
            .ok_or_else(|| ChainError::Decode(format!("eth_sendRawTransaction returned {}", sent)))
            .and_then(parse_hash)?;
        info!("[Chain] {} sent: {}", label, tx_hash);

        let result = self.wait_for_receipt(tx_hash).await?;
        if result.success {
            info!("[Chain] {} confirmed! Gas used: {}", label, result.gas_used);
        } else {
            warn!("[Chain] {} reverted on-chain: {} (gas used {})", label, tx_hash, result.gas_used);
        }

        Ok(result)
    }

    /// Poll for a receipt until the confirmation timeout elapses
    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TransactionResult, ChainError> {
        let started = Instant::now();
        let deadline = started + self.settings.confirmation_timeout;
        let hash_hex = format!("{:?}", tx_hash);

        loop {
            match self.read("eth_getTransactionReceipt", json!([hash_hex])).await {
                Ok(Value::Null) => {}
                Ok(receipt) => return parse_receipt(tx_hash, &receipt),
                Err(e) => warn!("[Chain] Receipt poll for {} failed: {}", tx_hash, e),
            }

            if Instant::now() + self.settings.receipt_poll_interval > deadline {
                return Err(ChainError::ConfirmationTimeout {
                    tx_hash,
                    waited_secs: started.elapsed().as_secs(),
                });
            }

            tokio::time::sleep(self.settings.receipt_poll_interval).await;
        }
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn market_count(&self) -> Result<u64, ChainError> {
        let data = self
            .eth_call(self.settings.market_address, getMarketCountCall {}.abi_encode())
            .await?;
        let count = getMarketCountCall::abi_decode_returns(&data)
            .map_err(|e| ChainError::Decode(format!("getMarketCount: {}", e)))?;

        u64::try_from(count).map_err(|_| ChainError::Decode(format!("market count {} too large", count)))
    }

    async fn market(&self, market_id: u64) -> Result<Market, ChainError> {
        let call = getMarketCall {
            marketId: U256::from(market_id),
        };
        let data = self.eth_call(self.settings.market_address, call.abi_encode()).await?;
        let record = getMarketCall::abi_decode_returns(&data)
            .map_err(|e| ChainError::Decode(format!("getMarket({}): {}", market_id, e)))?;

        decode_market(market_id, record)
    }

    async fn latest_oracle_price(&self) -> Result<I256, ChainError> {
        let data = self
            .eth_call(
                self.settings.oracle_address,
                oracle_abi::latestRoundDataCall {}.abi_encode(),
            )
            .await?;
        let round = oracle_abi::latestRoundDataCall::abi_decode_returns(&data)
            .map_err(|e| ChainError::Decode(format!("latestRoundData: {}", e)))?;

        Ok(round.answer)
    }

    async fn set_oracle_price(&self, price: I256) -> Result<TransactionResult, ChainError> {
        let call = oracle_abi::updateAnswerCall { answer: price };
        self.send_transaction(self.settings.oracle_address, call.abi_encode(), "Oracle update")
            .await
    }

    async fn create_daily_market(
        &self,
        oracle: Address,
        end_time: i64,
    ) -> Result<TransactionResult, ChainError> {
        let end_time = u64::try_from(end_time)
            .map_err(|_| ChainError::InvalidValue(format!("negative end time {}", end_time)))?;
        let call = createDailyOverUnderCall {
            oracle,
            endTime: U256::from(end_time),
        };
        self.send_transaction(self.settings.market_address, call.abi_encode(), "Market creation")
            .await
    }

    async fn resolve_market(&self, market_id: u64) -> Result<TransactionResult, ChainError> {
        let call = resolveMarketCall {
            marketId: U256::from(market_id),
        };
        self.send_transaction(self.settings.market_address, call.abi_encode(), "Market resolution")
            .await
    }
}

/// Convert the contract tuple into the canonical record
fn decode_market(market_id: u64, record: MarketRecord) -> Result<Market, ChainError> {
    let market_type = MarketType::try_from(record.marketType).map_err(|raw| {
        ChainError::Decode(format!("market #{} has unknown type {}", market_id, raw))
    })?;
    let end_time = i64::try_from(record.endTime).map_err(|_| {
        ChainError::Decode(format!("market #{} end time {} out of range", market_id, record.endTime))
    })?;

    Ok(Market {
        id: market_id,
        name: record.name,
        outcome_a: record.outcomeA,
        outcome_b: record.outcomeB,
        oracle_a: record.oracleA,
        oracle_b: record.oracleB,
        target_price: record.targetPrice,
        total_pool_a: record.totalPoolA,
        total_pool_b: record.totalPoolB,
        end_time,
        resolved: record.resolved,
        outcome_a_won: record.outcomeAWon,
        fee: record.fee,
        market_type,
        creation_price: record.creationPrice,
        is_automatic: record.isAutomatic,
    })
}

fn parse_receipt(tx_hash: B256, receipt: &Value) -> Result<TransactionResult, ChainError> {
    let status = receipt
        .get("status")
        .ok_or_else(|| ChainError::Decode(format!("receipt for {} has no status", tx_hash)))?;
    let gas_used = receipt
        .get("gasUsed")
        .map(|v| parse_u64(v, "gasUsed"))
        .transpose()?
        .unwrap_or(0);

    Ok(TransactionResult {
        tx_hash,
        gas_used,
        success: parse_quantity(status)? == 1,
    })
}

/// Parse a hex `QUANTITY` (e.g. `"0x1a"`)
fn parse_quantity(value: &Value) -> Result<u128, ChainError> {
    let s = value
        .as_str()
        .ok_or_else(|| ChainError::Decode(format!("expected hex quantity, got {}", value)))?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| ChainError::Decode(format!("bad quantity {}: {}", s, e)))
}

/// Parse a hex `QUANTITY` that must fit in 64 bits
fn parse_u64(value: &Value, what: &str) -> Result<u64, ChainError> {
    let raw = parse_quantity(value)?;
    u64::try_from(raw).map_err(|_| ChainError::Decode(format!("{} {} does not fit in 64 bits", what, raw)))
}

fn parse_hash(s: &str) -> Result<B256, ChainError> {
    B256::from_str(s).map_err(|e| ChainError::Decode(format!("bad tx hash {}: {}", s, e)))
}

fn decode_hex(s: &str) -> Result<Vec<u8>, ChainError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
        .map_err(|e| ChainError::Decode(format!("bad hex data: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mock_chain::{automatic_daily, MockChainClient};
    use alloy::sol_types::SolValue;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn record(market_type: u8, end_time: u64) -> MarketRecord {
        MarketRecord {
            name: "BTC Daily Over/Under".to_string(),
            outcomeA: "Over".to_string(),
            outcomeB: "Under".to_string(),
            oracleA: Address::repeat_byte(0x11),
            oracleB: Address::ZERO,
            targetPrice: I256::try_from(5_000_000_000_000i64).unwrap(),
            totalPoolA: U256::from(10u64),
            totalPoolB: U256::from(20u64),
            endTime: U256::from(end_time),
            resolved: false,
            outcomeAWon: false,
            fee: U256::from(200u64),
            marketType: market_type,
            creationPrice: I256::try_from(5_000_000_000_000i64).unwrap(),
            isAutomatic: true,
        }
    }

    fn rpc_result(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
    }

    fn settings(url: String) -> ChainSettings {
        ChainSettings {
            rpc_url: url,
            market_address: Address::repeat_byte(0xaa),
            oracle_address: Address::repeat_byte(0x11),
            confirmation_timeout: Duration::from_millis(300),
            receipt_poll_interval: Duration::from_millis(50),
            gas_limit_multiplier_percent: 120,
            retry: RetryConfig {
                max_retries: 1,
                initial_delay_ms: 1,
                max_delay_ms: 2,
                backoff_factor: 2.0,
                jitter: 0.0,
            },
        }
    }

    /// Stub node answering the calls a write makes
    async fn node_with_receipt(receipt: Value) -> MockServer {
        let server = MockServer::start().await;
        let tx_hash = format!("0x{}", "ab".repeat(32));

        for (rpc_method, result) in [
            ("eth_chainId", json!("0x7a69")),
            ("eth_getTransactionCount", json!("0x5")),
            ("eth_gasPrice", json!("0x3b9aca00")),
            ("eth_estimateGas", json!("0x186a0")),
            ("eth_sendRawTransaction", json!(tx_hash)),
            ("eth_getTransactionReceipt", receipt),
        ] {
            Mock::given(method("POST"))
                .and(body_partial_json(json!({ "method": rpc_method })))
                .respond_with(rpc_result(result))
                .mount(&server)
                .await;
        }

        server
    }

    async fn connect(server: &MockServer) -> RpcChainClient {
        let signer: PrivateKeySigner = TEST_KEY.parse().unwrap();
        RpcChainClient::connect(settings(server.uri()), signer).await.unwrap()
    }

    #[tokio::test]
    async fn test_connect_reads_chain_id() {
        let server = node_with_receipt(Value::Null).await;
        let client = connect(&server).await;
        assert_eq!(client.chain_id(), 31337);
    }

    #[tokio::test]
    async fn test_get_market_decodes_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_chainId" })))
            .respond_with(rpc_result(json!("0x1")))
            .mount(&server)
            .await;
        let encoded = format!("0x{}", hex::encode(record(1, 1_700_000_000).abi_encode()));
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_call" })))
            .respond_with(rpc_result(json!(encoded)))
            .mount(&server)
            .await;

        let client = connect(&server).await;
        let market = client.market(4).await.unwrap();

        assert_eq!(market.id, 4);
        assert_eq!(market.market_type, MarketType::DailyOverUnder);
        assert_eq!(market.end_time, 1_700_000_000);
        assert!(market.is_active_automatic());
        assert_eq!(market.outcome_a, "Over");
    }

    #[tokio::test]
    async fn test_latest_oracle_price() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_chainId" })))
            .respond_with(rpc_result(json!("0x1")))
            .mount(&server)
            .await;
        let answer = I256::try_from(6_543_210_000_000i64).unwrap();
        // uint80 words encode like uint256 for small values
        let encoded = (U256::from(9u64), answer, U256::from(1u64), U256::from(2u64), U256::from(9u64))
            .abi_encode_params();
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_call" })))
            .respond_with(rpc_result(json!(format!("0x{}", hex::encode(encoded)))))
            .mount(&server)
            .await;

        let client = connect(&server).await;
        assert_eq!(client.latest_oracle_price().await.unwrap(), answer);
    }

    #[tokio::test]
    async fn test_eth_call_revert_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_chainId" })))
            .respond_with(rpc_result(json!("0x1")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_call" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": 3, "message": "execution reverted: Invalid market" }
            })))
            .mount(&server)
            .await;

        let client = connect(&server).await;
        let err = client.market(99).await.unwrap_err();
        assert!(matches!(err, ChainError::Reverted(_)));
    }

    #[tokio::test]
    async fn test_resolve_confirmed() {
        let server = node_with_receipt(json!({ "status": "0x1", "gasUsed": "0x1d4c0" })).await;
        let client = connect(&server).await;

        let result = client.resolve_market(3).await.unwrap();
        assert!(result.success);
        assert_eq!(result.gas_used, 120_000);
        assert_eq!(format!("{:?}", result.tx_hash), format!("0x{}", "ab".repeat(32)));
    }

    #[tokio::test]
    async fn test_create_reverted_receipt() {
        let server = node_with_receipt(json!({ "status": "0x0", "gasUsed": "0x5208" })).await;
        let client = connect(&server).await;

        let result = client
            .create_daily_market(Address::repeat_byte(0x11), 1_700_000_300)
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.gas_used, 21_000);
    }

    #[tokio::test]
    async fn test_unconfirmed_transaction_times_out() {
        let server = node_with_receipt(Value::Null).await;
        let client = connect(&server).await;

        let err = client.resolve_market(3).await.unwrap_err();
        assert!(matches!(err, ChainError::ConfirmationTimeout { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_negative_end_time_rejected() {
        let server = node_with_receipt(Value::Null).await;
        let client = connect(&server).await;

        let err = client.create_daily_market(Address::ZERO, -1).await.unwrap_err();
        assert!(matches!(err, ChainError::InvalidValue(_)));
    }

    #[test]
    fn test_decode_market_rejects_unknown_type() {
        let err = decode_market(2, record(9, 100)).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(&json!("0x0")).unwrap(), 0);
        assert_eq!(parse_quantity(&json!("0x")).unwrap(), 0);
        assert_eq!(parse_quantity(&json!("0x7a69")).unwrap(), 31337);
        assert!(parse_quantity(&json!(12)).is_err());
        assert!(parse_quantity(&json!("0xzz")).is_err());
    }

    #[test]
    fn test_parse_u64_rejects_wide_quantities() {
        assert_eq!(parse_u64(&json!("0xffffffffffffffff"), "nonce").unwrap(), u64::MAX);
        let err = parse_u64(&json!("0x10000000000000000"), "nonce").unwrap_err();
        assert!(err.is_decode());
        assert!(err.to_string().contains("nonce"));
    }

    #[tokio::test]
    async fn test_connect_rejects_oversized_chain_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_chainId" })))
            .respond_with(rpc_result(json!("0x1000000000000007a69")))
            .mount(&server)
            .await;

        let signer: PrivateKeySigner = TEST_KEY.parse().unwrap();
        let result = RpcChainClient::connect(settings(server.uri()), signer).await;
        assert!(matches!(result, Err(ChainError::Decode(_))));
    }

    #[tokio::test]
    async fn test_oversized_gas_used_is_a_decode_error() {
        let server = node_with_receipt(json!({ "status": "0x1", "gasUsed": "0x1ffffffffffffffff" })).await;
        let client = connect(&server).await;

        let err = client.resolve_market(3).await.unwrap_err();
        assert!(err.is_decode());
    }

    #[tokio::test]
    async fn test_scan_returns_newest_active_automatic() {
        let mut manual = automatic_daily(2, 500);
        manual.is_automatic = false;
        let client = MockChainClient::with_markets(vec![
            automatic_daily(0, 100),
            automatic_daily(1, 300),
            manual,
        ]);

        let found = client.active_automatic_market().await.unwrap().unwrap();
        assert_eq!(found.id, 1);
    }

    #[tokio::test]
    async fn test_scan_skips_resolved_and_undecodable() {
        let mut resolved = automatic_daily(2, 500);
        resolved.resolved = true;
        let client = MockChainClient::with_markets(vec![
            automatic_daily(0, 100),
            automatic_daily(1, 300),
            resolved,
        ]);
        client.fail_decode(1);

        let found = client.active_automatic_market().await.unwrap().unwrap();
        assert_eq!(found.id, 0);
    }

    #[tokio::test]
    async fn test_scan_empty_and_rpc_failure() {
        let client = MockChainClient::with_markets(vec![]);
        assert!(client.active_automatic_market().await.unwrap().is_none());

        client.fail_reads(true);
        assert!(client.active_automatic_market().await.is_err());
    }
}
