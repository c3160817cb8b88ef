//! JSON-RPC Error Classification
//!
//! Maps transport failures and JSON-RPC error objects into a structured
//! taxonomy so the caller can tell a flaky endpoint from a contract revert.

use alloy::primitives::B256;
use thiserror::Error;

/// Structured chain client errors
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// Network/connection error (timeout, DNS, refused, bad HTTP status)
    #[error("network error: {0}")]
    Network(String),
    /// JSON-RPC error object returned by the node
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    /// Call or transaction reverted by the contract
    #[error("execution reverted: {0}")]
    Reverted(String),
    /// Transaction was submitted but no receipt appeared in time
    #[error("transaction {tx_hash} not confirmed within {waited_secs}s")]
    ConfirmationTimeout { tx_hash: B256, waited_secs: u64 },
    /// Return data did not match the expected ABI shape
    #[error("decode error: {0}")]
    Decode(String),
    /// Local signing failure
    #[error("signing error: {0}")]
    Signing(String),
    /// Value out of range or arithmetic overflow
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl ChainError {
    /// Classify a JSON-RPC error object
    pub fn from_rpc_error(code: i64, message: &str) -> Self {
        let msg_lower = message.to_lowercase();

        // Geth/anvil report reverts as code 3 or with "revert" in the message
        if code == 3 || msg_lower.contains("revert") {
            return ChainError::Reverted(message.to_string());
        }

        ChainError::Rpc {
            code,
            message: message.to_string(),
        }
    }

    /// Parse a network/reqwest error
    pub fn from_network_error(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ChainError::Network("request timed out".to_string())
        } else if err.is_connect() {
            ChainError::Network("connection failed".to_string())
        } else {
            ChainError::Network(err.to_string())
        }
    }

    /// Whether retrying the same request later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ChainError::Network(_) | ChainError::ConfirmationTimeout { .. } => true,
            // -32000 family: server-side, usually load or "header not found"
            ChainError::Rpc { code, .. } => (-32099..=-32000).contains(code) || *code == -32603,
            _ => false,
        }
    }

    /// Whether the endpoint asked us to slow down (HTTP 429 or EIP-1474 `limit exceeded`)
    pub fn is_rate_limited(&self) -> bool {
        match self {
            ChainError::Network(msg) => msg.starts_with("HTTP 429"),
            ChainError::Rpc { code, .. } => *code == -32005,
            _ => false,
        }
    }

    /// Whether this error concerns the shape of one record rather than the endpoint
    pub fn is_decode(&self) -> bool {
        matches!(self, ChainError::Decode(_))
    }
}
