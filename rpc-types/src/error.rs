//! The error taxonomy consumed throughout the SDK.
//!
//! One top-level enum carries every kind named in the transport, retry,
//! gas, signer, subscription, and tester-controller designs; struct-shaped
//! variants carry the structured context each kind documents rather than a
//! bare string, so callers can match on fields instead of parsing messages.

use std::time::Duration;

use crate::wire::{ChainId, Hash};

/// The four shapes a decoded revert can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertKind {
    /// `Error(string)` — the Solidity `require`/`revert("...")` selector `0x08c379a0`.
    ErrorString,
    /// `Panic(uint256)` — the compiler-inserted panic selector `0x4e487b71`.
    Panic,
    /// A custom error selector recognized by the revert-decoder collaborator.
    CustomError,
    /// Revert data present but not decodable by any known selector.
    Unknown,
}

/// Structured detail of an `error` object returned by the node.
#[derive(Debug, Clone, thiserror::Error)]
#[error("rpc error {code}: {message}")]
pub struct RpcError {
    /// JSON-RPC / Ethereum error code.
    pub code: i64,
    /// Human-readable message from the node.
    pub message: String,
    /// Raw `data` field, if the node attached one.
    pub data: Option<serde_json::Value>,
    /// The request id this error answers, for log correlation.
    pub request_id: Option<u64>,
}

/// Execution reverted.
#[derive(Debug, Clone, thiserror::Error)]
#[error("revert ({kind:?}): {reason}")]
pub struct RevertError {
    /// Which of the four recognized revert shapes this is.
    pub kind: RevertKind,
    /// Human-readable reason, when decodable.
    pub reason: String,
    /// The raw revert data, as returned by the node.
    pub raw_data_hex: String,
}

/// All prior attempts the retry governor made before giving up.
#[derive(Debug, Clone, thiserror::Error)]
#[error("retry exhausted after {attempts} attempts ({elapsed:?})")]
pub struct RetryExhaustedError {
    /// Total number of attempts made, including the first.
    pub attempts: u32,
    /// Total wall time spent across all attempts and backoff sleeps.
    pub elapsed: Duration,
    /// Each prior attempt's failure, oldest first.
    pub causes: Vec<String>,
}

/// The top-level error surfaced by every component in this SDK.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The node returned a well-formed `error` object.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Execution reverted.
    #[error(transparent)]
    Revert(#[from] RevertError),

    /// The chain id a `ChainProfile` declared does not match what the node reports.
    #[error("chain mismatch: expected {expected}, node reports {actual}")]
    ChainMismatch {
        /// Chain id configured in the `ChainProfile`.
        expected: ChainId,
        /// Chain id the node actually returned from `eth_chainId`.
        actual: ChainId,
    },

    /// The node rejected a transaction because `from` did not match the signature.
    #[error("invalid sender for transaction {transaction_hash}")]
    InvalidSender {
        /// The transaction hash the node rejected, if one was assigned.
        transaction_hash: Option<Hash>,
    },

    /// A deadline expired while waiting for a result.
    #[error("timed out waiting for {transaction_hash:?}")]
    Timeout {
        /// The transaction hash being awaited, if this timeout was for a receipt.
        transaction_hash: Option<Hash>,
    },

    /// The retry governor exhausted its configured attempt budget.
    #[error(transparent)]
    RetryExhausted(#[from] RetryExhaustedError),

    /// The provider transport has been closed and can no longer carry requests.
    #[error("transport closed")]
    TransportClosed,

    /// The provider transport's I/O channel is no longer being serviced.
    #[error("channel inactive")]
    ChannelInactive,

    /// The configured `maxPending` bound was reached.
    #[error("too many pending requests (limit {limit})")]
    Backpressure {
        /// The configured `maxPending` bound.
        limit: usize,
    },

    /// A hex, RLP, or ABI payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A value could not be encoded into the wire format it targets.
    #[error("encode error: {0}")]
    Encode(String),

    /// A caller-constructed request was internally inconsistent (e.g. mixed
    /// legacy and EIP-1559 fee fields).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An I/O-level failure talking to the transport (socket, HTTP client).
    #[error("transport I/O error: {0}")]
    Io(String),
}

impl ClientError {
    /// Returns `true` if the node-reported `data` for this error looks like
    /// revert data: `0x` followed by more than 8 hex characters.
    #[must_use]
    pub fn rpc_data_looks_like_revert(data: &serde_json::Value) -> bool {
        let Some(s) = data.as_str() else { return false };
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        stripped.len() > 8 && stripped.chars().all(|c| c.is_ascii_hexdigit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn revert_like_data_is_detected() {
        assert!(ClientError::rpc_data_looks_like_revert(&json!(format!(
            "0x{}",
            "ab".repeat(5)
        ))));
        assert!(!ClientError::rpc_data_looks_like_revert(&json!("0xabcd")));
        assert!(!ClientError::rpc_data_looks_like_revert(&json!(42)));
    }
}
