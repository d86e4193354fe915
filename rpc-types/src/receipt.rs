//! Receipts, logs, log filters, and call requests.

use serde::{Deserialize, Serialize};

use crate::wire::{Address, BlockTag, Hash, HexData, Wei};

/// A confirmed transaction's receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Hash of the transaction this receipt describes.
    pub transaction_hash: Hash,
    /// Number of the block the transaction was included in.
    pub block_number: u64,
    /// Sender address.
    pub from: Address,
    /// Recipient address; `None` for contract creation.
    pub to: Option<Address>,
    /// Address of the deployed contract, for creation transactions.
    pub contract_address: Option<Address>,
    /// Total gas used by the block up to and including this transaction.
    pub cumulative_gas_used: u64,
    /// `true` if execution succeeded, `false` if it reverted.
    pub status: bool,
    /// Logs emitted during execution.
    pub logs: Vec<LogEntry>,
}

/// A single EVM log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// The contract that emitted this log.
    pub address: Address,
    /// Indexed topics, the first of which is usually the event signature hash.
    pub topics: Vec<Hash>,
    /// Non-indexed event data.
    pub data: HexData,
    /// Block the log was emitted in.
    pub block_number: u64,
    /// Transaction the log was emitted by.
    pub transaction_hash: Hash,
    /// Index of the log within its block.
    pub log_index: u64,
    /// `true` if the block containing this log was later reorganized out.
    #[serde(default)]
    pub removed: bool,
}

/// Filter parameters for `eth_getLogs` / `logs` subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogFilter {
    /// Start of the block range, inclusive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_block: Option<BlockTag>,
    /// End of the block range, inclusive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_block: Option<BlockTag>,
    /// Emitting contract addresses to match; `None` matches any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<Address>>,
    /// Topic filter, position-indexed; `None` entries match any topic at that position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<Option<Hash>>>,
}

/// Fee fields accepted by a call request: either legacy or EIP-1559, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallFee {
    /// Legacy gas price.
    Legacy(Wei),
    /// EIP-1559 fee pair.
    Eip1559 {
        /// Max total fee, in wei.
        max_fee_per_gas: Wei,
        /// Priority fee, in wei.
        max_priority_fee_per_gas: Wei,
    },
}

/// A request to simulate a call (`eth_call`, `eth_estimateGas`) without broadcasting it.
#[derive(Debug, Clone)]
pub struct CallRequest {
    /// Contract/recipient address; `None` for a creation-code simulation.
    pub to: Option<Address>,
    /// Call data.
    pub data: HexData,
    /// Sender address to simulate as; defaults to the zero address if absent.
    pub from: Option<Address>,
    /// Value to attach, in wei.
    pub value: Option<Wei>,
    /// Gas limit for the simulation.
    pub gas: Option<u64>,
    /// Fee fields; mixing legacy and EIP-1559 forms is a caller error.
    pub fee: Option<CallFee>,
}
