//! Reader facade (C3): typed read operations over the provider transport.
//!
//! Every operation here wraps a single JSON-RPC call under the retry
//! governor and decodes the result into the stable semantic types from
//! `rpc-types`. A `null` result from a call that expects a value is itself
//! an error — enforced once, centrally, by `transport::response_into_result`.

use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Value, json};

use rpc_types::error::ClientError;
use rpc_types::receipt::{CallFee, CallRequest, LogEntry, LogFilter, TransactionReceipt};
use rpc_types::retry::RetryGovernor;
use rpc_types::wire::{Address, BlockTag, ChainId, Hash, HexData, Wei};

use crate::transport::Transport;

/// The subset of a block's fields the gas strategy and callers need.
#[derive(Debug, Clone)]
pub struct BlockHeader {
    /// Block number.
    pub number: u64,
    /// Block hash; absent for the pending block.
    pub hash: Option<Hash>,
    /// Unix timestamp the block was mined at.
    pub timestamp: u64,
    /// Block gas limit.
    pub gas_limit: u64,
    /// Gas actually used by the block's transactions.
    pub gas_used: u64,
    /// Base fee, present on post-EIP-1559 chains.
    pub base_fee_per_gas: Option<Wei>,
}

/// Result of `eth_feeHistory`.
#[derive(Debug, Clone)]
pub struct FeeHistory {
    /// Oldest block covered by this history.
    pub oldest_block: u64,
    /// Base fee per gas for each block in range, one longer than `gas_used_ratio`.
    pub base_fee_per_gas: Vec<Wei>,
    /// Fraction of gas limit used, per block.
    pub gas_used_ratio: Vec<f64>,
    /// Requested percentile priority fees, per block, if `reward_percentiles` was non-empty.
    pub reward: Vec<Vec<Wei>>,
}

/// Typed read operations, wrapping the provider transport under the retry governor.
#[derive(Clone)]
pub struct Reader {
    transport: Arc<dyn Transport>,
    retry: RetryGovernor,
}

impl Reader {
    /// Builds a reader over `transport`, retrying failed calls per `retry`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, retry: RetryGovernor) -> Self {
        Self { transport, retry }
    }

    async fn call(&self, method: &'static str, params: Value) -> Result<Value, ClientError> {
        self.retry.run(|| self.transport.send(method, params.clone())).await
    }

    /// `eth_chainId`.
    pub async fn chain_id(&self) -> Result<ChainId, ClientError> {
        parse_hex_u64(&self.call("eth_chainId", json!([])).await?)
    }

    /// `eth_blockNumber`.
    pub async fn block_number(&self) -> Result<u64, ClientError> {
        parse_hex_u64(&self.call("eth_blockNumber", json!([])).await?)
    }

    /// `eth_getBalance`.
    pub async fn balance(&self, address: Address, block: BlockTag) -> Result<Wei, ClientError> {
        let value = self
            .call("eth_getBalance", json!([address.to_string(), block.to_string()]))
            .await?;
        parse_wei(&value)
    }

    /// `eth_getTransactionCount`.
    pub async fn transaction_count(&self, address: Address, block: BlockTag) -> Result<u64, ClientError> {
        let value = self
            .call("eth_getTransactionCount", json!([address.to_string(), block.to_string()]))
            .await?;
        parse_hex_u64(&value)
    }

    /// `eth_getCode`.
    pub async fn code(&self, address: Address, block: BlockTag) -> Result<HexData, ClientError> {
        let value = self.call("eth_getCode", json!([address.to_string(), block.to_string()])).await?;
        parse_hex_data(&value)
    }

    /// `eth_getStorageAt`.
    pub async fn storage_at(&self, address: Address, slot: Hash, block: BlockTag) -> Result<Hash, ClientError> {
        let value = self
            .call("eth_getStorageAt", json!([address.to_string(), slot.to_string(), block.to_string()]))
            .await?;
        parse_hash(&value)
    }

    /// `eth_getBlockByNumber`.
    pub async fn block_by_number(&self, block: BlockTag, full_transactions: bool) -> Result<BlockHeader, ClientError> {
        let value = self
            .call("eth_getBlockByNumber", json!([block.to_string(), full_transactions]))
            .await?;
        parse_block_header(&value)
    }

    /// `eth_getBlockByHash`.
    pub async fn block_by_hash(&self, hash: Hash, full_transactions: bool) -> Result<BlockHeader, ClientError> {
        let value = self
            .call("eth_getBlockByHash", json!([hash.to_string(), full_transactions]))
            .await?;
        parse_block_header(&value)
    }

    /// `eth_getTransactionReceipt`.
    pub async fn transaction_receipt(&self, transaction_hash: Hash) -> Result<TransactionReceipt, ClientError> {
        let value = self
            .call("eth_getTransactionReceipt", json!([transaction_hash.to_string()]))
            .await?;
        parse_receipt(&value)
    }

    /// `eth_getTransactionByHash`, passed through as raw JSON: used to
    /// recover a mined transaction's `to`/`from`/`input`/`value` for
    /// revert-reason replay, a shape the stable wire types don't model.
    pub async fn transaction_by_hash(&self, transaction_hash: Hash) -> Result<Value, ClientError> {
        self.call("eth_getTransactionByHash", json!([transaction_hash.to_string()])).await
    }

    /// `eth_getLogs`, paginated by the node.
    pub async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, ClientError> {
        let value = self.call("eth_getLogs", json!([log_filter_to_json(filter)])).await?;
        let array = value.as_array().ok_or_else(|| ClientError::Decode("eth_getLogs: expected array".to_owned()))?;
        array.iter().map(parse_log_entry).collect()
    }

    /// `eth_call`.
    pub async fn call_contract(&self, request: &CallRequest, block: BlockTag) -> Result<HexData, ClientError> {
        let value = self
            .call("eth_call", json!([call_request_to_json(request), block.to_string()]))
            .await?;
        parse_hex_data(&value)
    }

    /// `eth_estimateGas`.
    pub async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, ClientError> {
        let value = self.call("eth_estimateGas", json!([call_request_to_json(request)])).await?;
        parse_hex_u64(&value)
    }

    /// `eth_gasPrice`.
    pub async fn gas_price(&self) -> Result<Wei, ClientError> {
        parse_wei(&self.call("eth_gasPrice", json!([])).await?)
    }

    /// `eth_maxPriorityFeePerGas`.
    pub async fn max_priority_fee_per_gas(&self) -> Result<Wei, ClientError> {
        parse_wei(&self.call("eth_maxPriorityFeePerGas", json!([])).await?)
    }

    /// `eth_blobBaseFee`.
    pub async fn blob_base_fee(&self) -> Result<Wei, ClientError> {
        parse_wei(&self.call("eth_blobBaseFee", json!([])).await?)
    }

    /// `eth_feeHistory`.
    pub async fn fee_history(
        &self,
        block_count: u64,
        newest_block: BlockTag,
        reward_percentiles: &[f64],
    ) -> Result<FeeHistory, ClientError> {
        let value = self
            .call(
                "eth_feeHistory",
                json!([format!("0x{block_count:x}"), newest_block.to_string(), reward_percentiles]),
            )
            .await?;
        parse_fee_history(&value)
    }

    /// `eth_simulateV1`.
    pub async fn simulate_v1(&self, payload: Value, block: BlockTag) -> Result<Value, ClientError> {
        self.call("eth_simulateV1", json!([payload, block.to_string()])).await
    }
}

fn parse_hex_u64(value: &Value) -> Result<u64, ClientError> {
    let s = value.as_str().ok_or_else(|| ClientError::Decode("expected hex string".to_owned()))?;
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(stripped, 16).map_err(|e| ClientError::Decode(e.to_string()))
}

fn parse_wei(value: &Value) -> Result<Wei, ClientError> {
    let s = value.as_str().ok_or_else(|| ClientError::Decode("expected hex string".to_owned()))?;
    Wei::from_str(s).map_err(|e| ClientError::Decode(e.to_string()))
}

fn parse_hex_data(value: &Value) -> Result<HexData, ClientError> {
    let s = value.as_str().ok_or_else(|| ClientError::Decode("expected hex string".to_owned()))?;
    HexData::from_str(s).map_err(|e| ClientError::Decode(e.to_string()))
}

fn parse_hash(value: &Value) -> Result<Hash, ClientError> {
    let s = value.as_str().ok_or_else(|| ClientError::Decode("expected hex string".to_owned()))?;
    Hash::from_str(s).map_err(|e| ClientError::Decode(e.to_string()))
}

fn parse_address(value: &Value) -> Result<Address, ClientError> {
    let s = value.as_str().ok_or_else(|| ClientError::Decode("expected hex string".to_owned()))?;
    Address::from_str(s).map_err(|e| ClientError::Decode(e.to_string()))
}

fn field<'a>(value: &'a Value, name: &str) -> Result<&'a Value, ClientError> {
    value.get(name).ok_or_else(|| ClientError::Decode(format!("missing field {name}")))
}

fn parse_block_header(value: &Value) -> Result<BlockHeader, ClientError> {
    let hash = match value.get("hash") {
        Some(Value::Null) | None => None,
        Some(v) => Some(parse_hash(v)?),
    };
    let base_fee_per_gas = match value.get("baseFeePerGas") {
        Some(Value::Null) | None => None,
        Some(v) => Some(parse_wei(v)?),
    };
    Ok(BlockHeader {
        number: parse_hex_u64(field(value, "number")?)?,
        hash,
        timestamp: parse_hex_u64(field(value, "timestamp")?)?,
        gas_limit: parse_hex_u64(field(value, "gasLimit")?)?,
        gas_used: parse_hex_u64(field(value, "gasUsed")?)?,
        base_fee_per_gas,
    })
}

fn parse_receipt(value: &Value) -> Result<TransactionReceipt, ClientError> {
    let to = match value.get("to") {
        Some(Value::Null) | None => None,
        Some(v) => Some(parse_address(v)?),
    };
    let contract_address = match value.get("contractAddress") {
        Some(Value::Null) | None => None,
        Some(v) => Some(parse_address(v)?),
    };
    let status_raw = parse_hex_u64(field(value, "status")?)?;
    let logs = field(value, "logs")?
        .as_array()
        .ok_or_else(|| ClientError::Decode("receipt.logs: expected array".to_owned()))?
        .iter()
        .map(parse_log_entry)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TransactionReceipt {
        transaction_hash: parse_hash(field(value, "transactionHash")?)?,
        block_number: parse_hex_u64(field(value, "blockNumber")?)?,
        from: parse_address(field(value, "from")?)?,
        to,
        contract_address,
        cumulative_gas_used: parse_hex_u64(field(value, "cumulativeGasUsed")?)?,
        status: status_raw == 1,
        logs,
    })
}

fn parse_log_entry(value: &Value) -> Result<LogEntry, ClientError> {
    let topics = field(value, "topics")?
        .as_array()
        .ok_or_else(|| ClientError::Decode("log.topics: expected array".to_owned()))?
        .iter()
        .map(parse_hash)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LogEntry {
        address: parse_address(field(value, "address")?)?,
        topics,
        data: parse_hex_data(field(value, "data")?)?,
        block_number: parse_hex_u64(field(value, "blockNumber")?)?,
        transaction_hash: parse_hash(field(value, "transactionHash")?)?,
        log_index: parse_hex_u64(field(value, "logIndex")?)?,
        removed: value.get("removed").and_then(Value::as_bool).unwrap_or(false),
    })
}

fn parse_fee_history(value: &Value) -> Result<FeeHistory, ClientError> {
    let base_fee_per_gas = field(value, "baseFeePerGas")?
        .as_array()
        .ok_or_else(|| ClientError::Decode("feeHistory.baseFeePerGas: expected array".to_owned()))?
        .iter()
        .map(parse_wei)
        .collect::<Result<Vec<_>, _>>()?;
    let gas_used_ratio = field(value, "gasUsedRatio")?
        .as_array()
        .ok_or_else(|| ClientError::Decode("feeHistory.gasUsedRatio: expected array".to_owned()))?
        .iter()
        .map(|v| v.as_f64().ok_or_else(|| ClientError::Decode("expected number".to_owned())))
        .collect::<Result<Vec<_>, _>>()?;
    let reward = match value.get("reward") {
        Some(Value::Array(rows)) => rows
            .iter()
            .map(|row| {
                row.as_array()
                    .ok_or_else(|| ClientError::Decode("feeHistory.reward: expected array".to_owned()))?
                    .iter()
                    .map(parse_wei)
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => Vec::new(),
    };
    Ok(FeeHistory { oldest_block: parse_hex_u64(field(value, "oldestBlock")?)?, base_fee_per_gas, gas_used_ratio, reward })
}

fn log_filter_to_json(filter: &LogFilter) -> Value {
    let mut object = serde_json::Map::new();
    if let Some(from_block) = &filter.from_block {
        object.insert("fromBlock".to_owned(), json!(from_block.to_string()));
    }
    if let Some(to_block) = &filter.to_block {
        object.insert("toBlock".to_owned(), json!(to_block.to_string()));
    }
    if let Some(addresses) = &filter.addresses {
        let rendered: Vec<String> = addresses.iter().map(ToString::to_string).collect();
        object.insert("address".to_owned(), json!(rendered));
    }
    if let Some(topics) = &filter.topics {
        let rendered: Vec<Value> =
            topics.iter().map(|t| t.as_ref().map_or(Value::Null, |h| json!(h.to_string()))).collect();
        object.insert("topics".to_owned(), json!(rendered));
    }
    Value::Object(object)
}

fn call_request_to_json(request: &CallRequest) -> Value {
    let mut object = serde_json::Map::new();
    if let Some(to) = &request.to {
        object.insert("to".to_owned(), json!(to.to_string()));
    }
    object.insert("data".to_owned(), json!(request.data.to_string()));
    if let Some(from) = &request.from {
        object.insert("from".to_owned(), json!(from.to_string()));
    }
    if let Some(value) = &request.value {
        object.insert("value".to_owned(), json!(value.to_hex()));
    }
    if let Some(gas) = request.gas {
        object.insert("gas".to_owned(), json!(format!("0x{gas:x}")));
    }
    match &request.fee {
        Some(CallFee::Legacy(gas_price)) => {
            object.insert("gasPrice".to_owned(), json!(gas_price.to_hex()));
        }
        Some(CallFee::Eip1559 { max_fee_per_gas, max_priority_fee_per_gas }) => {
            object.insert("maxFeePerGas".to_owned(), json!(max_fee_per_gas.to_hex()));
            object.insert("maxPriorityFeePerGas".to_owned(), json!(max_priority_fee_per_gas.to_hex()));
        }
        None => {}
    }
    Value::Object(object)
}
