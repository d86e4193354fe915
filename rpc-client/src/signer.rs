//! Signer facade (C5): build → default → sign → encode → submit → track.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tokio::sync::OnceCell;

use rpc_types::chain::ChainProfile;
use rpc_types::collab::{RevertDecoder, StandardRevertDecoder, TxSigner};
use rpc_types::error::{ClientError, RevertError, RevertKind};
use rpc_types::receipt::{CallRequest, TransactionReceipt};
use rpc_types::retry::RetryGovernor;
use rpc_types::tx::{
    AccessListEntry, BlobTransactionRequest, Eip1559TxFields, Eip4844TxFields, LegacyTxFields, TransactionRequest,
    UnsignedTransaction,
};
use rpc_types::wire::{Address, BlockTag, ChainId, Hash, HexData, Wei};

use crate::gas::GasStrategy;
use crate::reader::Reader;
use crate::transport::Transport;

/// Maximum interval between receipt polls in `send_transaction_and_wait`.
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Builds, signs, submits, and tracks transactions against a single chain.
pub struct Signer {
    reader: Reader,
    transport: Arc<dyn Transport>,
    retry: RetryGovernor,
    tx_signer: Arc<dyn TxSigner>,
    revert_decoder: Arc<dyn RevertDecoder>,
    gas_strategy: GasStrategy,
    profile: Option<ChainProfile>,
    chain_id_cell: OnceCell<ChainId>,
}

impl Signer {
    /// Builds a signer facade over `transport`, signing with `tx_signer`.
    ///
    /// `profile`, if supplied, is checked against the node's reported chain
    /// id on first use and pins the EIP-1559 support / default priority fee
    /// the gas strategy consults.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        retry: RetryGovernor,
        tx_signer: Arc<dyn TxSigner>,
        profile: Option<ChainProfile>,
    ) -> Self {
        Self {
            reader: Reader::new(transport.clone(), retry),
            transport,
            retry,
            tx_signer,
            revert_decoder: Arc::new(StandardRevertDecoder),
            gas_strategy: GasStrategy::default(),
            profile,
            chain_id_cell: OnceCell::new(),
        }
    }

    /// Overrides the default revert decoder.
    #[must_use]
    pub fn with_revert_decoder(mut self, decoder: Arc<dyn RevertDecoder>) -> Self {
        self.revert_decoder = decoder;
        self
    }

    /// Overrides the default `(120, 100)` gas-limit buffer ratio.
    #[must_use]
    pub const fn with_gas_strategy(mut self, gas_strategy: GasStrategy) -> Self {
        self.gas_strategy = gas_strategy;
        self
    }

    /// The reader facade sharing this signer's transport and retry governor.
    #[must_use]
    pub const fn reader(&self) -> &Reader {
        &self.reader
    }

    /// The address this signer signs on behalf of.
    #[must_use]
    pub fn address(&self) -> Address {
        self.tx_signer.address()
    }

    /// Fetches and caches `eth_chainId`, checking it against the configured
    /// `ChainProfile` if one was supplied.
    pub async fn chain_id(&self) -> Result<ChainId, ClientError> {
        let actual = *self
            .chain_id_cell
            .get_or_try_init(|| self.reader.chain_id())
            .await?;
        if let Some(profile) = &self.profile {
            if profile.chain_id != actual {
                return Err(ClientError::ChainMismatch { expected: profile.chain_id, actual });
            }
        }
        Ok(actual)
    }

    /// Builds, signs, and submits a transaction; returns its hash immediately
    /// without waiting for it to be mined.
    pub async fn send_transaction(&self, request: TransactionRequest) -> Result<Hash, ClientError> {
        if request.has_conflicting_fee_fields() {
            return Err(ClientError::InvalidRequest(
                "transaction request carries both legacy and EIP-1559 fee fields".to_owned(),
            ));
        }

        let chain_id = self.chain_id().await?;
        let from = request.from.unwrap_or_else(|| self.tx_signer.address());

        let filled = self.gas_strategy.fill(&self.reader, self.profile.as_ref(), from, request).await?.request;
        let nonce = match filled.nonce {
            Some(nonce) => nonce,
            None => self.reader.transaction_count(from, BlockTag::Pending).await?,
        };

        let unsigned = build_unsigned(&filled, nonce, chain_id)?;
        let signature = self.tx_signer.sign_transaction(&unsigned, chain_id).await?;
        let envelope = unsigned.encode_as_envelope(signature);
        self.submit_raw(&envelope).await
    }

    /// Builds, signs, and submits an EIP-4844 blob transaction, encoding the
    /// network wrapper (signed envelope + blob sidecar).
    pub async fn send_blob_transaction(&self, request: BlobTransactionRequest) -> Result<Hash, ClientError> {
        let chain_id = self.chain_id().await?;
        let from = request.from.unwrap_or_else(|| self.tx_signer.address());

        let nonce = match request.nonce {
            Some(nonce) => nonce,
            None => self.reader.transaction_count(from, BlockTag::Pending).await?,
        };
        let max_priority_fee_per_gas = match request.max_priority_fee_per_gas {
            Some(fee) => fee,
            None => match &self.profile {
                Some(profile) => profile.default_priority_fee,
                None => self.reader.max_priority_fee_per_gas().await?,
            },
        };
        let base_fee =
            self.reader.block_by_number(BlockTag::Latest, false).await?.base_fee_per_gas.unwrap_or(Wei::ZERO);
        let max_fee_per_gas = request
            .max_fee_per_gas
            .unwrap_or_else(|| Wei::from(alloy_primitives::U256::from(2u64) * base_fee.inner() + max_priority_fee_per_gas.inner()));
        let max_fee_per_blob_gas = match request.max_fee_per_blob_gas {
            Some(fee) => fee,
            None => self.reader.blob_base_fee().await?,
        };
        let gas_limit = match request.gas_limit {
            Some(limit) => limit,
            None => {
                let call_request = CallRequest {
                    to: Some(request.to),
                    data: request.data.clone().unwrap_or_default(),
                    from: Some(from),
                    value: request.value,
                    gas: None,
                    fee: None,
                };
                self.reader.estimate_gas(&call_request).await?.saturating_mul(120) / 100
            }
        };

        let fields = Eip4844TxFields {
            chain_id,
            nonce,
            max_priority_fee_per_gas: wei_to_u128(max_priority_fee_per_gas),
            max_fee_per_gas: wei_to_u128(max_fee_per_gas),
            gas_limit,
            to: request.to,
            value: request.value.unwrap_or(Wei::ZERO).inner(),
            data: request.data.unwrap_or_default(),
            access_list: request.access_list.unwrap_or_default(),
            max_fee_per_blob_gas: wei_to_u128(max_fee_per_blob_gas),
            blob_versioned_hashes: request.blob_versioned_hashes,
        };
        let unsigned = UnsignedTransaction::Eip4844(fields);
        let signature = self.tx_signer.sign_transaction(&unsigned, chain_id).await?;
        let envelope = unsigned.encode_as_network_wrapper(signature, &request.sidecar);
        self.submit_raw(&envelope).await
    }

    async fn submit_raw(&self, envelope: &[u8]) -> Result<Hash, ClientError> {
        let raw = format!("0x{}", alloy_primitives::hex::encode(envelope));
        let result = self.retry.run(|| self.transport.send("eth_sendRawTransaction", json!([raw.clone()]))).await;
        match result {
            Ok(value) => {
                let s = value.as_str().ok_or_else(|| ClientError::Decode("expected hex string".to_owned()))?;
                Hash::from_str(s).map_err(|e| ClientError::Decode(e.to_string()))
            }
            Err(ClientError::Rpc(rpc)) => {
                if let Some(data) = &rpc.data {
                    if ClientError::rpc_data_looks_like_revert(data) {
                        if let Some(hex) = data.as_str() {
                            if let Ok(revert_data) = HexData::from_str(hex) {
                                let (kind, reason, raw_data_hex) = self.revert_decoder.decode(&revert_data);
                                return Err(ClientError::Revert(RevertError { kind, reason, raw_data_hex }));
                            }
                        }
                    }
                }
                if rpc.message.to_lowercase().contains("invalid sender") {
                    return Err(ClientError::InvalidSender { transaction_hash: None });
                }
                Err(ClientError::Rpc(rpc))
            }
            Err(other) => Err(other),
        }
    }

    /// Submits `request` and polls until it is mined or `timeout` expires.
    ///
    /// The poll interval doubles after every attempt, capped at 10s. Uses
    /// monotonic time, never wall-clock, for the deadline.
    pub async fn send_transaction_and_wait(
        &self,
        request: TransactionRequest,
        timeout: Duration,
        initial_poll_interval: Duration,
    ) -> Result<TransactionReceipt, ClientError> {
        let hash = self.send_transaction(request).await?;
        self.wait_for_receipt(hash, timeout, initial_poll_interval).await
    }

    /// Polls for `hash`'s receipt; on a failed execution, replays the
    /// transaction via `eth_call` at the receipt's block to recover the
    /// revert reason.
    pub async fn wait_for_receipt(
        &self,
        hash: Hash,
        timeout: Duration,
        initial_poll_interval: Duration,
    ) -> Result<TransactionReceipt, ClientError> {
        let deadline = Instant::now() + timeout;
        let mut poll_interval = initial_poll_interval;

        loop {
            if let Ok(receipt) = self.reader.transaction_receipt(hash).await {
                if receipt.status {
                    return Ok(receipt);
                }
                return Err(self.diagnose_revert(hash, &receipt).await);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ClientError::Timeout { transaction_hash: Some(hash) });
            }
            let remaining = deadline.saturating_duration_since(now);
            tokio::time::sleep(poll_interval.min(remaining)).await;
            poll_interval = (poll_interval * 2).min(MAX_POLL_INTERVAL);
        }
    }

    async fn diagnose_revert(&self, hash: Hash, receipt: &TransactionReceipt) -> ClientError {
        let generic = || {
            ClientError::Revert(RevertError {
                kind: RevertKind::Unknown,
                reason: String::new(),
                raw_data_hex: String::new(),
            })
        };

        let Ok(tx) = self.reader.transaction_by_hash(hash).await else {
            return generic();
        };
        let to = tx.get("to").and_then(Value::as_str).and_then(|s| Address::from_str(s).ok());
        let from = tx
            .get("from")
            .and_then(Value::as_str)
            .and_then(|s| Address::from_str(s).ok())
            .unwrap_or(receipt.from);
        let data = tx
            .get("input")
            .and_then(Value::as_str)
            .and_then(|s| HexData::from_str(s).ok())
            .unwrap_or(HexData::EMPTY);
        let value = tx.get("value").and_then(Value::as_str).and_then(|s| Wei::from_str(s).ok());

        let call_request = CallRequest { to, data, from: Some(from), value, gas: None, fee: None };
        let block = BlockTag::Number(receipt.block_number);

        match self.reader.call_contract(&call_request, block).await {
            Ok(revert_data) if !revert_data.is_empty() => {
                let (kind, reason, raw_data_hex) = self.revert_decoder.decode(&revert_data);
                ClientError::Revert(RevertError { kind, reason, raw_data_hex })
            }
            Err(ClientError::Rpc(rpc)) => rpc
                .data
                .as_ref()
                .and_then(Value::as_str)
                .and_then(|s| HexData::from_str(s).ok())
                .map_or_else(generic, |revert_data| {
                    let (kind, reason, raw_data_hex) = self.revert_decoder.decode(&revert_data);
                    ClientError::Revert(RevertError { kind, reason, raw_data_hex })
                }),
            Ok(_) | Err(_) => generic(),
        }
    }
}

fn wei_to_u128(value: Wei) -> u128 {
    value.inner().to::<u128>()
}

fn build_unsigned(
    request: &TransactionRequest,
    nonce: u64,
    chain_id: ChainId,
) -> Result<UnsignedTransaction, ClientError> {
    let to = request.to;
    let value = request.value.unwrap_or(Wei::ZERO).inner();
    let data = request.data.clone().unwrap_or_default();
    let access_list: Vec<AccessListEntry> = request.access_list.clone().unwrap_or_default();
    let gas_limit = request
        .gas_limit
        .ok_or_else(|| ClientError::InvalidRequest("gas limit was not resolved before signing".to_owned()))?;

    if request.is_eip1559 {
        let max_fee_per_gas = request
            .max_fee_per_gas
            .ok_or_else(|| ClientError::InvalidRequest("max fee per gas was not resolved before signing".to_owned()))?;
        let max_priority_fee_per_gas = request.max_priority_fee_per_gas.ok_or_else(|| {
            ClientError::InvalidRequest("max priority fee per gas was not resolved before signing".to_owned())
        })?;
        Ok(UnsignedTransaction::Eip1559(Eip1559TxFields {
            chain_id,
            nonce,
            max_priority_fee_per_gas: wei_to_u128(max_priority_fee_per_gas),
            max_fee_per_gas: wei_to_u128(max_fee_per_gas),
            gas_limit,
            to,
            value,
            data,
            access_list,
        }))
    } else {
        let gas_price = request
            .gas_price
            .ok_or_else(|| ClientError::InvalidRequest("gas price was not resolved before signing".to_owned()))?;
        Ok(UnsignedTransaction::Legacy {
            chain_id: Some(chain_id),
            fields: LegacyTxFields { nonce, gas_price: wei_to_u128(gas_price), gas_limit, to, value, data },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_unsigned_rejects_unresolved_gas_limit() {
        let request = TransactionRequest { is_eip1559: false, gas_price: Some(Wei::from_u64(1)), ..Default::default() };
        let err = build_unsigned(&request, 0, 1).unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }
}
