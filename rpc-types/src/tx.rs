//! Transaction requests and the unsigned/signed envelope encodings.
//!
//! `UnsignedTransaction` hand-rolls RLP envelope construction on top of
//! `alloy_rlp`/`alloy_primitives` primitives rather than delegating to a
//! pre-built transaction-type encoder: producing the signing preimage and
//! the broadcast envelope is CORE responsibility, not something consumed
//! from a collaborator.

use alloy_primitives::U256;
use alloy_rlp::{Encodable, Header};
use serde::{Deserialize, Serialize};

use crate::wire::{Address, ChainId, Hash, HexData, Wei};

/// A pre-declared address + storage keys pair (EIP-2930).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessListEntry {
    /// The address whose storage is pre-warmed.
    pub address: Address,
    /// Storage slots to pre-warm for `address`.
    pub storage_keys: Vec<Hash>,
}

/// Builder-populated transaction request with optional, not-yet-defaulted fields.
///
/// Legacy transactions must not carry `max_fee_per_gas`/`max_priority_fee_per_gas`,
/// and EIP-1559/4844 transactions must not carry `gas_price`; `TransactionRequest`
/// does not enforce this at construction time (it is a builder for values still
/// being filled in) but the [`crate::error::ClientError::InvalidRequest`] kind is
/// raised if both forms are present when the request is finalized into an
/// [`UnsignedTransaction`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Sender address, if already known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Recipient address; `None` means contract creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// Value transferred, in wei.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Wei>,
    /// Gas limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    /// Legacy gas price, in wei.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<Wei>,
    /// EIP-1559 priority fee, in wei.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<Wei>,
    /// EIP-1559 max total fee, in wei.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<Wei>,
    /// Explicit nonce; fetched from the node when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    /// Call data / init code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<HexData>,
    /// Whether this request should be built as an EIP-1559 transaction.
    pub is_eip1559: bool,
    /// Pre-declared storage access, meaningful only for EIP-1559/4844.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_list: Option<Vec<AccessListEntry>>,
}

impl TransactionRequest {
    /// Returns `true` if both legacy and EIP-1559 fee fields are present —
    /// a request in this state can never be finalized into an
    /// [`UnsignedTransaction`].
    #[must_use]
    pub const fn has_conflicting_fee_fields(&self) -> bool {
        self.gas_price.is_some()
            && (self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some())
    }
}

/// A `(r, s, v)` ECDSA signature, normalized to low-s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// The `r` component.
    pub r: Hash,
    /// The `s` component.
    pub s: Hash,
    /// For legacy transactions, the full EIP-155-adjusted `v`. For typed
    /// transactions, the bare `yParity` (0 or 1).
    pub v: u64,
}

impl Signature {
    /// Returns the bare `yParity` bit, recovering it from a legacy `v` if
    /// the value looks EIP-155-adjusted (`v > 1`).
    #[must_use]
    pub const fn y_parity(&self) -> u64 {
        if self.v <= 1 { self.v } else { (self.v + 1) % 2 }
    }
}

fn rlp_wrap_list(payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 9);
    Header { list: true, payload_length: payload.len() }.encode(&mut out);
    out.extend_from_slice(&payload);
    out
}

fn enc<T: Encodable>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.encode(&mut buf);
    buf
}

const EMPTY_STRING: [u8; 1] = [0x80];

fn encode_to(to: Option<&Address>) -> Vec<u8> {
    to.map_or_else(|| EMPTY_STRING.to_vec(), |a| enc(&a.inner()))
}

fn encode_access_list_entry(entry: &AccessListEntry) -> Vec<u8> {
    let addr = enc(&entry.address.inner());
    let keys_payload: Vec<u8> = entry
        .storage_keys
        .iter()
        .flat_map(|k| enc(&k.inner()))
        .collect();
    let keys = rlp_wrap_list(keys_payload);
    let mut payload = addr;
    payload.extend_from_slice(&keys);
    rlp_wrap_list(payload)
}

fn encode_access_list(list: &[AccessListEntry]) -> Vec<u8> {
    let payload: Vec<u8> = list.iter().flat_map(encode_access_list_entry).collect();
    rlp_wrap_list(payload)
}

/// The minimum fields required to build a legacy transaction envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTxFields {
    /// Sender nonce.
    pub nonce: u64,
    /// Gas price, in wei.
    pub gas_price: u128,
    /// Gas limit.
    pub gas_limit: u64,
    /// Recipient; `None` for contract creation.
    pub to: Option<Address>,
    /// Value transferred, in wei.
    pub value: U256,
    /// Call data / init code.
    pub data: HexData,
}

/// The minimum fields required to build an EIP-1559 transaction envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip1559TxFields {
    /// Chain id this transaction is valid on.
    pub chain_id: ChainId,
    /// Sender nonce.
    pub nonce: u64,
    /// Priority fee, in wei.
    pub max_priority_fee_per_gas: u128,
    /// Max total fee, in wei.
    pub max_fee_per_gas: u128,
    /// Gas limit.
    pub gas_limit: u64,
    /// Recipient; `None` for contract creation.
    pub to: Option<Address>,
    /// Value transferred, in wei.
    pub value: U256,
    /// Call data / init code.
    pub data: HexData,
    /// Pre-declared storage access.
    pub access_list: Vec<AccessListEntry>,
}

/// The minimum fields required to build an EIP-4844 transaction envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip4844TxFields {
    /// Chain id this transaction is valid on.
    pub chain_id: ChainId,
    /// Sender nonce.
    pub nonce: u64,
    /// Priority fee, in wei.
    pub max_priority_fee_per_gas: u128,
    /// Max total fee, in wei.
    pub max_fee_per_gas: u128,
    /// Gas limit.
    pub gas_limit: u64,
    /// Recipient; blob transactions never carry contract creation.
    pub to: Address,
    /// Value transferred, in wei.
    pub value: U256,
    /// Call data.
    pub data: HexData,
    /// Pre-declared storage access.
    pub access_list: Vec<AccessListEntry>,
    /// Max fee per blob gas unit, in wei.
    pub max_fee_per_blob_gas: u128,
    /// Versioned hashes of the attached blobs.
    pub blob_versioned_hashes: Vec<Hash>,
}

/// Builder-populated request for the blob-transaction entry point
/// (`sendBlobTransaction`), mirroring [`TransactionRequest`] but scoped to
/// the fields EIP-4844 transactions require.
#[derive(Debug, Clone)]
pub struct BlobTransactionRequest {
    /// Sender address, if already known.
    pub from: Option<Address>,
    /// Recipient; blob transactions never carry contract creation.
    pub to: Address,
    /// Value transferred, in wei.
    pub value: Option<Wei>,
    /// Gas limit.
    pub gas_limit: Option<u64>,
    /// EIP-1559 priority fee, in wei.
    pub max_priority_fee_per_gas: Option<Wei>,
    /// EIP-1559 max total fee, in wei.
    pub max_fee_per_gas: Option<Wei>,
    /// Max fee per blob gas unit, in wei.
    pub max_fee_per_blob_gas: Option<Wei>,
    /// Explicit nonce; fetched from the node when absent.
    pub nonce: Option<u64>,
    /// Call data.
    pub data: Option<HexData>,
    /// Pre-declared storage access.
    pub access_list: Option<Vec<AccessListEntry>>,
    /// Versioned hashes of the attached blobs.
    pub blob_versioned_hashes: Vec<Hash>,
    /// The blob payloads and their KZG commitments/proofs.
    pub sidecar: BlobSidecar,
}

/// The sidecar attached to an EIP-4844 transaction's network wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobSidecar {
    /// Raw blob payloads.
    pub blobs: Vec<HexData>,
    /// KZG commitments, one per blob.
    pub commitments: Vec<HexData>,
    /// KZG proofs, one per blob.
    pub proofs: Vec<HexData>,
}

/// A fully-populated but unsigned transaction, tagged by envelope kind.
///
/// Exposes the two operations the signer facade needs: `encode_for_signing`
/// (the preimage that gets keccak-hashed and signed) and `encode_as_envelope`
/// (the bytes submitted via `eth_sendRawTransaction`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsignedTransaction {
    /// Pre-EIP-1559 transaction with a single `gasPrice`.
    Legacy {
        /// The chain id used for EIP-155 replay protection, if any.
        chain_id: Option<ChainId>,
        /// The transaction fields.
        fields: LegacyTxFields,
    },
    /// Fee-market transaction, envelope tag `0x02`.
    Eip1559(Eip1559TxFields),
    /// Blob-carrying transaction, envelope tag `0x03`.
    Eip4844(Eip4844TxFields),
}

impl UnsignedTransaction {
    /// Produces the preimage that is keccak-hashed and signed.
    #[must_use]
    pub fn encode_for_signing(&self, chain_id: ChainId) -> Vec<u8> {
        match self {
            Self::Legacy { fields, .. } => {
                let payload = legacy_payload(
                    fields,
                    Some((chain_id, U256::ZERO, U256::ZERO)),
                );
                rlp_wrap_list(payload)
            }
            Self::Eip1559(fields) => {
                let mut out = vec![0x02];
                out.extend(rlp_wrap_list(eip1559_payload(fields, None)));
                out
            }
            Self::Eip4844(fields) => {
                let mut out = vec![0x03];
                out.extend(rlp_wrap_list(eip4844_payload(fields, None)));
                out
            }
        }
    }

    /// Produces the raw envelope submitted via `eth_sendRawTransaction`.
    #[must_use]
    pub fn encode_as_envelope(&self, signature: Signature) -> Vec<u8> {
        match self {
            Self::Legacy { chain_id, fields } => {
                let y_parity = signature.y_parity();
                let v = match chain_id {
                    Some(cid) => U256::from(*cid * 2 + 35 + y_parity),
                    None => U256::from(27 + y_parity),
                };
                let r = U256::from_be_bytes(*signature.r.as_bytes());
                let s = U256::from_be_bytes(*signature.s.as_bytes());
                rlp_wrap_list(legacy_signed_payload(fields, v, r, s))
            }
            Self::Eip1559(fields) => {
                let mut out = vec![0x02];
                out.extend(rlp_wrap_list(eip1559_payload(fields, Some(signature))));
                out
            }
            Self::Eip4844(fields) => {
                let mut out = vec![0x03];
                out.extend(rlp_wrap_list(eip4844_payload(fields, Some(signature))));
                out
            }
        }
    }

    /// Produces the network wrapper for an EIP-4844 transaction: the signed
    /// envelope alongside its blob sidecar.
    #[must_use]
    pub fn encode_as_network_wrapper(&self, signature: Signature, sidecar: &BlobSidecar) -> Vec<u8> {
        let Self::Eip4844(fields) = self else {
            return self.encode_as_envelope(signature);
        };
        let tx_payload = eip4844_payload(fields, Some(signature));
        let tx_list = rlp_wrap_list(tx_payload);

        let blobs_payload: Vec<u8> = sidecar.blobs.iter().flat_map(|b| enc(b.as_bytes())).collect();
        let commitments_payload: Vec<u8> =
            sidecar.commitments.iter().flat_map(|c| enc(c.as_bytes())).collect();
        let proofs_payload: Vec<u8> = sidecar.proofs.iter().flat_map(|p| enc(p.as_bytes())).collect();

        let mut wrapper_payload = tx_list;
        wrapper_payload.extend(rlp_wrap_list(blobs_payload));
        wrapper_payload.extend(rlp_wrap_list(commitments_payload));
        wrapper_payload.extend(rlp_wrap_list(proofs_payload));

        let mut out = vec![0x03];
        out.extend(rlp_wrap_list(wrapper_payload));
        out
    }

    /// The chain id this transaction is scoped to, if known.
    #[must_use]
    pub const fn chain_id(&self) -> Option<ChainId> {
        match self {
            Self::Legacy { chain_id, .. } => *chain_id,
            Self::Eip1559(f) => Some(f.chain_id),
            Self::Eip4844(f) => Some(f.chain_id),
        }
    }
}

fn legacy_payload(fields: &LegacyTxFields, eip155: Option<(ChainId, U256, U256)>) -> Vec<u8> {
    let mut payload = enc(&fields.nonce);
    payload.extend(enc(&fields.gas_price));
    payload.extend(enc(&fields.gas_limit));
    payload.extend(encode_to(fields.to.as_ref()));
    payload.extend(enc(&fields.value));
    payload.extend(enc(fields.data.as_bytes()));
    if let Some((chain_id, r, s)) = eip155 {
        payload.extend(enc(&chain_id));
        payload.extend(enc(&r));
        payload.extend(enc(&s));
    }
    payload
}

fn legacy_signed_payload(fields: &LegacyTxFields, v: U256, r: U256, s: U256) -> Vec<u8> {
    let mut payload = enc(&fields.nonce);
    payload.extend(enc(&fields.gas_price));
    payload.extend(enc(&fields.gas_limit));
    payload.extend(encode_to(fields.to.as_ref()));
    payload.extend(enc(&fields.value));
    payload.extend(enc(fields.data.as_bytes()));
    payload.extend(enc(&v));
    payload.extend(enc(&r));
    payload.extend(enc(&s));
    payload
}

fn eip1559_payload(fields: &Eip1559TxFields, signature: Option<Signature>) -> Vec<u8> {
    let mut payload = enc(&fields.chain_id);
    payload.extend(enc(&fields.nonce));
    payload.extend(enc(&fields.max_priority_fee_per_gas));
    payload.extend(enc(&fields.max_fee_per_gas));
    payload.extend(enc(&fields.gas_limit));
    payload.extend(encode_to(fields.to.as_ref()));
    payload.extend(enc(&fields.value));
    payload.extend(enc(fields.data.as_bytes()));
    payload.extend(encode_access_list(&fields.access_list));
    if let Some(sig) = signature {
        payload.extend(enc(&sig.y_parity()));
        payload.extend(enc(&U256::from_be_bytes(*sig.r.as_bytes())));
        payload.extend(enc(&U256::from_be_bytes(*sig.s.as_bytes())));
    }
    payload
}

fn eip4844_payload(fields: &Eip4844TxFields, signature: Option<Signature>) -> Vec<u8> {
    let mut payload = enc(&fields.chain_id);
    payload.extend(enc(&fields.nonce));
    payload.extend(enc(&fields.max_priority_fee_per_gas));
    payload.extend(enc(&fields.max_fee_per_gas));
    payload.extend(enc(&fields.gas_limit));
    payload.extend(enc(&fields.to.inner()));
    payload.extend(enc(&fields.value));
    payload.extend(enc(fields.data.as_bytes()));
    payload.extend(encode_access_list(&fields.access_list));
    payload.extend(enc(&fields.max_fee_per_blob_gas));
    let hashes_payload: Vec<u8> = fields.blob_versioned_hashes.iter().flat_map(|h| enc(&h.inner())).collect();
    payload.extend(rlp_wrap_list(hashes_payload));
    if let Some(sig) = signature {
        payload.extend(enc(&sig.y_parity()));
        payload.extend(enc(&U256::from_be_bytes(*sig.r.as_bytes())));
        payload.extend(enc(&U256::from_be_bytes(*sig.s.as_bytes())));
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_legacy() -> UnsignedTransaction {
        UnsignedTransaction::Legacy {
            chain_id: Some(31337),
            fields: LegacyTxFields {
                nonce: 0,
                gas_price: 1_000_000_000,
                gas_limit: 21000,
                to: Some(Address::from_str("0x742d35cc6634c0532925a3b844bc9e7595f0beb4").unwrap()),
                value: U256::from(100u64),
                data: HexData::EMPTY,
            },
        }
    }

    #[test]
    fn legacy_envelope_is_rlp_list() {
        let tx = sample_legacy();
        let preimage = tx.encode_for_signing(31337);
        assert!(preimage[0] > 0x7f, "legacy RLP list prefix must exceed 0x7f");
    }

    #[test]
    fn eip1559_envelope_starts_with_0x02() {
        let tx = UnsignedTransaction::Eip1559(Eip1559TxFields {
            chain_id: 31337,
            nonce: 0,
            max_priority_fee_per_gas: 1,
            max_fee_per_gas: 2,
            gas_limit: 21000,
            to: Some(Address::ZERO),
            value: U256::ZERO,
            data: HexData::EMPTY,
            access_list: vec![],
        });
        let envelope = tx.encode_as_envelope(Signature { r: Hash::ZERO, s: Hash::ZERO, v: 0 });
        assert_eq!(envelope[0], 0x02);
    }

    #[test]
    fn eip4844_envelope_starts_with_0x03() {
        let tx = UnsignedTransaction::Eip4844(Eip4844TxFields {
            chain_id: 31337,
            nonce: 0,
            max_priority_fee_per_gas: 1,
            max_fee_per_gas: 2,
            gas_limit: 21000,
            to: Address::ZERO,
            value: U256::ZERO,
            data: HexData::EMPTY,
            access_list: vec![],
            max_fee_per_blob_gas: 1,
            blob_versioned_hashes: vec![Hash::ZERO],
        });
        let envelope = tx.encode_as_envelope(Signature { r: Hash::ZERO, s: Hash::ZERO, v: 1 });
        assert_eq!(envelope[0], 0x03);
    }

    #[test]
    fn y_parity_recovers_from_eip155_v() {
        let sig = Signature { r: Hash::ZERO, s: Hash::ZERO, v: 31337 * 2 + 35 };
        assert_eq!(sig.y_parity(), 0);
        let sig = Signature { r: Hash::ZERO, s: Hash::ZERO, v: 31337 * 2 + 36 };
        assert_eq!(sig.y_parity(), 1);
    }
}
