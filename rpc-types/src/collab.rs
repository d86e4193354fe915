//! Narrow traits for capabilities CORE consumes but never implements.
//!
//! Keccak256, ECDSA signing, ABI encode/decode, and EIP-712 hashing are all
//! out of scope for this SDK; these traits are the seams through which CORE
//! calls into them without depending on a concrete implementation.

use crate::error::{ClientError, RevertKind};
use crate::tx::{Signature, UnsignedTransaction};
use crate::wire::{Address, ChainId, Hash, HexData};

/// Computes the Keccak256 hash CORE needs to produce a transaction's signing
/// preimage hash; CORE never hand-rolls the Keccak permutation itself.
pub trait Keccak: Send + Sync {
    /// Hashes `data`, returning the 32-byte digest.
    fn hash(&self, data: &[u8]) -> Hash;
}

/// Default [`Keccak`] backed by `alloy_primitives`'s vendored implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlloyKeccak;

impl Keccak for AlloyKeccak {
    fn hash(&self, data: &[u8]) -> Hash {
        Hash::from(alloy_primitives::keccak256(data))
    }
}

/// Signs transaction preimages and arbitrary messages.
///
/// Shaped after `alloy_signer::Signer`: implementors hold (or proxy to) a
/// private key, a hardware wallet, or a remote signing service. CORE depends
/// only on this trait, never on a concrete key-management scheme.
#[async_trait::async_trait]
pub trait TxSigner: Send + Sync {
    /// The address this signer signs on behalf of.
    fn address(&self) -> Address;

    /// Signs the preimage of `tx` for `chain_id`, returning a signature.
    async fn sign_transaction(
        &self,
        tx: &UnsignedTransaction,
        chain_id: ChainId,
    ) -> Result<Signature, ClientError>;

    /// Signs an arbitrary message (not a transaction preimage).
    async fn sign_message(&self, message: &[u8]) -> Result<Signature, ClientError>;
}

/// Decodes revert data into a documented `(kind, reason, rawHex)` triple.
pub trait RevertDecoder: Send + Sync {
    /// Decodes `data`, a `0x`-prefixed revert payload.
    fn decode(&self, data: &HexData) -> (RevertKind, String, String);
}

/// Default [`RevertDecoder`] recognizing the two standard Solidity selectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRevertDecoder;

const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

impl RevertDecoder for StandardRevertDecoder {
    fn decode(&self, data: &HexData) -> (RevertKind, String, String) {
        let raw_hex = data.to_string();
        let bytes = data.as_bytes();
        if bytes.len() < 4 {
            return (RevertKind::Unknown, String::new(), raw_hex);
        }
        let selector = &bytes[0..4];
        if selector == ERROR_STRING_SELECTOR {
            let reason = decode_abi_string(&bytes[4..]).unwrap_or_default();
            (RevertKind::ErrorString, reason, raw_hex)
        } else if selector == PANIC_SELECTOR {
            let code = decode_abi_u256_low_byte(&bytes[4..]);
            (RevertKind::Panic, panic_reason(code), raw_hex)
        } else {
            (RevertKind::CustomError, String::new(), raw_hex)
        }
    }
}

/// Minimal ABI decode of a single trailing `string` return value, enough to
/// extract `Error(string)`'s `reason` without a full ABI-decode dependency.
fn decode_abi_string(tail: &[u8]) -> Option<String> {
    if tail.len() < 64 {
        return None;
    }
    let offset = u32::from_be_bytes(tail.get(28..32)?.try_into().ok()?) as usize;
    let len = u32::from_be_bytes(tail.get(offset + 28..offset + 32)?.try_into().ok()?) as usize;
    let start = offset + 32;
    let bytes = tail.get(start..start + len)?;
    Some(String::from_utf8_lossy(bytes).into_owned())
}

fn decode_abi_u256_low_byte(tail: &[u8]) -> u8 {
    tail.last().copied().unwrap_or(0)
}

fn panic_reason(code: u8) -> String {
    match code {
        0x01 => "assertion failed",
        0x11 => "arithmetic overflow or underflow",
        0x12 => "division or modulo by zero",
        0x21 => "invalid enum value",
        0x22 => "invalid storage byte array access",
        0x31 => "pop from empty array",
        0x32 => "array index out of bounds",
        0x41 => "out-of-memory allocation failure",
        0x51 => "called an uninitialized function pointer",
        _ => "unknown panic code",
    }
    .to_owned()
}

/// Encodes function calls and decodes return values / event logs.
pub trait Abi: Send + Sync {
    /// Encodes a call to `name` with the given already-encoded argument words.
    fn encode_function(&self, name: &str, args: &HexData) -> Result<HexData, ClientError>;

    /// Computes the topic hash for an event signature, e.g. `"Transfer(address,address,uint256)"`.
    fn event_topic(&self, signature: &str) -> Hash;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_panic_division_by_zero() {
        let mut bytes = PANIC_SELECTOR.to_vec();
        bytes.extend(std::iter::repeat_n(0u8, 31));
        bytes.push(0x12);
        let (kind, reason, _) = StandardRevertDecoder.decode(&HexData::new(bytes));
        assert_eq!(kind, RevertKind::Panic);
        assert_eq!(reason, "division or modulo by zero");
    }

    #[test]
    fn decodes_error_string() {
        let mut bytes = ERROR_STRING_SELECTOR.to_vec();
        bytes.extend(std::iter::repeat_n(0u8, 31));
        bytes.push(0x20); // offset = 32
        let reason = b"simple reason";
        bytes.extend(std::iter::repeat_n(0u8, 31));
        bytes.push(reason.len() as u8);
        bytes.extend_from_slice(reason);
        bytes.extend(std::iter::repeat_n(0u8, 32 - reason.len()));
        let (kind, decoded, _) = StandardRevertDecoder.decode(&HexData::new(bytes));
        assert_eq!(kind, RevertKind::ErrorString);
        assert_eq!(decoded, "simple reason");
    }

    #[test]
    fn unknown_selector_is_custom_error() {
        let bytes = vec![0xde, 0xad, 0xbe, 0xef, 0x01];
        let (kind, _, _) = StandardRevertDecoder.decode(&HexData::new(bytes));
        assert_eq!(kind, RevertKind::CustomError);
    }
}
