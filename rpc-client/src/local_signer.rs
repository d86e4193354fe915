//! Concrete [`TxSigner`] over `alloy-signer`, gated behind the `client`
//! feature so the core SDK never mandates a key-management scheme.
//!
//! Mirrors how the teacher wires `EthereumWallet`/`PrivateKeySigner` into
//! its chain provider: CORE only ever sees the narrow `TxSigner` trait.

use alloy_primitives::B256;
use alloy_signer::Signer as AlloySigner;
use async_trait::async_trait;

use rpc_types::collab::TxSigner;
use rpc_types::error::ClientError;
use rpc_types::tx::{Signature, UnsignedTransaction};
use rpc_types::wire::{Address, ChainId, Hash};

/// Adapts any `alloy_signer::Signer` (a local private key, a hardware
/// wallet, a remote KMS-backed signer) into this SDK's [`TxSigner`] seam.
#[derive(Debug, Clone)]
pub struct AlloyTxSigner<S> {
    inner: S,
}

impl<S> AlloyTxSigner<S>
where
    S: AlloySigner + Send + Sync,
{
    /// Wraps `signer`.
    #[must_use]
    pub const fn new(signer: S) -> Self {
        Self { inner: signer }
    }
}

#[async_trait]
impl<S> TxSigner for AlloyTxSigner<S>
where
    S: AlloySigner + Send + Sync,
{
    fn address(&self) -> Address {
        Address::from(self.inner.address())
    }

    async fn sign_transaction(
        &self,
        tx: &UnsignedTransaction,
        chain_id: ChainId,
    ) -> Result<Signature, ClientError> {
        let preimage = tx.encode_for_signing(chain_id);
        let digest = alloy_primitives::keccak256(&preimage);
        sign_prehash(&self.inner, digest).await
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, ClientError> {
        let signature = AlloySigner::sign_message(&self.inner, message)
            .await
            .map_err(|e| ClientError::Encode(e.to_string()))?;
        Ok(convert_signature(signature))
    }
}

async fn sign_prehash<S>(signer: &S, digest: B256) -> Result<Signature, ClientError>
where
    S: AlloySigner + Send + Sync,
{
    let signature = signer.sign_hash(&digest).await.map_err(|e| ClientError::Encode(e.to_string()))?;
    Ok(convert_signature(signature))
}

fn convert_signature(signature: alloy_primitives::Signature) -> Signature {
    Signature {
        r: Hash::new(signature.r().to_be_bytes()),
        s: Hash::new(signature.s().to_be_bytes()),
        v: u64::from(signature.v()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signs_a_message_and_reports_its_own_address() {
        let key = alloy_signer_local::PrivateKeySigner::random();
        let expected_address = Address::from(key.address());
        let signer = AlloyTxSigner::new(key);
        assert_eq!(signer.address(), expected_address);

        let signature = signer.sign_message(b"hello").await.unwrap();
        assert_ne!(signature.r, Hash::ZERO);
    }
}
