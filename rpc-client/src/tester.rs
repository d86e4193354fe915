//! Tester controller (C7): the Anvil/Hardhat developer-node method surface,
//! built over a [`Signer`] so impersonation sessions can still submit
//! transactions through the same gas-default/sign/submit pipeline.

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use rpc_types::error::ClientError;
use rpc_types::tx::TransactionRequest;
use rpc_types::wire::{Address, Hash, HexData, Wei};

use crate::reader::Reader;
use crate::signer::Signer;
use crate::transport::Transport;

/// An opaque handle returned by [`TesterController::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotId(u64);

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Wraps a [`Signer`] pointed at an Anvil/Hardhat-family developer node with
/// the state-manipulation, mining, time, snapshot, and impersonation methods
/// those nodes expose beyond the standard JSON-RPC surface.
pub struct TesterController {
    signer: Signer,
    transport: Arc<dyn Transport>,
    /// Local mirror of outstanding snapshot ids, outermost first; reverting
    /// to an outer id drops everything nested inside it, matching the node's
    /// own snapshot-stack semantics.
    snapshot_stack: Mutex<Vec<SnapshotId>>,
}

impl TesterController {
    /// Builds a controller over `signer`'s transport.
    #[must_use]
    pub fn new(signer: Signer, transport: Arc<dyn Transport>) -> Self {
        Self { signer, transport, snapshot_stack: Mutex::new(Vec::new()) }
    }

    /// The underlying signer, for sending transactions against the test node.
    #[must_use]
    pub const fn signer(&self) -> &Signer {
        &self.signer
    }

    /// The reader facade sharing this controller's transport.
    #[must_use]
    pub fn reader(&self) -> &Reader {
        self.signer.reader()
    }

    async fn call(&self, method: &'static str, params: Value) -> Result<Value, ClientError> {
        self.transport.send(method, params).await
    }

    // -- State manipulation ------------------------------------------------

    /// `anvil_setBalance`.
    pub async fn set_balance(&self, address: Address, balance: Wei) -> Result<(), ClientError> {
        self.call("anvil_setBalance", json!([address.to_string(), balance.to_hex()])).await?;
        Ok(())
    }

    /// `anvil_setCode`.
    pub async fn set_code(&self, address: Address, code: &HexData) -> Result<(), ClientError> {
        self.call("anvil_setCode", json!([address.to_string(), code.to_string()])).await?;
        Ok(())
    }

    /// `anvil_setNonce`.
    pub async fn set_nonce(&self, address: Address, nonce: u64) -> Result<(), ClientError> {
        self.call("anvil_setNonce", json!([address.to_string(), format!("0x{nonce:x}")])).await?;
        Ok(())
    }

    /// `anvil_setStorageAt`.
    pub async fn set_storage_at(&self, address: Address, slot: Hash, value: Hash) -> Result<(), ClientError> {
        self.call("anvil_setStorageAt", json!([address.to_string(), slot.to_string(), value.to_string()]))
            .await?;
        Ok(())
    }

    // -- Mining --------------------------------------------------------------

    /// Mines exactly one block.
    pub async fn mine(&self) -> Result<(), ClientError> {
        self.call("evm_mine", json!([])).await?;
        Ok(())
    }

    /// Mines `count` blocks back-to-back.
    pub async fn mine_n(&self, count: u64) -> Result<(), ClientError> {
        self.call("anvil_mine", json!([format!("0x{count:x}")])).await?;
        Ok(())
    }

    /// Mines `count` blocks, `interval_seconds` apart.
    pub async fn mine_n_with_interval(&self, count: u64, interval_seconds: u64) -> Result<(), ClientError> {
        self.call("anvil_mine", json!([format!("0x{count:x}"), format!("0x{interval_seconds:x}")])).await?;
        Ok(())
    }

    /// Mines one block stamped with `timestamp`.
    pub async fn mine_at(&self, timestamp: u64) -> Result<(), ClientError> {
        self.call("evm_mine", json!([{ "timestamp": timestamp }])).await?;
        Ok(())
    }

    // -- Time ------------------------------------------------------------

    /// `evm_increaseTime`.
    pub async fn increase_time(&self, seconds: u64) -> Result<(), ClientError> {
        self.call("evm_increaseTime", json!([seconds])).await?;
        Ok(())
    }

    /// `evm_setNextBlockTimestamp`. Applies to the next mined block only;
    /// callers must re-call this before each subsequent block if they need
    /// more than one timestamp pinned.
    pub async fn set_next_block_timestamp(&self, timestamp: u64) -> Result<(), ClientError> {
        self.call("evm_setNextBlockTimestamp", json!([timestamp])).await?;
        Ok(())
    }

    // -- Snapshots ---------------------------------------------------------

    /// `evm_snapshot`. Snapshots nest: reverting to an outer id invalidates
    /// every id taken after it.
    pub async fn snapshot(&self) -> Result<SnapshotId, ClientError> {
        let value = self.call("evm_snapshot", json!([])).await?;
        let raw = value.as_str().ok_or_else(|| ClientError::Decode("evm_snapshot: expected hex string".to_owned()))?;
        let stripped = raw.strip_prefix("0x").unwrap_or(raw);
        let id = SnapshotId(u64::from_str_radix(stripped, 16).map_err(|e| ClientError::Decode(e.to_string()))?);
        self.snapshot_stack.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(id);
        Ok(id)
    }

    /// `evm_revert`. Drops `id` and every snapshot nested inside it from the
    /// local stack, matching the node dropping them server-side.
    pub async fn revert(&self, id: SnapshotId) -> Result<bool, ClientError> {
        let value = self.call("evm_revert", json!([format!("0x{:x}", id.0)])).await?;
        let acknowledged = value.as_bool().unwrap_or(false);
        if acknowledged {
            let mut stack = self.snapshot_stack.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(pos) = stack.iter().position(|s| *s == id) {
                stack.truncate(pos);
            }
        }
        Ok(acknowledged)
    }

    // -- Impersonation -------------------------------------------------------

    /// `anvil_impersonateAccount`. Returns a scoped session that forces
    /// `from = address` on every transaction sent through it and releases
    /// impersonation when closed. Impersonation alone does not credit ETH —
    /// pair with [`Self::set_balance`] if the account needs to pay gas.
    pub async fn impersonate(&self, address: Address) -> Result<ImpersonationSession<'_>, ClientError> {
        self.call("anvil_impersonateAccount", json!([address.to_string()])).await?;
        Ok(ImpersonationSession { controller: self, address, released: false })
    }

    // -- Automine ------------------------------------------------------------

    /// `anvil_getAutomine`.
    pub async fn get_automine(&self) -> Result<bool, ClientError> {
        let value = self.call("anvil_getAutomine", json!([])).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// `anvil_setAutomine`.
    pub async fn set_automine(&self, enabled: bool) -> Result<(), ClientError> {
        self.call("anvil_setAutomine", json!([enabled])).await?;
        Ok(())
    }

    /// `evm_setIntervalMining`.
    pub async fn set_interval_mining(&self, seconds: u64) -> Result<(), ClientError> {
        self.call("evm_setIntervalMining", json!([seconds])).await?;
        Ok(())
    }

    // -- Block config --------------------------------------------------------

    /// `anvil_setNextBlockBaseFeePerGas`.
    pub async fn set_next_block_base_fee(&self, base_fee: Wei) -> Result<(), ClientError> {
        self.call("anvil_setNextBlockBaseFeePerGas", json!([base_fee.to_hex()])).await?;
        Ok(())
    }

    /// `evm_setBlockGasLimit`.
    pub async fn set_block_gas_limit(&self, gas_limit: u64) -> Result<(), ClientError> {
        self.call("evm_setBlockGasLimit", json!([format!("0x{gas_limit:x}")])).await?;
        Ok(())
    }

    /// `anvil_setCoinbase`.
    pub async fn set_coinbase(&self, address: Address) -> Result<(), ClientError> {
        self.call("anvil_setCoinbase", json!([address.to_string()])).await?;
        Ok(())
    }

    // -- State import/export --------------------------------------------------

    /// `anvil_dumpState`.
    pub async fn dump_state(&self) -> Result<HexData, ClientError> {
        let value = self.call("anvil_dumpState", json!([])).await?;
        let s = value.as_str().ok_or_else(|| ClientError::Decode("anvil_dumpState: expected hex string".to_owned()))?;
        HexData::from_str(s).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// `anvil_loadState`.
    pub async fn load_state(&self, state: &HexData) -> Result<bool, ClientError> {
        let value = self.call("anvil_loadState", json!([state.to_string()])).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    // -- Reset / fork ---------------------------------------------------------

    /// `anvil_reset`, clearing all state back to a clean chain.
    pub async fn reset(&self) -> Result<(), ClientError> {
        self.call("anvil_reset", json!([])).await?;
        self.snapshot_stack.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clear();
        Ok(())
    }

    /// `anvil_reset`, forking from `fork_rpc_url` at `block_number`. Queries
    /// against the local chain afterward see remote state as of that block;
    /// local transactions advance from it without touching the remote chain.
    pub async fn reset_fork(&self, fork_rpc_url: &str, block_number: u64) -> Result<(), ClientError> {
        self.call(
            "anvil_reset",
            json!([{ "forking": { "jsonRpcUrl": fork_rpc_url, "blockNumber": block_number } }]),
        )
        .await?;
        self.snapshot_stack.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clear();
        Ok(())
    }
}

/// A scoped impersonation session: transactions sent through it force
/// `from = address`, ignoring any caller-supplied `from`. Dropping without
/// calling [`Self::close`] logs a warning (under the `telemetry` feature)
/// since the node-side impersonation is only released by an explicit call.
pub struct ImpersonationSession<'a> {
    controller: &'a TesterController,
    address: Address,
    released: bool,
}

impl ImpersonationSession<'_> {
    /// The impersonated address every transaction through this session uses.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Sends `request` with `from` forced to the impersonated address.
    pub async fn send_transaction(&self, mut request: TransactionRequest) -> Result<Hash, ClientError> {
        request.from = Some(self.address);
        self.controller.signer.send_transaction(request).await
    }

    /// `anvil_stopImpersonatingAccount`; consumes the session.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.release().await
    }

    async fn release(&mut self) -> Result<(), ClientError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.controller
            .call("anvil_stopImpersonatingAccount", json!([self.address.to_string()]))
            .await?;
        Ok(())
    }
}

impl Drop for ImpersonationSession<'_> {
    fn drop(&mut self) {
        if !self.released {
            #[cfg(feature = "telemetry")]
            tracing::warn!(
                address = %self.address,
                "impersonation session dropped without close(); node-side impersonation was not released"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_id_renders_as_hex() {
        assert_eq!(SnapshotId(0x10).to_string(), "0x10");
    }
}
