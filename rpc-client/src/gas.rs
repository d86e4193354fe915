//! Gas strategy (C4): fills missing gas/fee fields, falling back from
//! EIP-1559 to legacy when the target chain doesn't support fee-market
//! transactions.

use alloy_primitives::U256;

use rpc_types::chain::ChainProfile;
use rpc_types::error::ClientError;
use rpc_types::receipt::{CallFee, CallRequest};
use rpc_types::tx::TransactionRequest;
use rpc_types::wire::{Address, BlockTag, Wei};

use crate::reader::Reader;

/// The outcome of filling a [`TransactionRequest`]'s gas/fee fields.
#[derive(Debug, Clone)]
pub struct GasFillResult {
    /// The request with every gas/fee field resolved.
    pub request: TransactionRequest,
    /// `true` if the caller asked for EIP-1559 but the chain profile doesn't support it.
    pub fell_back_to_legacy: bool,
}

/// Fills missing gas/fee fields on a [`TransactionRequest`].
///
/// The `(numerator, denominator)` pair scales the `eth_estimateGas` result;
/// the default `(120, 100)` applies a 20% buffer.
#[derive(Debug, Clone, Copy)]
pub struct GasStrategy {
    gas_limit_buffer_numerator: u64,
    gas_limit_buffer_denominator: u64,
}

impl Default for GasStrategy {
    fn default() -> Self {
        Self { gas_limit_buffer_numerator: 120, gas_limit_buffer_denominator: 100 }
    }
}

impl GasStrategy {
    /// Builds a strategy with a custom gas-limit buffer ratio.
    #[must_use]
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self { gas_limit_buffer_numerator: numerator, gas_limit_buffer_denominator: denominator }
    }

    /// Resolves every gas/fee field `request` is missing, per the algorithm
    /// in the signer facade's gas-defaulting step.
    pub async fn fill(
        &self,
        reader: &Reader,
        profile: Option<&ChainProfile>,
        from: Address,
        request: TransactionRequest,
    ) -> Result<GasFillResult, ClientError> {
        if request.has_conflicting_fee_fields() {
            return Err(ClientError::InvalidRequest(
                "transaction request carries both legacy and EIP-1559 fee fields".to_owned(),
            ));
        }

        let mut request = request;
        let mut fell_back_to_legacy = false;

        if request.is_eip1559 {
            if let Some(profile) = profile {
                if !profile.supports_eip1559 {
                    #[cfg(feature = "telemetry")]
                    tracing::debug!(chain_id = profile.chain_id, "chain profile does not support EIP-1559; falling back to legacy");
                    request.is_eip1559 = false;
                    fell_back_to_legacy = true;
                }
            }
        }

        if request.is_eip1559 {
            if request.max_fee_per_gas.is_none() || request.max_priority_fee_per_gas.is_none() {
                let base_fee = reader
                    .block_by_number(BlockTag::Latest, false)
                    .await?
                    .base_fee_per_gas
                    .unwrap_or(Wei::ZERO);
                let priority_hint = match profile {
                    Some(profile) => profile.default_priority_fee,
                    None => reader.max_priority_fee_per_gas().await?,
                };
                let max_fee = Wei::from(U256::from(2u64) * base_fee.inner() + priority_hint.inner());
                request.max_priority_fee_per_gas.get_or_insert(priority_hint);
                request.max_fee_per_gas.get_or_insert(max_fee);
            }
        } else if request.gas_price.is_none() {
            request.gas_price = Some(reader.gas_price().await?);
        }

        if request.gas_limit.is_none() {
            let estimate_request = CallRequest {
                to: request.to,
                data: request.data.clone().unwrap_or_default(),
                from: Some(from),
                value: request.value,
                gas: None,
                fee: if request.is_eip1559 {
                    request.max_fee_per_gas.zip(request.max_priority_fee_per_gas).map(
                        |(max_fee_per_gas, max_priority_fee_per_gas)| CallFee::Eip1559 {
                            max_fee_per_gas,
                            max_priority_fee_per_gas,
                        },
                    )
                } else {
                    request.gas_price.map(CallFee::Legacy)
                },
            };
            let estimated = reader.estimate_gas(&estimate_request).await?;
            let buffered = estimated
                .saturating_mul(self.gas_limit_buffer_numerator)
                / self.gas_limit_buffer_denominator.max(1);
            request.gas_limit = Some(buffered);
        }

        Ok(GasFillResult { request, fell_back_to_legacy })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_buffer_is_twenty_percent() {
        let strategy = GasStrategy::default();
        assert_eq!(strategy.gas_limit_buffer_numerator, 120);
        assert_eq!(strategy.gas_limit_buffer_denominator, 100);
    }
}
