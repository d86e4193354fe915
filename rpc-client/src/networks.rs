//! Well-known EVM network chain ids and their EIP-1559 support, used to
//! give [`rpc_types::chain::ChainProfile`] sensible defaults without a
//! round-trip to the node.

use rpc_types::chain::{ChainProfile, NetworkInfo, NetworkRegistry};
use rpc_types::wire::{ChainId, Wei};

/// Ethereum Mainnet chain id.
pub const ETHEREUM_MAINNET: ChainId = 1;

/// Base Mainnet chain id.
pub const BASE_MAINNET: ChainId = 8453;

/// Base Sepolia (testnet) chain id.
pub const BASE_SEPOLIA: ChainId = 84532;

/// Polygon Mainnet chain id.
pub const POLYGON_MAINNET: ChainId = 137;

/// Polygon Amoy (testnet) chain id.
pub const POLYGON_AMOY: ChainId = 80002;

/// Avalanche C-Chain chain id.
pub const AVALANCHE_MAINNET: ChainId = 43114;

/// Avalanche Fuji (testnet) chain id.
pub const AVALANCHE_FUJI: ChainId = 43113;

/// Celo Mainnet chain id. Celo adopted EIP-1559 at the Espresso hardfork.
pub const CELO_MAINNET: ChainId = 42220;

/// Celo Sepolia (testnet) chain id.
pub const CELO_SEPOLIA: ChainId = 11_142_220;

/// `MegaETH` Mainnet (Frontier) chain id.
pub const MEGAETH_MAINNET: ChainId = 4326;

/// `MegaETH` Testnet v2 chain id.
pub const MEGAETH_TESTNET: ChainId = 6343;

/// Monad Mainnet chain id.
pub const MONAD_MAINNET: ChainId = 143;

/// Monad Testnet chain id.
pub const MONAD_TESTNET: ChainId = 10143;

/// The full table of well-known networks this SDK ships defaults for.
/// Every entry listed here supports EIP-1559; there are currently no
/// legacy-only chains in the table, but `ChainProfile::legacy` remains the
/// escape hatch for ones a caller configures manually.
const KNOWN_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo { name: "ethereum", chain_id: ETHEREUM_MAINNET, supports_eip1559: true },
    NetworkInfo { name: "base", chain_id: BASE_MAINNET, supports_eip1559: true },
    NetworkInfo { name: "base-sepolia", chain_id: BASE_SEPOLIA, supports_eip1559: true },
    NetworkInfo { name: "polygon", chain_id: POLYGON_MAINNET, supports_eip1559: true },
    NetworkInfo { name: "polygon-amoy", chain_id: POLYGON_AMOY, supports_eip1559: true },
    NetworkInfo { name: "avalanche", chain_id: AVALANCHE_MAINNET, supports_eip1559: true },
    NetworkInfo { name: "avalanche-fuji", chain_id: AVALANCHE_FUJI, supports_eip1559: true },
    NetworkInfo { name: "celo", chain_id: CELO_MAINNET, supports_eip1559: true },
    NetworkInfo { name: "celo-sepolia", chain_id: CELO_SEPOLIA, supports_eip1559: true },
    NetworkInfo { name: "megaeth", chain_id: MEGAETH_MAINNET, supports_eip1559: true },
    NetworkInfo { name: "megaeth-testnet", chain_id: MEGAETH_TESTNET, supports_eip1559: true },
    NetworkInfo { name: "monad", chain_id: MONAD_MAINNET, supports_eip1559: true },
    NetworkInfo { name: "monad-testnet", chain_id: MONAD_TESTNET, supports_eip1559: true },
];

/// Builds a [`NetworkRegistry`] pre-populated with every network this crate
/// knows about.
#[must_use]
pub fn known_networks() -> NetworkRegistry {
    NetworkRegistry::from_networks(KNOWN_NETWORKS)
}

/// Builds a [`ChainProfile`] for a well-known network, if `chain_id` is in
/// [`known_networks`]. Unrecognized chain ids return `None`; callers should
/// fall back to `ChainProfile::legacy`/`ChainProfile::eip1559` built from
/// their own configuration in that case.
#[must_use]
pub fn well_known_profile(chain_id: ChainId, default_priority_fee: Wei) -> Option<ChainProfile> {
    let info = known_networks().by_chain_id(chain_id).copied()?;
    Some(ChainProfile {
        chain_id: info.chain_id,
        rpc_url: None,
        supports_eip1559: info.supports_eip1559,
        default_priority_fee,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_base_by_name_and_id() {
        let registry = known_networks();
        assert_eq!(registry.by_name("base").unwrap().chain_id, BASE_MAINNET);
        assert_eq!(registry.by_chain_id(BASE_MAINNET).unwrap().name, "base");
    }

    #[test]
    fn well_known_profile_carries_eip1559_flag() {
        let profile = well_known_profile(BASE_MAINNET, Wei::ZERO).unwrap();
        assert!(profile.supports_eip1559);
    }

    #[test]
    fn unknown_chain_id_has_no_well_known_profile() {
        assert!(well_known_profile(999_999_999, Wei::ZERO).is_none());
    }
}
