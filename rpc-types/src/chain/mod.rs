//! Chain profile, well-known network registry, and chain-id pattern matching.
//!
//! Chain routing is a static, per-application concern: a `ChainRegistry` maps
//! numeric chain ids to whatever provider type the caller configures. This is
//! not cross-chain bridging — there is no routing *logic* here, only lookup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::wire::{ChainId, Wei};

/// Static configuration for a single EVM chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainProfile {
    /// The chain's numeric id, as returned by `eth_chainId`.
    pub chain_id: ChainId,
    /// The RPC endpoint to reach this chain at, if configured statically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    /// Whether this chain accepts EIP-1559 fee-market transactions.
    pub supports_eip1559: bool,
    /// Priority fee to use when the node has no better hint.
    pub default_priority_fee: Wei,
}

impl ChainProfile {
    /// Builds a profile for a chain known to support EIP-1559, with the
    /// given default priority fee.
    #[must_use]
    pub fn eip1559(chain_id: ChainId, default_priority_fee: Wei) -> Self {
        Self { chain_id, rpc_url: None, supports_eip1559: true, default_priority_fee }
    }

    /// Builds a profile for a legacy-only chain.
    #[must_use]
    pub const fn legacy(chain_id: ChainId) -> Self {
        Self { chain_id, rpc_url: None, supports_eip1559: false, default_priority_fee: Wei::ZERO }
    }
}

/// A pattern matched against chain ids, for bulk provider lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainIdPattern {
    /// Matches every chain id.
    Wildcard,
    /// Matches exactly one chain id.
    Exact(ChainId),
    /// Matches any chain id in the set.
    Set(Vec<ChainId>),
}

impl ChainIdPattern {
    /// Returns `true` if `chain_id` satisfies this pattern.
    #[must_use]
    pub fn matches(&self, chain_id: ChainId) -> bool {
        match self {
            Self::Wildcard => true,
            Self::Exact(id) => *id == chain_id,
            Self::Set(ids) => ids.contains(&chain_id),
        }
    }
}

/// Registry of configured chain providers, indexed by chain id.
#[derive(Debug)]
pub struct ChainRegistry<P>(HashMap<ChainId, P>);

impl<P> ChainRegistry<P> {
    /// Creates a registry from a pre-built provider map.
    #[must_use]
    pub const fn new(providers: HashMap<ChainId, P>) -> Self {
        Self(providers)
    }

    /// Looks up a provider by exact chain id.
    #[must_use]
    pub fn by_chain_id(&self, chain_id: ChainId) -> Option<&P> {
        self.0.get(&chain_id)
    }

    /// Looks up all providers whose chain id matches `pattern`.
    #[must_use]
    pub fn by_pattern(&self, pattern: &ChainIdPattern) -> Vec<&P> {
        self.0
            .iter()
            .filter_map(|(id, provider)| pattern.matches(*id).then_some(provider))
            .collect()
    }

    /// Inserts or replaces the provider configured for `chain_id`.
    pub fn insert(&mut self, chain_id: ChainId, provider: P) {
        self.0.insert(chain_id, provider);
    }

    /// Number of configured chains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no chains are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<P> Default for ChainRegistry<P> {
    fn default() -> Self {
        Self(HashMap::new())
    }
}

/// A well-known network's static facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Human-readable network name, e.g. `"base"`.
    pub name: &'static str,
    /// The chain's numeric id.
    pub chain_id: ChainId,
    /// Whether this chain supports EIP-1559.
    pub supports_eip1559: bool,
}

/// Registry mapping well-known network names to chain ids and back.
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    by_name: HashMap<&'static str, NetworkInfo>,
    by_id: HashMap<ChainId, NetworkInfo>,
}

impl NetworkRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated from a slice of known networks.
    #[must_use]
    pub fn from_networks(networks: &[NetworkInfo]) -> Self {
        let mut registry = Self::new();
        registry.register(networks);
        registry
    }

    /// Registers additional networks into this registry.
    pub fn register(&mut self, networks: &[NetworkInfo]) {
        for info in networks {
            self.by_name.insert(info.name, *info);
            self.by_id.insert(info.chain_id, *info);
        }
    }

    /// Looks up a network by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&NetworkInfo> {
        self.by_name.get(name)
    }

    /// Looks up a network by chain id.
    #[must_use]
    pub fn by_chain_id(&self, chain_id: ChainId) -> Option<&NetworkInfo> {
        self.by_id.get(&chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_set_matches_members_only() {
        let pattern = ChainIdPattern::Set(vec![1, 8453]);
        assert!(pattern.matches(8453));
        assert!(!pattern.matches(10));
    }

    #[test]
    fn registry_round_trips_by_name_and_id() {
        let mut registry = NetworkRegistry::new();
        registry.register(&[NetworkInfo { name: "base", chain_id: 8453, supports_eip1559: true }]);
        assert_eq!(registry.by_name("base").unwrap().chain_id, 8453);
        assert_eq!(registry.by_chain_id(8453).unwrap().name, "base");
    }
}
