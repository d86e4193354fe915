//! Provider configuration: TOML file loading with `$VAR`/`${VAR}` environment
//! expansion, for config files that embed secrets without committing them
//! to disk.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rpc_types::chain::ChainProfile;
use rpc_types::retry::RetryConfig;
use rpc_types::wire::{ChainId, Wei};

use crate::transport::WsConfig;

/// Failure loading or parsing a provider configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file was not valid TOML for this shape.
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Provider configuration: the RPC endpoints, chain profile, and tunables
/// needed to build a [`crate::reader::Reader`]/[`crate::signer::Signer`] pair.
///
/// Loaded from TOML (see [`Self::load`]/[`Self::from_toml_str`]) or built
/// directly from the process environment (see [`Self::from_env`]); both
/// paths converge on the same typed shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// HTTP JSON-RPC endpoint.
    pub rpc_url: String,
    /// WebSocket endpoint, if subscriptions are needed.
    #[serde(default)]
    pub ws_url: Option<String>,
    /// The chain this config targets, as reported by `eth_chainId`.
    pub chain_id: ChainId,
    /// Whether the target chain accepts EIP-1559 fee-market transactions.
    #[serde(default)]
    pub supports_eip1559: bool,
    /// Priority fee to use when the node offers no better hint, in wei.
    #[serde(default)]
    pub default_priority_fee_wei: u64,
    /// Hex private key for the default signer (with or without `0x`).
    /// Supports `$VAR`/`${VAR}` environment expansion.
    #[serde(default)]
    pub signer_private_key: Option<String>,
    /// Maximum concurrently in-flight WebSocket requests.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
    /// Per-request timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Maximum WebSocket reconnect attempts before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Maximum attempts the retry governor makes per call, including the first.
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
}

fn default_max_pending() -> usize {
    WsConfig::default().max_pending
}

fn default_request_timeout_secs() -> u64 {
    WsConfig::default().request_timeout.as_secs()
}

fn default_max_reconnect_attempts() -> u32 {
    WsConfig::default().max_reconnect_attempts
}

fn default_retry_max_attempts() -> u32 {
    RetryConfig::default().max_attempts
}

impl RpcConfig {
    /// Loads configuration from the path given by the `RPC_CLIENT_CONFIG`
    /// environment variable, falling back to `rpc-client.toml` in the
    /// current directory. Missing files are treated as empty TOML so env
    /// overrides alone can populate a config in CI.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but fails to parse.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("RPC_CLIENT_CONFIG").unwrap_or_else(|_| "rpc-client.toml".to_owned());
        Self::load_from(&path)
    }

    /// Loads configuration from a specific TOML file path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = if path.exists() { std::fs::read_to_string(path)? } else { String::new() };
        Self::from_toml_str(&content)
    }

    /// Parses `content` as TOML, expanding `$VAR`/`${VAR}` references from
    /// the process environment first.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the expanded content doesn't parse
    /// into this shape.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content);
        Ok(toml::from_str(&expanded)?)
    }

    /// Builds a config purely from environment variables, without a file:
    /// `RPC_URL` (required), `WS_URL`, `CHAIN_ID` (required), `SUPPORTS_EIP1559`,
    /// `DEFAULT_PRIORITY_FEE_WEI`, `SIGNER_PRIVATE_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `None` if `RPC_URL` or `CHAIN_ID` is missing or `CHAIN_ID`
    /// doesn't parse as a number.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let rpc_url = std::env::var("RPC_URL").ok()?;
        let chain_id: ChainId = std::env::var("CHAIN_ID").ok()?.parse().ok()?;
        Some(Self {
            rpc_url,
            ws_url: std::env::var("WS_URL").ok(),
            chain_id,
            supports_eip1559: std::env::var("SUPPORTS_EIP1559").is_ok_and(|v| v == "true" || v == "1"),
            default_priority_fee_wei: std::env::var("DEFAULT_PRIORITY_FEE_WEI")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            signer_private_key: std::env::var("SIGNER_PRIVATE_KEY").ok(),
            max_pending: default_max_pending(),
            request_timeout_secs: default_request_timeout_secs(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            retry_max_attempts: default_retry_max_attempts(),
        })
    }

    /// Builds the [`ChainProfile`] this config describes.
    #[must_use]
    pub fn chain_profile(&self) -> ChainProfile {
        ChainProfile {
            chain_id: self.chain_id,
            rpc_url: Some(self.rpc_url.clone()),
            supports_eip1559: self.supports_eip1559,
            default_priority_fee: Wei::from_u64(self.default_priority_fee_wei),
        }
    }

    /// Builds the [`RetryConfig`] this config describes, keeping the
    /// backoff base/cap at their library defaults and overriding only the
    /// attempt count.
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig { max_attempts: self.retry_max_attempts, ..RetryConfig::default() }
    }

    /// Builds the [`WsConfig`] this config describes.
    #[must_use]
    pub fn ws_config(&self) -> WsConfig {
        WsConfig {
            max_pending: self.max_pending,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_reconnect_attempts: self.max_reconnect_attempts,
            ..WsConfig::default()
        }
    }
}

/// Expands `$VAR` and `${VAR}` patterns in a string from environment
/// variables; unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut var_name = String::new();
        while let Some(&c) = chars.peek() {
            if braced {
                if c == '}' {
                    chars.next();
                    break;
                }
            } else if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            var_name.push(c);
            chars.next();
        }

        if var_name.is_empty() {
            result.push('$');
            if braced {
                result.push('{');
            }
        } else if let Ok(val) = std::env::var(&var_name) {
            result.push_str(&val);
        } else {
            result.push('$');
            if braced {
                result.push('{');
            }
            result.push_str(&var_name);
            if braced {
                result.push('}');
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_braced_and_bare_vars() {
        // SAFETY: test runs single-threaded within this process; no other
        // test reads this variable.
        unsafe { std::env::set_var("RPC_CLIENT_CONFIG_TEST_VAR", "base-mainnet") };
        assert_eq!(expand_env_vars("rpc_url = \"$RPC_CLIENT_CONFIG_TEST_VAR\""), "rpc_url = \"base-mainnet\"");
        assert_eq!(
            expand_env_vars("rpc_url = \"${RPC_CLIENT_CONFIG_TEST_VAR}\""),
            "rpc_url = \"base-mainnet\""
        );
        unsafe { std::env::remove_var("RPC_CLIENT_CONFIG_TEST_VAR") };
    }

    #[test]
    fn leaves_unresolved_vars_untouched() {
        assert_eq!(expand_env_vars("$DEFINITELY_NOT_SET_XYZ"), "$DEFINITELY_NOT_SET_XYZ");
    }

    #[test]
    fn parses_minimal_toml() {
        let config = RpcConfig::from_toml_str("rpc_url = \"http://localhost:8545\"\nchain_id = 31337\n").unwrap();
        assert_eq!(config.chain_id, 31337);
        assert!(!config.supports_eip1559);
        assert_eq!(config.max_pending, WsConfig::default().max_pending);
    }
}
