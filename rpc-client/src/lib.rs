#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! An EVM-compatible JSON-RPC client SDK.
//!
//! This crate provides the provider-facing half of the workspace: a
//! transport multiplexer over HTTP and WebSocket, typed read/write
//! facades built on top of it, and a developer-node controller for
//! Anvil/Hardhat-family test chains. The chain-agnostic wire types, error
//! taxonomy, and retry governor live in `rpc-types`; this crate is the
//! EVM-specific provider built on them.
//!
//! # Architecture
//!
//! - [`transport`] — C1: `HttpTransport` and `WsTransport`, the two
//!   concrete [`transport::Transport`] implementations.
//! - [`reader`] — C3: typed read operations (`eth_call`, `eth_getLogs`,
//!   balances, receipts, ...).
//! - [`gas`] — C4: gas/fee defaulting, with EIP-1559-to-legacy fallback.
//! - [`signer`] — C5: the transaction lifecycle facade (build, default,
//!   sign, submit, wait for receipt).
//! - [`subscription`] — C6: subscription bookkeeping and
//!   reconnect-driven resubscription on top of [`transport::WsTransport`].
//! - [`tester`] — C7: the Anvil/Hardhat developer-node method surface.
//! - [`config`] — provider configuration loading (TOML + `$VAR` expansion).
//! - [`observer`] — the optional cross-cutting telemetry collaborator.
//! - [`networks`] — well-known EVM chain ids and their EIP-1559 support.
//!
//! # Feature Flags
//!
//! - `client` (default) — pulls in `alloy-signer-local` for
//!   [`local_signer::AlloyTxSigner`], a concrete [`rpc_types::collab::TxSigner`].
//! - `telemetry` — `tracing` instrumentation at the transport, retry, and
//!   subscription boundaries.
//! - `full` — both of the above.
//!
//! # Usage
//!
//! ```ignore
//! use rpc_client::config::RpcConfig;
//! use rpc_client::reader::Reader;
//! use rpc_client::transport::HttpTransport;
//! use rpc_types::retry::RetryGovernor;
//! use std::sync::Arc;
//!
//! let config = RpcConfig::load()?;
//! let transport = Arc::new(HttpTransport::new(reqwest::Client::new(), config.rpc_url.parse()?));
//! let reader = Reader::new(transport, RetryGovernor::new(config.retry_config()));
//! let balance = reader.balance(address, BlockTag::Latest).await?;
//! ```

pub mod config;
pub mod gas;
#[cfg(feature = "client")]
pub mod local_signer;
pub mod networks;
pub mod observer;
pub mod reader;
pub mod signer;
pub mod subscription;
pub mod tester;
pub mod transport;

#[cfg(feature = "client")]
pub use local_signer::AlloyTxSigner;
pub use config::RpcConfig;
pub use gas::GasStrategy;
pub use reader::Reader;
pub use signer::Signer;
pub use subscription::SubscriptionManager;
pub use tester::TesterController;
