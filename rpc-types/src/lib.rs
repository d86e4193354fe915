#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Wire types, error taxonomy, and retry governor for an EVM JSON-RPC client SDK.
//!
//! This crate is chain-provider-agnostic: it defines the data that crosses the
//! JSON-RPC wire and the classification of failures that talking to a node can
//! produce, but holds no socket, no event loop, and no signer. `rpc-client`
//! builds the transport and the facades on top of these types.
//!
//! # Modules
//!
//! - [`wire`] - stable semantic types: address, hash, wei, hex data, access lists
//! - [`tx`] - transaction requests and the unsigned/signed envelope encodings
//! - [`receipt`] - receipts, logs, log filters, call requests
//! - [`chain`] - chain profile, well-known network registry, chain-id patterns
//! - [`error`] - the error taxonomy consumed throughout the SDK
//! - [`retry`] - the retry governor: classification, backoff, exhaustion
//! - [`collab`] - narrow traits for capabilities CORE consumes but never implements
//!
//! # Feature Flags
//!
//! - `telemetry` - enables tracing instrumentation in the retry governor

pub mod chain;
pub mod collab;
pub mod error;
pub mod receipt;
pub mod retry;
pub mod tx;
pub mod wire;

pub use chain::{ChainIdPattern, ChainProfile, ChainRegistry, NetworkInfo, NetworkRegistry};
pub use error::ClientError;
pub use receipt::{CallRequest, LogEntry, LogFilter, TransactionReceipt};
pub use retry::{RetryConfig, RetryGovernor};
pub use tx::{
    AccessListEntry, BlobSidecar, BlobTransactionRequest, Signature, TransactionRequest, UnsignedTransaction,
};
pub use wire::{Address, BlockTag, ChainId, Hash, HexData, Wei};
