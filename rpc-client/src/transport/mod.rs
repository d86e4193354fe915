//! Provider transport (C1): carries JSON-RPC frames over HTTP or WebSocket.
//!
//! Two concrete transports share this module's [`Transport`] contract.
//! `HttpTransport` is stateless and supports only `send`; `WsTransport` is a
//! stateful multiplexer that also supports `subscribe`.

pub mod http;
pub mod ws;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use rpc_types::error::{ClientError, RpcError};

pub use http::HttpTransport;
pub use ws::{ConnectionState, WsConfig, WsTransport};

/// A JSON-RPC 2.0 request frame.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
    pub id: u64,
}

impl JsonRpcRequest {
    #[must_use]
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self { jsonrpc: "2.0", method: method.into(), params, id }
    }
}

/// A JSON-RPC 2.0 response frame: either a `result` or an `error`.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorBody>,
}

/// The `error` object of a JSON-RPC response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcErrorBody {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// A server-pushed notification frame (`eth_subscribe` callbacks).
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    pub method: String,
    pub params: NotificationParams,
}

/// The `params` object of a subscription notification.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationParams {
    pub subscription: String,
    pub result: Value,
}

/// Converts a response into a `Result`, applying the "null result from a
/// call that expects a value is itself an error" rule from the reader
/// facade's encoding contract.
pub fn response_into_result(response: JsonRpcResponse) -> Result<Value, ClientError> {
    if let Some(error) = response.error {
        return Err(ClientError::Rpc(RpcError {
            code: error.code,
            message: error.message,
            data: error.data,
            request_id: response.id,
        }));
    }
    match response.result {
        Some(Value::Null) | None => Err(ClientError::Rpc(RpcError {
            code: 0,
            message: "node returned a null result".to_owned(),
            data: None,
            request_id: response.id,
        })),
        Some(value) => Ok(value),
    }
}

/// Callback invoked for each decoded notification payload on a subscription.
pub type SubscriptionCallback = std::sync::Arc<dyn Fn(Value) + Send + Sync>;

/// Shared contract for the two provider transports.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a single JSON-RPC call and returns its `result` value.
    async fn send(&self, method: &str, params: Value) -> Result<Value, ClientError>;

    /// Subscribes to a server-pushed stream. Returns the server-assigned
    /// subscription id. Not supported by `HttpTransport`.
    async fn subscribe(
        &self,
        kind: &str,
        params: Value,
        callback: SubscriptionCallback,
    ) -> Result<String, ClientError>;

    /// Unsubscribes from a previously established subscription.
    async fn unsubscribe(&self, subscription_id: &str) -> Result<bool, ClientError>;

    /// Closes the transport: fails all pending requests, releases the socket.
    async fn close(&self);
}
