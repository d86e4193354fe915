//! Stateless HTTP provider transport.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use rpc_types::error::ClientError;

use super::{JsonRpcRequest, JsonRpcResponse, SubscriptionCallback, Transport, response_into_result};

/// Posts one JSON-RPC request object per `send`, parses the response.
///
/// Stateless: no connection is held open between calls and no subscription
/// support is offered (subscriptions require a push-capable transport).
/// Each `reqwest::Client` already pools HTTP/1.1 keep-alive connections, so
/// concurrent sends from multiple callers naturally pipeline without this
/// type needing its own batching window.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: url::Url,
    next_id: AtomicU64,
}

impl HttpTransport {
    /// Builds a transport posting requests to `url`.
    #[must_use]
    pub fn new(client: reqwest::Client, url: url::Url) -> Self {
        Self { client, url, next_id: AtomicU64::new(1) }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);
        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::Io(e.to_string()))?;
        let body: JsonRpcResponse =
            response.json().await.map_err(|e| ClientError::Decode(e.to_string()))?;
        response_into_result(body)
    }

    async fn subscribe(
        &self,
        _kind: &str,
        _params: Value,
        _callback: SubscriptionCallback,
    ) -> Result<String, ClientError> {
        Err(ClientError::InvalidRequest(
            "subscriptions are not supported over the HTTP transport".to_owned(),
        ))
    }

    async fn unsubscribe(&self, _subscription_id: &str) -> Result<bool, ClientError> {
        Err(ClientError::InvalidRequest(
            "subscriptions are not supported over the HTTP transport".to_owned(),
        ))
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn decodes_a_successful_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": "0x1",
            })))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(reqwest::Client::new(), server.uri().parse().unwrap());
        let result = transport.send("eth_chainId", json!([])).await.unwrap();
        assert_eq!(result, json!("0x1"));
    }

    #[tokio::test]
    async fn surfaces_a_json_rpc_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32000, "message": "execution reverted" },
            })))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(reqwest::Client::new(), server.uri().parse().unwrap());
        let err = transport.send("eth_call", json!([])).await.unwrap_err();
        assert!(matches!(err, ClientError::Rpc(rpc) if rpc.message == "execution reverted"));
    }

    #[tokio::test]
    async fn a_null_result_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": null,
            })))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(reqwest::Client::new(), server.uri().parse().unwrap());
        assert!(transport.send("eth_getTransactionReceipt", json!([])).await.is_err());
    }

    #[tokio::test]
    async fn subscriptions_are_rejected() {
        let transport = HttpTransport::new(reqwest::Client::new(), "http://127.0.0.1:1".parse().unwrap());
        let callback: SubscriptionCallback = std::sync::Arc::new(|_| {});
        assert!(transport.subscribe("newHeads", json!([]), callback).await.is_err());
        assert!(transport.unsubscribe("0x1").await.is_err());
    }
}
