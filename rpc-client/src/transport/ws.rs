//! Stateful WebSocket provider transport: the JSON-RPC request multiplexer.
//!
//! A single I/O task owns the socket and the pending-requests map; producers
//! (callers) submit work through a bounded MPSC queue. This is a parallel-
//! threads model externally but single-threaded at the I/O boundary —
//! response ordering is not guaranteed to match request order.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;

use rpc_types::error::{ClientError, RpcError};

use super::{
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, SubscriptionCallback, Transport,
    response_into_result,
};
use crate::observer::{NullObserver, RpcObserver};

/// Connection lifecycle states of the WebSocket transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Initial connect (or reconnect) attempt in flight.
    Connecting,
    /// Socket is live and serving requests.
    Connected,
    /// Socket was lost; reconnect attempts are in progress.
    Reconnecting,
    /// Closed explicitly or reconnect attempts were exhausted; terminal.
    Closed,
}

/// Tunable knobs for the WebSocket transport.
#[derive(Debug, Clone, Copy)]
pub struct WsConfig {
    /// Maximum number of concurrently in-flight requests.
    pub max_pending: usize,
    /// Capacity of the producer-to-I/O-loop command queue.
    pub queue_capacity: usize,
    /// Per-request deadline.
    pub request_timeout: Duration,
    /// Maximum reconnect attempts before transitioning to `Closed`.
    pub max_reconnect_attempts: u32,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            max_pending: 256,
            queue_capacity: 1024,
            request_timeout: Duration::from_secs(30),
            max_reconnect_attempts: 10,
        }
    }
}

type PendingMap = Arc<DashMap<u64, oneshot::Sender<Result<Value, ClientError>>>>;
type SubscriptionMap = Arc<DashMap<String, SubscriptionCallback>>;

enum Command {
    Call { request: JsonRpcRequest },
    Close,
}

/// The stateful WebSocket provider transport.
#[derive(Debug)]
pub struct WsTransport {
    cmd_tx: mpsc::Sender<Command>,
    pending: PendingMap,
    pending_count: Arc<AtomicUsize>,
    next_id: AtomicU64,
    config: WsConfig,
    state_rx: watch::Receiver<ConnectionState>,
    subscriptions: SubscriptionMap,
    orphan_count: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
    observer: Arc<dyn RpcObserver>,
}

impl WsTransport {
    /// Connects to `url` and spawns the I/O loop on the current Tokio runtime,
    /// reporting only to its own internal counters.
    ///
    /// The spawned task is owned by this transport: closing it (or dropping
    /// every handle) terminates the task and fails any requests still in
    /// flight.
    pub async fn connect(url: url::Url, config: WsConfig) -> Result<Self, ClientError> {
        Self::connect_with_observer(url, config, Arc::new(NullObserver)).await
    }

    /// Connects to `url`, additionally reporting orphan responses and
    /// reconnect attempts to `observer`.
    pub async fn connect_with_observer(
        url: url::Url,
        config: WsConfig,
        observer: Arc<dyn RpcObserver>,
    ) -> Result<Self, ClientError> {
        let (cmd_tx, cmd_rx) = mpsc::channel(config.queue_capacity);
        let pending: PendingMap = Arc::new(DashMap::new());
        let pending_count = Arc::new(AtomicUsize::new(0));
        let subscriptions: SubscriptionMap = Arc::new(DashMap::new());
        let orphan_count = Arc::new(AtomicU64::new(0));
        let closed = Arc::new(AtomicBool::new(false));
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let loop_url = url.clone();
        let loop_pending = pending.clone();
        let loop_subscriptions = subscriptions.clone();
        let loop_orphans = orphan_count.clone();
        let loop_observer = observer.clone();
        tokio::spawn(run_io_loop(
            loop_url,
            config,
            cmd_rx,
            loop_pending,
            loop_subscriptions,
            loop_orphans,
            state_tx,
            loop_observer,
        ));

        Ok(Self {
            cmd_tx,
            pending,
            pending_count,
            next_id: AtomicU64::new(1),
            config,
            state_rx,
            subscriptions,
            orphan_count,
            closed,
            observer,
        })
    }

    /// The transport's current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// A receiver that observes connection-state transitions; the
    /// subscription manager (C6) watches this to know when to resubscribe.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Number of orphan responses observed (ids with no matching pending request).
    #[must_use]
    pub fn orphan_count(&self) -> u64 {
        self.orphan_count.load(Ordering::Relaxed)
    }

    /// The observer this transport reports orphan responses and reconnect
    /// attempts to.
    #[must_use]
    pub fn observer(&self) -> &Arc<dyn RpcObserver> {
        &self.observer
    }

    fn try_acquire_slot(&self) -> Result<(), ClientError> {
        loop {
            let current = self.pending_count.load(Ordering::Acquire);
            if current >= self.config.max_pending {
                return Err(ClientError::Backpressure { limit: self.config.max_pending });
            }
            if self
                .pending_count
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Ok(());
            }
        }
    }

    fn release_slot(&self) {
        self.pending_count.fetch_sub(1, Ordering::AcqRel);
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let state = self.state();
        if state == ConnectionState::Closed {
            return Err(ClientError::TransportClosed);
        }
        if state == ConnectionState::Reconnecting {
            return Err(ClientError::ChannelInactive);
        }

        self.try_acquire_slot()?;
        let _guard = SlotGuard(self);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        let request = JsonRpcRequest::new(id, method, params);
        if self.cmd_tx.send(Command::Call { request }).await.is_err() {
            self.pending.remove(&id);
            return Err(ClientError::TransportClosed);
        }

        let timeout = tokio::time::timeout(self.config.request_timeout, rx).await;
        match timeout {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::TransportClosed),
            Err(_) => {
                self.pending.remove(&id);
                Err(ClientError::Timeout { transaction_hash: None })
            }
        }
    }
}

/// Releases the backpressure slot when a call completes, times out, or its
/// future is dropped — ensures the counter and the pending map never drift
/// apart even under cancellation.
struct SlotGuard<'a>(&'a WsTransport);
impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.0.release_slot();
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        self.call(method, params).await
    }

    async fn subscribe(
        &self,
        kind: &str,
        params: Value,
        callback: SubscriptionCallback,
    ) -> Result<String, ClientError> {
        let mut full_params = vec![Value::String(kind.to_owned())];
        if let Value::Array(extra) = params {
            full_params.extend(extra);
        }
        let result = self.call("eth_subscribe", Value::Array(full_params)).await?;
        let subscription_id = result
            .as_str()
            .ok_or_else(|| ClientError::Decode("eth_subscribe did not return a string id".to_owned()))?
            .to_owned();
        self.subscriptions.insert(subscription_id.clone(), callback);
        Ok(subscription_id)
    }

    async fn unsubscribe(&self, subscription_id: &str) -> Result<bool, ClientError> {
        let result = self
            .call("eth_unsubscribe", Value::Array(vec![Value::String(subscription_id.to_owned())]))
            .await?;
        self.subscriptions.remove(subscription_id);
        Ok(result.as_bool().unwrap_or(false))
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.cmd_tx.send(Command::Close).await;
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_io_loop(
    url: url::Url,
    config: WsConfig,
    mut cmd_rx: mpsc::Receiver<Command>,
    pending: PendingMap,
    subscriptions: SubscriptionMap,
    orphan_count: Arc<AtomicU64>,
    state_tx: watch::Sender<ConnectionState>,
    observer: Arc<dyn RpcObserver>,
) {
    let mut attempt: u32 = 0;

    'connect: loop {
        let _ = state_tx.send(if attempt == 0 {
            ConnectionState::Connecting
        } else {
            ConnectionState::Reconnecting
        });

        let mut socket = match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((socket, _response)) => {
                attempt = 0;
                let _ = state_tx.send(ConnectionState::Connected);
                socket
            }
            Err(_) => {
                attempt += 1;
                observer.on_reconnect_attempt(attempt);
                if attempt > config.max_reconnect_attempts {
                    fail_all_pending(&pending, ClientError::TransportClosed);
                    let _ = state_tx.send(ConnectionState::Closed);
                    return;
                }
                tokio::time::sleep(reconnect_delay(attempt)).await;
                continue 'connect;
            }
        };

        loop {
            tokio::select! {
                biased;

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Call { request }) => {
                            let frame = match serde_json::to_string(&request) {
                                Ok(frame) => frame,
                                Err(e) => {
                                    if let Some((_, tx)) = pending.remove(&request.id) {
                                        let _ = tx.send(Err(ClientError::Encode(e.to_string())));
                                    }
                                    continue;
                                }
                            };
                            if socket.send(Message::Text(frame.into())).await.is_err() {
                                break;
                            }
                        }
                        Some(Command::Close) => {
                            fail_all_pending(&pending, ClientError::TransportClosed);
                            let _ = state_tx.send(ConnectionState::Closed);
                            let _ = socket.close(None).await;
                            return;
                        }
                        None => {
                            fail_all_pending(&pending, ClientError::TransportClosed);
                            let _ = state_tx.send(ConnectionState::Closed);
                            return;
                        }
                    }
                }

                frame = socket.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            handle_frame(&text, &pending, &subscriptions, &orphan_count, &observer);
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(_)) => break,
                    }
                }
            }
        }

        // Socket loop exited without an explicit close/shutdown command: the
        // connection was lost. Clear stale subscription registrations (server
        // ids are no longer valid once reconnected) and retry.
        subscriptions.clear();
        attempt += 1;
        observer.on_reconnect_attempt(attempt);
        if attempt > config.max_reconnect_attempts {
            fail_all_pending(&pending, ClientError::TransportClosed);
            let _ = state_tx.send(ConnectionState::Closed);
            return;
        }
    }
}

fn reconnect_delay(attempt: u32) -> Duration {
    let secs = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX).min(32);
    Duration::from_secs(secs)
}

fn fail_all_pending(pending: &PendingMap, err: ClientError) {
    let ids: Vec<u64> = pending.iter().map(|e| *e.key()).collect();
    for id in ids {
        if let Some((_, tx)) = pending.remove(&id) {
            let message = err.to_string();
            let _ = tx.send(Err(ClientError::Rpc(RpcError {
                code: 0,
                message,
                data: None,
                request_id: Some(id),
            })));
        }
    }
}

fn handle_frame(
    text: &str,
    pending: &PendingMap,
    subscriptions: &SubscriptionMap,
    orphan_count: &Arc<AtomicU64>,
    observer: &Arc<dyn RpcObserver>,
) {
    if let Ok(notification) = serde_json::from_str::<JsonRpcNotification>(text) {
        if notification.method.ends_with("_subscription") {
            if let Some(callback) = subscriptions.get(&notification.params.subscription) {
                let callback = callback.clone();
                let payload = notification.params.result;
                tokio::spawn(dispatch_notification(callback, payload));
            }
            return;
        }
    }

    if let Ok(response) = serde_json::from_str::<JsonRpcResponse>(text) {
        let Some(id) = response.id else { return };
        match pending.remove(&id) {
            Some((_, tx)) => {
                let _ = tx.send(response_into_result(response));
            }
            None => {
                orphan_count.fetch_add(1, Ordering::Relaxed);
                observer.on_orphan_response(id);
                #[cfg(feature = "telemetry")]
                tracing::error!(id, "orphan response: no pending request for this id");
            }
        }
    }
}

/// Dispatches a notification payload on a spawned task, never on the I/O
/// thread. Callback panics/errors are caught here and never propagate.
async fn dispatch_notification(callback: SubscriptionCallback, payload: Value) {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(payload)));
    if outcome.is_err() {
        #[cfg(feature = "telemetry")]
        tracing::warn!("subscription callback panicked; suppressed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_delay_doubles_and_caps_at_32s() {
        assert_eq!(reconnect_delay(1), Duration::from_secs(1));
        assert_eq!(reconnect_delay(2), Duration::from_secs(2));
        assert_eq!(reconnect_delay(6), Duration::from_secs(32));
        assert_eq!(reconnect_delay(20), Duration::from_secs(32));
    }
}
