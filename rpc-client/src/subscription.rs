//! Subscription manager (C6): kind/params bookkeeping on top of the
//! WebSocket transport's raw `serverId -> callback` dispatch, plus
//! reconnect-driven resubscription.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde_json::Value;

use rpc_types::error::ClientError;

use crate::observer::{NullObserver, RpcObserver};
use crate::transport::{ConnectionState, SubscriptionCallback, Transport, WsTransport};

/// A live subscription's kind, parameters, and current server-assigned id,
/// kept so it can be re-issued after a reconnect.
#[derive(Clone)]
struct SubscriptionEntry {
    server_id: String,
    kind: String,
    params: Value,
    callback: SubscriptionCallback,
}

/// Observable counters for subscription-callback failures, surfaced to
/// whatever `RpcObserver` the caller wires up.
#[derive(Debug, Default)]
pub struct SubscriptionMetrics {
    pub callback_errors: std::sync::atomic::AtomicU64,
    pub resubscribe_failures: std::sync::atomic::AtomicU64,
}

/// Tracks `kind`/`params`/`callback` per local subscription and resubscribes
/// automatically when the underlying [`WsTransport`] reconnects.
///
/// Local subscription ids are minted by this manager and stable across
/// reconnects; the server-assigned id backing an entry is swapped out
/// transparently on resubscription, so a caller's id from [`Self::subscribe`]
/// keeps working with [`Self::unsubscribe`] even after the connection drops
/// and comes back. Ordering of notifications delivered across a reconnect
/// boundary is not guaranteed. If resubscription itself fails, the entry is
/// dropped and its id becomes invalid.
pub struct SubscriptionManager {
    transport: Arc<WsTransport>,
    entries: Arc<DashMap<String, SubscriptionEntry>>,
    next_local_id: Arc<AtomicU64>,
    metrics: Arc<SubscriptionMetrics>,
    observer: Arc<dyn RpcObserver>,
}

impl SubscriptionManager {
    /// Builds a manager over `transport`, spawning a task that watches its
    /// connection state and resubscribes everything on reconnect.
    #[must_use]
    pub fn new(transport: Arc<WsTransport>) -> Self {
        Self::with_observer(transport, Arc::new(NullObserver))
    }

    /// Builds a manager over `transport`, additionally reporting
    /// callback-error and resubscribe-failure events to `observer`.
    #[must_use]
    pub fn with_observer(transport: Arc<WsTransport>, observer: Arc<dyn RpcObserver>) -> Self {
        let entries: Arc<DashMap<String, SubscriptionEntry>> = Arc::new(DashMap::new());
        let metrics = Arc::new(SubscriptionMetrics::default());

        let watch_entries = entries.clone();
        let watch_transport = transport.clone();
        let watch_metrics = metrics.clone();
        let watch_observer = observer.clone();
        let mut state_rx = transport.watch_state();
        tokio::spawn(async move {
            let mut previous = *state_rx.borrow();
            while state_rx.changed().await.is_ok() {
                let current = *state_rx.borrow();
                if previous != ConnectionState::Connected && current == ConnectionState::Connected {
                    resubscribe_all(&watch_transport, &watch_entries, &watch_metrics, &watch_observer).await;
                }
                previous = current;
            }
        });

        Self { transport, entries, next_local_id: Arc::new(AtomicU64::new(0)), metrics, observer }
    }

    /// The shared counters this manager updates.
    #[must_use]
    pub fn metrics(&self) -> Arc<SubscriptionMetrics> {
        self.metrics.clone()
    }

    /// Subscribes to `kind` (`"newHeads"`, `"logs"`, `"newPendingTransactions"`)
    /// with the given `params`, dispatching decoded notification payloads to
    /// `callback`. Returns a locally-generated subscription id stable across
    /// reconnects.
    pub async fn subscribe(
        &self,
        kind: &str,
        params: Value,
        callback: impl Fn(Value) + Send + Sync + 'static,
    ) -> Result<String, ClientError> {
        let callback = wrap_callback(callback, self.metrics.clone(), self.observer.clone());
        let server_id = self.transport.subscribe(kind, params.clone(), callback.clone()).await?;
        let local_id = format!("local-{}", self.next_local_id.fetch_add(1, Ordering::Relaxed));
        self.entries.insert(
            local_id.clone(),
            SubscriptionEntry { server_id, kind: kind.to_owned(), params, callback },
        );
        Ok(local_id)
    }

    /// Unsubscribes, issuing `eth_unsubscribe` against the subscription's
    /// current server-assigned id and removing the local entry regardless of
    /// whether the node acknowledges.
    pub async fn unsubscribe(&self, id: &str) -> Result<bool, ClientError> {
        let Some((_, entry)) = self.entries.remove(id) else {
            return Ok(false);
        };
        self.transport.unsubscribe(&entry.server_id).await
    }

    /// Number of subscriptions currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no subscriptions are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Wraps a caller-supplied callback so a panic inside it is caught, counted
/// in `metrics`, and never propagated — the dispatch task in the transport
/// layer catches panics too, but only this layer can attribute them to a
/// subscription for metrics purposes.
fn wrap_callback(
    callback: impl Fn(Value) + Send + Sync + 'static,
    metrics: Arc<SubscriptionMetrics>,
    observer: Arc<dyn RpcObserver>,
) -> SubscriptionCallback {
    Arc::new(move |payload: Value| {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(payload)));
        if outcome.is_err() {
            metrics.callback_errors.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            observer.on_subscription_callback_error();
            #[cfg(feature = "telemetry")]
            tracing::warn!("subscription callback panicked; suppressed");
        }
    })
}

async fn resubscribe_all(
    transport: &Arc<WsTransport>,
    entries: &Arc<DashMap<String, SubscriptionEntry>>,
    metrics: &Arc<SubscriptionMetrics>,
    observer: &Arc<dyn RpcObserver>,
) {
    let stale: Vec<(String, SubscriptionEntry)> =
        entries.iter().map(|entry| (entry.key().clone(), entry.value().clone())).collect();

    for (local_id, entry) in stale {
        match transport.subscribe(&entry.kind, entry.params.clone(), entry.callback.clone()).await {
            Ok(new_server_id) => {
                if let Some(mut slot) = entries.get_mut(&local_id) {
                    slot.server_id = new_server_id;
                }
            }
            Err(err) => {
                entries.remove(&local_id);
                metrics.resubscribe_failures.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                observer.on_resubscribe_failure();
                #[cfg(feature = "telemetry")]
                tracing::error!(subscription = %local_id, error = %err, "failed to resubscribe after reconnect");
                #[cfg(not(feature = "telemetry"))]
                let _ = (&local_id, &err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_start_at_zero() {
        let metrics = SubscriptionMetrics::default();
        assert_eq!(metrics.callback_errors.load(std::sync::atomic::Ordering::Relaxed), 0);
        assert_eq!(metrics.resubscribe_failures.load(std::sync::atomic::Ordering::Relaxed), 0);
    }
}
