//! Observer capability: the "global debug toggles" this kind of client
//! traditionally reaches for become an explicit, optional collaborator
//! instead — callers thread an `Arc<dyn RpcObserver>` into a transport or
//! subscription manager, rather than flipping a process-wide flag.
//!
//! The default implementor forwards to `tracing` under the `telemetry`
//! feature and is otherwise a no-op; component-local atomic counters (the
//! WebSocket transport's orphan count, the subscription manager's
//! callback-error count) remain the source of truth for their own metric,
//! this is the place a caller wires in cross-cutting reporting on top.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hooks a caller can observe without instrumenting call sites themselves.
pub trait RpcObserver: fmt::Debug + Send + Sync {
    /// A response arrived whose id matched no pending request.
    fn on_orphan_response(&self, id: u64);
    /// A subscription callback panicked and was suppressed.
    fn on_subscription_callback_error(&self);
    /// Resubscribing after a reconnect failed for one subscription.
    fn on_resubscribe_failure(&self);
    /// A reconnect attempt is starting, 1-indexed.
    fn on_reconnect_attempt(&self, attempt: u32);
    /// An RPC call is being retried after a retryable failure, 2-indexed
    /// (the value the retry governor itself uses for attempt numbering).
    fn on_retry(&self, method: &str, attempt: u32);
}

/// An [`RpcObserver`] that does nothing; the default when no observer is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl RpcObserver for NullObserver {
    fn on_orphan_response(&self, _id: u64) {}
    fn on_subscription_callback_error(&self) {}
    fn on_resubscribe_failure(&self) {}
    fn on_reconnect_attempt(&self, _attempt: u32) {}
    fn on_retry(&self, _method: &str, _attempt: u32) {}
}

/// An [`RpcObserver`] that accumulates counters and, under the `telemetry`
/// feature, also emits `tracing` events at the same points.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    /// Total orphan responses observed across every transport it's wired into.
    pub orphan_responses: AtomicU64,
    /// Total subscription-callback panics suppressed.
    pub subscription_callback_errors: AtomicU64,
    /// Total failed resubscribe-after-reconnect attempts.
    pub resubscribe_failures: AtomicU64,
    /// Total reconnect attempts started.
    pub reconnect_attempts: AtomicU64,
    /// Total retried RPC calls.
    pub retries: AtomicU64,
}

impl RpcObserver for MetricsObserver {
    fn on_orphan_response(&self, id: u64) {
        self.orphan_responses.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "telemetry")]
        tracing::warn!(id, "orphan response observed");
        #[cfg(not(feature = "telemetry"))]
        let _ = id;
    }

    fn on_subscription_callback_error(&self) {
        self.subscription_callback_errors.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "telemetry")]
        tracing::warn!("subscription callback error observed");
    }

    fn on_resubscribe_failure(&self) {
        self.resubscribe_failures.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "telemetry")]
        tracing::error!("resubscribe after reconnect failed");
    }

    fn on_reconnect_attempt(&self, attempt: u32) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "telemetry")]
        tracing::info!(attempt, "reconnect attempt observed");
        #[cfg(not(feature = "telemetry"))]
        let _ = attempt;
    }

    fn on_retry(&self, method: &str, attempt: u32) {
        self.retries.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "telemetry")]
        tracing::info!(method, attempt, "rpc call retried");
        #[cfg(not(feature = "telemetry"))]
        let _ = (method, attempt);
    }
}

impl MetricsObserver {
    /// Builds a shared, ready-to-wire-in observer.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_observer_counts_each_event() {
        let observer = MetricsObserver::default();
        observer.on_orphan_response(7);
        observer.on_subscription_callback_error();
        observer.on_resubscribe_failure();
        observer.on_reconnect_attempt(1);
        observer.on_retry("eth_call", 2);
        assert_eq!(observer.orphan_responses.load(Ordering::Relaxed), 1);
        assert_eq!(observer.subscription_callback_errors.load(Ordering::Relaxed), 1);
        assert_eq!(observer.resubscribe_failures.load(Ordering::Relaxed), 1);
        assert_eq!(observer.reconnect_attempts.load(Ordering::Relaxed), 1);
        assert_eq!(observer.retries.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn null_observer_is_inert() {
        let observer = NullObserver;
        observer.on_orphan_response(1);
        observer.on_subscription_callback_error();
        observer.on_resubscribe_failure();
        observer.on_reconnect_attempt(1);
        observer.on_retry("eth_call", 2);
    }
}
