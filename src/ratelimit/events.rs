//! Notifications emitted after each metered rate limit resolution.

use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use super::limiter::Decision;
use super::policy::Policy;

/// A resolved rate limit check.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitEvent {
    /// Counter key the policy was tracked under
    pub key: String,
    pub policy: Policy,
    pub decision: Decision,
}

/// Receives every metered resolution, allowed or denied.
pub trait RateLimitObserver: Send + Sync {
    fn on_resolved(&self, event: &RateLimitEvent);
}

impl<F> RateLimitObserver for F
where
    F: Fn(&RateLimitEvent) + Send + Sync,
{
    fn on_resolved(&self, event: &RateLimitEvent) {
        self(event)
    }
}

/// The set of observers notified by a limiter.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RwLock<Vec<Arc<dyn RateLimitObserver>>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn RateLimitObserver>) {
        self.observers.write().push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Deliver `event` to every observer. A panicking observer is logged and
    /// skipped; the others still run.
    pub fn emit(&self, event: &RateLimitEvent) {
        let observers = self.observers.read().clone();
        trace!(key = %event.key, observers = observers.len(), "Emitting rate limit event");

        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| observer.on_resolved(event))).is_err() {
                warn!(key = %event.key, "Rate limit observer panicked; event dropped for it");
            }
        }
    }
}

/// Forwards events into a bounded channel.
///
/// Events are dropped when the channel is full or closed.
pub struct ChannelObserver {
    sender: mpsc::Sender<RateLimitEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<RateLimitEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

impl RateLimitObserver for ChannelObserver {
    fn on_resolved(&self, event: &RateLimitEvent) {
        if let Err(err) = self.sender.try_send(event.clone()) {
            warn!(key = %event.key, error = %err, "Dropping rate limit event");
        }
    }
}
