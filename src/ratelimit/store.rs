//! Counter storage abstraction and the in-process implementation.

use async_trait::async_trait;
use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::counter::Counter;
use crate::error::{StoreError, StoreResult};

/// Keyed call counters with windowed expiry.
///
/// Implementations must make `increment` linearizable per key, and a
/// `get_or_create` followed by `increment` must never lose a call when several
/// requests observe a window rollover at once.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Return the live counter for `key`, starting a fresh window if there is
    /// none or the current one has elapsed.
    async fn get_or_create(&self, key: &str, period_seconds: u64) -> StoreResult<Counter>;

    /// Record one call against `key` and return the new call count.
    async fn increment(&self, key: &str) -> StoreResult<u64>;

    /// Count one call against the live window for `key`, creating or rolling
    /// it over first. Returns the counter as it stands after the call.
    ///
    /// Stores that can do both steps under one lock should override this.
    async fn hit(&self, key: &str, period_seconds: u64) -> StoreResult<Counter> {
        let mut counter = self.get_or_create(key, period_seconds).await?;
        counter.calls = self.increment(key).await?;
        Ok(counter)
    }

    /// Look up a counter without touching it.
    async fn read(&self, key: &str) -> StoreResult<Option<Counter>>;

    /// Drop the counter for `key`. Returns whether one existed.
    async fn reset(&self, key: &str) -> StoreResult<bool>;
}

/// Counter store held in process memory.
///
/// Each key lives in its own `DashMap` shard entry, so operations on one key
/// are serialized while different keys proceed in parallel.
pub struct InMemoryCounterStore {
    counters: DashMap<String, Counter>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCounterStore {
    /// Create a store driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    /// Create a store driven by the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: DashMap::new(),
            clock,
        }
    }

    /// Install a counter as-is, replacing any existing state for its key.
    pub fn seed(&self, counter: Counter) {
        self.counters.insert(counter.key.clone(), counter);
    }

    /// Number of counters currently held.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Drop every counter.
    pub fn clear(&self) {
        self.counters.clear();
    }

    /// Lock the entry for `key`, holding a counter whose window is current.
    fn live_entry(&self, key: &str, period_seconds: u64) -> RefMut<'_, String, Counter> {
        let now = self.clock.now();

        let mut entry = self.counters.entry(key.to_string()).or_insert_with(|| {
            debug!(key = %key, period = period_seconds, "Creating new rate limit counter");
            Counter::fresh(key, period_seconds, now)
        });

        if entry.has_elapsed(now) {
            debug!(
                key = %key,
                previous_calls = entry.calls,
                period = period_seconds,
                "Rate limit window elapsed, starting a new one"
            );
            *entry = Counter::fresh(key, period_seconds, now);
        }

        entry
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn get_or_create(&self, key: &str, period_seconds: u64) -> StoreResult<Counter> {
        let entry = self.live_entry(key, period_seconds);
        Ok(entry.value().clone())
    }

    async fn increment(&self, key: &str) -> StoreResult<u64> {
        let mut counter = self
            .counters
            .get_mut(key)
            .ok_or_else(|| StoreError::MissingCounter(key.to_string()))?;

        counter.calls += 1;
        Ok(counter.calls)
    }

    async fn read(&self, key: &str) -> StoreResult<Option<Counter>> {
        Ok(self.counters.get(key).map(|counter| counter.clone()))
    }

    async fn reset(&self, key: &str) -> StoreResult<bool> {
        Ok(self.counters.remove(key).is_some())
    }

    async fn hit(&self, key: &str, period_seconds: u64) -> StoreResult<Counter> {
        let mut entry = self.live_entry(key, period_seconds);
        entry.calls += 1;
        Ok(entry.value().clone())
    }
}
