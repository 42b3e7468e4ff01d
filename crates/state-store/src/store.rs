//! # State Store
//!
//! Facade tying the map, registry, broadcaster and wait sessions together.
//! This is the surface the transport glue consumes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::broadcaster::Broadcaster;
use crate::registry::WaiterRegistry;
use crate::session::{Condition, WaitOutcome, WaitSession};
use crate::state_map::{StateMap, StoreOutcome};
use crate::DEFAULT_WAITER_CAPACITY;

/// Counters describing store activity since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub stores: u64,
    pub changes: u64,
    pub deliveries: u64,
    pub displaced: u64,
    pub waits_matched: u64,
    pub waits_timed_out: u64,
}

#[derive(Default)]
struct Counters {
    stores: AtomicU64,
    changes: AtomicU64,
    deliveries: AtomicU64,
    displaced: AtomicU64,
    waits_matched: AtomicU64,
    waits_timed_out: AtomicU64,
}

/// Concurrent named-state store.
///
/// Shared between tasks behind an `Arc`; every method takes `&self`.
pub struct StateStore {
    states: StateMap,
    registry: Arc<WaiterRegistry>,
    broadcaster: Broadcaster,
    counters: Counters,
}

impl StateStore {
    /// Create an empty store with the default per-waiter capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_waiter_capacity(DEFAULT_WAITER_CAPACITY)
    }

    /// Create an empty store whose waiters buffer up to `capacity` values.
    #[must_use]
    pub fn with_waiter_capacity(capacity: usize) -> Self {
        let registry = Arc::new(WaiterRegistry::with_capacity(capacity));
        Self {
            states: StateMap::new(),
            broadcaster: Broadcaster::new(Arc::clone(&registry)),
            registry,
            counters: Counters::default(),
        }
    }

    /// Record `value` for `name` and deliver it to the name's waiters.
    ///
    /// The map lock is released before delivery starts.
    pub fn store(&self, name: &str, value: &str) -> StoreOutcome {
        let outcome = self.states.store(name, value);
        let report = self.broadcaster.deliver(name, outcome.sequence, value);

        self.counters.stores.fetch_add(1, Ordering::Relaxed);
        if outcome.changed {
            self.counters.changes.fetch_add(1, Ordering::Relaxed);
        }
        self.counters
            .deliveries
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.counters
            .displaced
            .fetch_add(report.displaced as u64, Ordering::Relaxed);

        outcome
    }

    /// Current value of `name`. Never blocks on waiters.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.states.get(name)
    }

    /// Wait until `name` equals `target`, for at most `timeout`.
    pub async fn wait_for(&self, name: &str, target: &str, timeout: Duration) -> bool {
        self.wait_until(name, Condition::Equals(target.to_owned()), timeout)
            .await
            .is_matched()
    }

    /// Wait until `name` differs from `value`, for at most `timeout`.
    pub async fn wait_for_not(&self, name: &str, value: &str, timeout: Duration) -> bool {
        self.wait_until(name, Condition::NotEquals(value.to_owned()), timeout)
            .await
            .is_matched()
    }

    /// Wait until `condition` holds for `name`, for at most `timeout`.
    pub async fn wait_until(
        &self,
        name: &str,
        condition: Condition,
        timeout: Duration,
    ) -> WaitOutcome {
        let outcome = WaitSession::new(&self.states, &self.registry, name, condition, timeout)
            .run()
            .await;

        match outcome {
            WaitOutcome::Matched => {
                self.counters.waits_matched.fetch_add(1, Ordering::Relaxed);
            }
            WaitOutcome::TimedOut | WaitOutcome::Closed => {
                self.counters.waits_timed_out.fetch_add(1, Ordering::Relaxed);
            }
        }
        outcome
    }

    /// Copy of every recorded value.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.states.snapshot()
    }

    /// Number of names with a recorded value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether nothing was stored yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of waiters currently registered for `name`.
    #[must_use]
    pub fn waiter_count(&self, name: &str) -> usize {
        self.registry.waiter_count(name)
    }

    /// Number of waiters across all names.
    #[must_use]
    pub fn total_waiters(&self) -> usize {
        self.registry.total_waiters()
    }

    /// Names with at least one active waiter.
    #[must_use]
    pub fn watched_names(&self) -> Vec<String> {
        self.registry.watched_names()
    }

    /// Activity counters.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            stores: self.counters.stores.load(Ordering::Relaxed),
            changes: self.counters.changes.load(Ordering::Relaxed),
            deliveries: self.counters.deliveries.load(Ordering::Relaxed),
            displaced: self.counters.displaced.load(Ordering::Relaxed),
            waits_matched: self.counters.waits_matched.load(Ordering::Relaxed),
            waits_timed_out: self.counters.waits_timed_out.load(Ordering::Relaxed),
        }
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
