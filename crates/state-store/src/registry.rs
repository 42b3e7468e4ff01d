//! # Waiter Registry
//!
//! Per-name collection of active waiters. Each waiter owns a
//! [`DeliverySlot`]: a small bounded queue plus a wake-up, so a producer
//! pushing a value never waits on a consumer.
//!
//! ## Locking
//!
//! - The registry lock covers register, unregister and snapshot only.
//! - Each slot has its own lock covering its queue only.
//! - The two are never held together.
//!
//! ## Conditions
//!
//! A waiter registered with a [`Condition`] has it evaluated on every
//! delivery under the slot lock. The first matching value is latched
//! outside the queue, so displacement can never drop it.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

use crate::session::Condition;
use crate::DEFAULT_WAITER_CAPACITY;

/// Identity of a registered waiter. Two waiters on the same name and
/// target are still distinct.
pub type WaiterId = u64;

type WaiterMap = HashMap<String, BTreeMap<WaiterId, Arc<DeliverySlot>>>;

/// What happened to a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// The value was queued.
    Queued,
    /// The value was queued after dropping the oldest queued value.
    Displaced,
    /// The slot already accepted a newer store; the value was ignored.
    Stale,
    /// The waiter was unregistered.
    Closed,
}

struct SlotQueue {
    values: VecDeque<String>,
    matched: Option<String>,
    last_sequence: u64,
    closed: bool,
}

/// Delivery destination of one waiter.
pub struct DeliverySlot {
    id: WaiterId,
    name: String,
    capacity: usize,
    condition: Option<Condition>,
    queue: Mutex<SlotQueue>,
    notify: Notify,
}

impl DeliverySlot {
    fn new(id: WaiterId, name: &str, capacity: usize, condition: Option<Condition>) -> Self {
        Self {
            id,
            name: name.to_owned(),
            capacity: capacity.max(1),
            condition,
            queue: Mutex::new(SlotQueue {
                values: VecDeque::new(),
                matched: None,
                last_sequence: 0,
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    /// Waiter identity.
    #[must_use]
    pub fn id(&self) -> WaiterId {
        self.id
    }

    /// Name this waiter observes.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Push a stored value without blocking.
    ///
    /// Values must carry the store sequence; anything not newer than the
    /// last accepted sequence is ignored so the waiter sees store order.
    pub fn deliver(&self, sequence: u64, value: &str) -> DeliveryStatus {
        let status = {
            let mut queue = self.queue.lock();
            if queue.closed {
                return DeliveryStatus::Closed;
            }
            if sequence <= queue.last_sequence {
                return DeliveryStatus::Stale;
            }
            queue.last_sequence = sequence;

            if queue.matched.is_none()
                && self.condition.as_ref().is_some_and(|c| c.matches(Some(value)))
            {
                queue.matched = Some(value.to_owned());
            }

            let status = if queue.values.len() >= self.capacity {
                queue.values.pop_front();
                DeliveryStatus::Displaced
            } else {
                DeliveryStatus::Queued
            };
            queue.values.push_back(value.to_owned());
            status
        };

        // notify_one keeps a permit when nobody is parked yet
        self.notify.notify_one();
        status
    }

    /// Next delivered value, suspending until one arrives.
    ///
    /// A latched match is returned ahead of anything still queued.
    /// Returns `None` once the slot is closed.
    pub async fn recv(&self) -> Option<String> {
        loop {
            {
                let mut queue = self.queue.lock();
                if let Some(value) = queue.next() {
                    return Some(value);
                }
                if queue.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Next delivered value if one is queued.
    pub fn try_recv(&self) -> Option<String> {
        self.queue.lock().next()
    }

    /// Whether a delivered value satisfied the waiter's condition.
    #[must_use]
    pub fn has_matched(&self) -> bool {
        self.queue.lock().matched.is_some()
    }

    /// Number of values waiting to be received.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.lock().values.len()
    }

    /// Whether the slot was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.queue.lock().closed
    }

    /// Close the slot, discarding queued values and releasing a parked
    /// receiver. Returns `false` if it was already closed.
    fn close(&self) -> bool {
        {
            let mut queue = self.queue.lock();
            if queue.closed {
                return false;
            }
            queue.closed = true;
            queue.values.clear();
            queue.matched = None;
        }
        self.notify.notify_one();
        true
    }
}

impl SlotQueue {
    fn next(&mut self) -> Option<String> {
        self.matched.take().or_else(|| self.values.pop_front())
    }
}

fn remove_waiter(waiters: &Mutex<WaiterMap>, slot: &DeliverySlot) -> bool {
    let removed = {
        let mut waiters = waiters.lock();
        match waiters.get_mut(slot.name()) {
            Some(list) => {
                let removed = list.remove(&slot.id()).is_some();
                if list.is_empty() {
                    waiters.remove(slot.name());
                }
                removed
            }
            None => false,
        }
    };

    slot.close();
    if removed {
        debug!(name = %slot.name(), waiter = slot.id(), "Waiter unregistered");
    }
    removed
}

/// Handle owned by the wait call that registered the waiter.
///
/// Dropping the handle unregisters the waiter.
pub struct WaiterHandle {
    slot: Arc<DeliverySlot>,
    waiters: Arc<Mutex<WaiterMap>>,
}

impl WaiterHandle {
    /// Waiter identity.
    #[must_use]
    pub fn id(&self) -> WaiterId {
        self.slot.id()
    }

    /// Name this waiter observes.
    #[must_use]
    pub fn name(&self) -> &str {
        self.slot.name()
    }

    /// Next delivered value. `None` once unregistered.
    pub async fn recv(&self) -> Option<String> {
        self.slot.recv().await
    }

    /// Next delivered value if one is queued.
    pub fn try_recv(&self) -> Option<String> {
        self.slot.try_recv()
    }

    /// Whether the waiter was unregistered.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.slot.is_closed()
    }
}

impl Drop for WaiterHandle {
    fn drop(&mut self) {
        remove_waiter(&self.waiters, &self.slot);
    }
}

/// Registry of active waiters, keyed by name.
///
/// Register/unregister/snapshot are the only access paths to the
/// underlying map. Names without waiters have no entry.
pub struct WaiterRegistry {
    waiters: Arc<Mutex<WaiterMap>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl WaiterRegistry {
    /// Create a registry with the default per-waiter capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_WAITER_CAPACITY)
    }

    /// Create a registry whose waiters buffer up to `capacity` values
    /// (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            waiters: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
        }
    }

    /// Register a new waiter for `name`.
    #[must_use]
    pub fn register(&self, name: &str) -> WaiterHandle {
        self.insert(name, None)
    }

    /// Register a waiter for `name` that latches the first delivered value
    /// satisfying `condition`.
    #[must_use]
    pub fn register_until(&self, name: &str, condition: Condition) -> WaiterHandle {
        self.insert(name, Some(condition))
    }

    fn insert(&self, name: &str, condition: Option<Condition>) -> WaiterHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(DeliverySlot::new(id, name, self.capacity, condition));

        self.waiters
            .lock()
            .entry(name.to_owned())
            .or_default()
            .insert(id, Arc::clone(&slot));

        debug!(name = %name, waiter = id, "Waiter registered");

        WaiterHandle {
            slot,
            waiters: Arc::clone(&self.waiters),
        }
    }

    /// Unregister a waiter and close its slot.
    ///
    /// Idempotent: returns `false` when the waiter was already removed.
    pub fn unregister(&self, handle: &WaiterHandle) -> bool {
        remove_waiter(&self.waiters, &handle.slot)
    }

    /// Slots currently registered for `name`, in registration order.
    #[must_use]
    pub fn snapshot(&self, name: &str) -> Vec<Arc<DeliverySlot>> {
        self.waiters
            .lock()
            .get(name)
            .map(|list| list.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of waiters registered for `name`.
    #[must_use]
    pub fn waiter_count(&self, name: &str) -> usize {
        self.waiters.lock().get(name).map_or(0, BTreeMap::len)
    }

    /// Total number of registered waiters.
    #[must_use]
    pub fn total_waiters(&self) -> usize {
        self.waiters.lock().values().map(BTreeMap::len).sum()
    }

    /// Names with at least one waiter.
    #[must_use]
    pub fn watched_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.waiters.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Per-waiter queue capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for WaiterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
