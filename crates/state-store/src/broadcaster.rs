//! # Broadcaster
//!
//! Hands a freshly stored value to every waiter registered for its name.
//! The registry snapshot is taken under the registry lock; the pushes
//! happen after it is released and never block.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::registry::{DeliveryStatus, WaiterRegistry};

/// Per-call summary of a broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Slots present in the snapshot.
    pub attempted: usize,
    /// Slots that queued the value.
    pub delivered: usize,
    /// Slots that had to drop their oldest value to queue this one.
    pub displaced: usize,
    /// Slots that had already seen a newer store, or were closed meanwhile.
    pub skipped: usize,
}

/// Delivers stored values to registered waiters.
pub struct Broadcaster {
    registry: Arc<WaiterRegistry>,
}

impl Broadcaster {
    /// Create a broadcaster over `registry`.
    #[must_use]
    pub fn new(registry: Arc<WaiterRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver `value` (stored with `sequence`) to every waiter on `name`.
    pub fn deliver(&self, name: &str, sequence: u64, value: &str) -> DeliveryReport {
        let slots = self.registry.snapshot(name);
        let mut report = DeliveryReport {
            attempted: slots.len(),
            ..DeliveryReport::default()
        };

        for slot in &slots {
            match slot.deliver(sequence, value) {
                DeliveryStatus::Queued => report.delivered += 1,
                DeliveryStatus::Displaced => {
                    report.delivered += 1;
                    report.displaced += 1;
                    warn!(
                        name = %name,
                        waiter = slot.id(),
                        "Waiter queue full, oldest value dropped"
                    );
                }
                DeliveryStatus::Stale | DeliveryStatus::Closed => report.skipped += 1,
            }
        }

        if report.attempted > 0 {
            debug!(
                name = %name,
                sequence,
                waiters = report.attempted,
                delivered = report.delivered,
                "State delivered"
            );
        }
        report
    }

    /// The registry this broadcaster reads.
    #[must_use]
    pub fn registry(&self) -> &Arc<WaiterRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deliver_without_waiters() {
        let broadcaster = Broadcaster::new(Arc::new(WaiterRegistry::new()));
        let report = broadcaster.deliver("conn", 1, "0");

        assert_eq!(report, DeliveryReport::default());
    }

    #[test]
    fn test_deliver_reaches_every_waiter_on_name() {
        let registry = Arc::new(WaiterRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let a = registry.register("conn");
        let b = registry.register("conn");
        let other = registry.register("light");

        let report = broadcaster.deliver("conn", 1, "2");
        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered, 2);

        assert_eq!(a.try_recv().as_deref(), Some("2"));
        assert_eq!(b.try_recv().as_deref(), Some("2"));
        assert_eq!(other.try_recv(), None);
    }

    #[test]
    fn test_stalled_waiter_does_not_block_others() {
        let registry = Arc::new(WaiterRegistry::with_capacity(1));
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        // Never drained
        let stalled = registry.register("conn");
        let active = registry.register("conn");

        for (seq, value) in ["0", "1", "2"].iter().enumerate() {
            broadcaster.deliver("conn", seq as u64 + 1, value);
            assert_eq!(active.try_recv().as_deref(), Some(*value));
        }

        let report = broadcaster.deliver("conn", 4, "3");
        assert_eq!(report.displaced, 1);
        assert_eq!(stalled.try_recv().as_deref(), Some("3"));
    }

    #[test]
    fn test_stale_delivery_skipped() {
        let registry = Arc::new(WaiterRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        let handle = registry.register("conn");

        broadcaster.deliver("conn", 7, "new");
        let report = broadcaster.deliver("conn", 6, "old");

        assert_eq!(report.skipped, 1);
        assert_eq!(handle.try_recv().as_deref(), Some("new"));
        assert_eq!(handle.try_recv(), None);
    }
}
