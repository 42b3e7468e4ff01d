//! # Delayed Publishing
//!
//! Publishes a message after a delay unless it is cancelled first.
//! Each pending publish is keyed by a caller-chosen id.

use crate::message::Message;
use crate::transport::Transport;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct Pending {
    generation: u64,
    task: JoinHandle<()>,
}

type PendingMap = Arc<Mutex<HashMap<String, Pending>>>;

pub struct DelayedPublisher {
    transport: Arc<dyn Transport>,
    pending: PendingMap,
    generation: AtomicU64,
}

impl DelayedPublisher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            pending: PendingMap::default(),
            generation: AtomicU64::new(0),
        }
    }

    /// Publish `message` after `after`, under `id`.
    ///
    /// Returns `false` without scheduling anything if a publish is already
    /// pending under the same id.
    pub fn delay(&self, id: &str, message: Message, after: Duration) -> bool {
        // Held across spawn so the task cannot remove its entry before it exists.
        let mut map = self.pending.lock();
        if map.contains_key(id) {
            debug!(id = %id, "Delayed message already pending");
            return false;
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let transport = self.transport.clone();
        let pending = self.pending.clone();
        let key = id.to_string();
        debug!(id = %id, topic = %message.topic, delay = ?after, "Delaying message");

        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let topic = message.topic.clone();
            if let Err(e) = transport.publish(message).await {
                warn!(id = %key, topic = %topic, error = %e, "Delayed publish failed");
            } else {
                debug!(id = %key, topic = %topic, "Delayed message published");
            }

            // A cancel followed by a new delay may reuse the id.
            let mut map = pending.lock();
            if map.get(&key).is_some_and(|p| p.generation == generation) {
                map.remove(&key);
            }
        });

        map.insert(id.to_string(), Pending { generation, task });
        true
    }

    /// Cancel the publish pending under `id`.
    ///
    /// Returns `false` if nothing was pending (never scheduled or already sent).
    pub fn cancel(&self, id: &str) -> bool {
        match self.pending.lock().remove(id) {
            Some(pending) => {
                pending.task.abort();
                debug!(id = %id, "Cancelled delayed message");
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.lock().contains_key(id)
    }

    /// Ids with a publish still pending.
    #[must_use]
    pub fn pending(&self) -> Vec<String> {
        self.pending.lock().keys().cloned().collect()
    }
}

impl Drop for DelayedPublisher {
    fn drop(&mut self) {
        for (_, pending) in self.pending.lock().drain() {
            pending.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemoryTransport;

    async fn setup() -> (Arc<InMemoryTransport>, DelayedPublisher) {
        let transport = Arc::new(InMemoryTransport::new());
        transport.connect().await.unwrap();
        let publisher = DelayedPublisher::new(transport.clone());
        (transport, publisher)
    }

    #[tokio::test]
    async fn test_publishes_after_delay() {
        let (transport, publisher) = setup().await;
        let mut sub = transport.subscribe("home/#").await.unwrap();

        publisher.delay("off", Message::new("home/set/light", "off"), Duration::from_millis(30));
        assert!(publisher.is_pending("off"));
        assert_eq!(sub.try_recv(), Ok(None));

        let message = tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.payload_str(), "off");

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(publisher.pending().is_empty());
        assert!(!publisher.cancel("off"));
    }

    #[tokio::test]
    async fn test_cancel() {
        let (transport, publisher) = setup().await;
        let mut sub = transport.subscribe("home/#").await.unwrap();

        publisher.delay("off", Message::new("home/set/light", "off"), Duration::from_millis(50));
        assert!(publisher.cancel("off"));
        assert!(!publisher.cancel("off"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sub.try_recv(), Ok(None));
    }

    #[tokio::test]
    async fn test_cancel_only_named_id() {
        let (transport, publisher) = setup().await;
        let mut sub = transport.subscribe("home/#").await.unwrap();

        publisher.delay("a", Message::new("home/set/a", "1"), Duration::from_millis(20));
        publisher.delay("b", Message::new("home/set/b", "1"), Duration::from_millis(20));
        let mut ids = publisher.pending();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);

        assert!(publisher.cancel("a"));
        let message = tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.topic, "home/set/b");
    }

    #[tokio::test]
    async fn test_pending_id_not_rescheduled() {
        let (transport, publisher) = setup().await;
        let mut sub = transport.subscribe("home/#").await.unwrap();

        assert!(publisher.delay("dim", Message::new("home/set/light", "50"), Duration::from_millis(20)));
        assert!(!publisher.delay("dim", Message::new("home/set/light", "10"), Duration::from_millis(20)));
        assert_eq!(publisher.pending(), vec!["dim"]);

        let message = tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.payload_str(), "50");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sub.try_recv(), Ok(None));
    }

    #[tokio::test]
    async fn test_reschedule_after_cancel() {
        let (transport, publisher) = setup().await;
        let mut sub = transport.subscribe("home/#").await.unwrap();

        publisher.delay("dim", Message::new("home/set/light", "50"), Duration::from_millis(20));
        assert!(publisher.cancel("dim"));
        assert!(publisher.delay("dim", Message::new("home/set/light", "10"), Duration::from_millis(20)));

        let message = tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.payload_str(), "10");
    }
}
