//! # Topic Subscriber
//!
//! The receiving side of a transport subscription.

use crate::message::Message;
use crate::topics::topic_matches;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The transport hub was dropped.
    #[error("Transport closed")]
    Closed,
}

pub(crate) type SubscriptionCounts = Arc<RwLock<HashMap<String, usize>>>;

/// Handle receiving messages whose topic matches a filter.
///
/// Retained messages present at subscription time are delivered first.
/// When dropped, the subscription is removed from the hub's accounting.
pub struct TopicSubscription {
    receiver: broadcast::Receiver<Message>,
    filter: String,
    backlog: VecDeque<Message>,
    subscriptions: SubscriptionCounts,
}

impl TopicSubscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<Message>,
        filter: String,
        backlog: Vec<Message>,
        subscriptions: SubscriptionCounts,
    ) -> Self {
        *subscriptions.write().entry(filter.clone()).or_insert(0) += 1;
        Self {
            receiver,
            filter,
            backlog: backlog.into(),
            subscriptions,
        }
    }

    /// Receive the next matching message.
    ///
    /// Returns `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        if let Some(message) = self.backlog.pop_front() {
            return Some(message);
        }

        loop {
            let message = match self.receiver.recv().await {
                Ok(m) => m,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(
                        filter = %self.filter,
                        lagged = count,
                        "Subscriber lagged, some messages dropped"
                    );
                    continue;
                }
            };

            if topic_matches(&self.filter, &message.topic) {
                return Some(message);
            }
        }
    }

    /// Receive the next matching message without blocking.
    ///
    /// - `Ok(Some(message))` - a matching message was available
    /// - `Ok(None)` - nothing available right now
    /// - `Err(SubscriptionError::Closed)` - the hub is gone
    pub fn try_recv(&mut self) -> Result<Option<Message>, SubscriptionError> {
        if let Some(message) = self.backlog.pop_front() {
            return Ok(Some(message));
        }

        loop {
            let message = match self.receiver.try_recv() {
                Ok(m) => m,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if topic_matches(&self.filter, &message.topic) {
                return Ok(Some(message));
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }
}

impl Drop for TopicSubscription {
    fn drop(&mut self) {
        let mut subs = self.subscriptions.write();
        if let Some(count) = subs.get_mut(&self.filter) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                subs.remove(&self.filter);
            }
        }
        debug!(filter = %self.filter, "Subscription dropped");
    }
}
