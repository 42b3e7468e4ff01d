//! # Transport
//!
//! The publish/subscribe client a broker drives, and an in-process
//! implementation of it.
//!
//! [`InMemoryHub`] plays the broker server: it fans messages out over a
//! `tokio::sync::broadcast` channel and keeps retained messages.
//! Every [`InMemoryTransport`] is one client attached to a hub.

use crate::message::Message;
use crate::subscriber::{SubscriptionCounts, TopicSubscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors raised by a transport client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Transport is not connected")]
    NotConnected,

    #[error("Authentication rejected for user {0:?}")]
    Unauthorized(Option<String>),

    #[error("Transport closed")]
    Closed,
}

/// Credentials presented on connect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// A publish/subscribe client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the server. Connecting twice is a no-op.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Disconnect cleanly. The will message is not published.
    async fn disconnect(&self);

    fn is_connected(&self) -> bool;

    /// Watch the connection flag, including losses the client did not ask for.
    fn connection_status(&self) -> watch::Receiver<bool>;

    /// Message the server publishes if the connection is lost.
    fn set_will(&self, will: Message);

    /// Publish a message, returning how many subscribers it reached.
    async fn publish(&self, message: Message) -> Result<usize, TransportError>;

    /// Subscribe to topics matching `filter` (`+` and `#` wildcards).
    async fn subscribe(&self, filter: &str) -> Result<TopicSubscription, TransportError>;
}

/// In-process message server shared by [`InMemoryTransport`] clients.
pub struct InMemoryHub {
    sender: broadcast::Sender<Message>,
    retained: RwLock<HashMap<String, Message>>,
    subscriptions: SubscriptionCounts,
    credentials: Option<Credentials>,
    messages_published: AtomicU64,
    capacity: usize,
}

impl InMemoryHub {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            retained: RwLock::new(HashMap::new()),
            subscriptions: SubscriptionCounts::default(),
            credentials: None,
            messages_published: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Require clients to present these credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    fn route(&self, message: Message) -> usize {
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        if message.retained {
            let mut retained = self.retained.write();
            if message.payload.is_empty() {
                retained.remove(&message.topic);
            } else {
                retained.insert(message.topic.clone(), message.clone());
            }
        }

        let topic = message.topic.clone();
        match self.sender.send(message) {
            Ok(receivers) => {
                debug!(topic = %topic, receivers, "Message routed");
                receivers
            }
            Err(_) => {
                debug!(topic = %topic, "Message routed (no receivers)");
                0
            }
        }
    }

    fn retained_matching(&self, filter: &str) -> Vec<Message> {
        let mut matching: Vec<Message> = self
            .retained
            .read()
            .values()
            .filter(|m| crate::topic_matches(filter, &m.topic))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.topic.cmp(&b.topic));
        matching
    }

    /// Retained message currently held for `topic`.
    #[must_use]
    pub fn retained(&self, topic: &str) -> Option<Message> {
        self.retained.read().get(topic).cloned()
    }

    /// Live subscriptions using exactly this filter.
    #[must_use]
    pub fn subscription_count(&self, filter: &str) -> usize {
        self.subscriptions.read().get(filter).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

/// A client attached to an [`InMemoryHub`].
pub struct InMemoryTransport {
    client_id: Uuid,
    hub: Arc<InMemoryHub>,
    credentials: Credentials,
    will: Mutex<Option<Message>>,
    status: watch::Sender<bool>,
}

impl InMemoryTransport {
    /// Client on a private hub.
    #[must_use]
    pub fn new() -> Self {
        Self::with_hub(Arc::new(InMemoryHub::new()))
    }

    #[must_use]
    pub fn with_hub(hub: Arc<InMemoryHub>) -> Self {
        let (status, _) = watch::channel(false);
        Self {
            client_id: Uuid::new_v4(),
            hub,
            credentials: Credentials::default(),
            will: Mutex::new(None),
            status,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    #[must_use]
    pub fn hub(&self) -> &Arc<InMemoryHub> {
        &self.hub
    }

    /// Drop the connection as if the network failed.
    ///
    /// The hub publishes the will message, if one is set.
    pub fn simulate_connection_loss(&self) {
        if !self.is_connected() {
            return;
        }
        self.status.send_replace(false);
        warn!(client = %self.client_id, "Connection lost");

        if let Some(will) = self.will.lock().clone() {
            self.hub.route(will);
        }
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        if self.is_connected() {
            return Ok(());
        }
        if let Some(required) = &self.hub.credentials {
            if *required != self.credentials {
                warn!(client = %self.client_id, "Connection refused: bad credentials");
                return Err(TransportError::Unauthorized(self.credentials.username.clone()));
            }
        }

        self.status.send_replace(true);
        info!(client = %self.client_id, "Transport connected");
        Ok(())
    }

    async fn disconnect(&self) {
        if self.status.send_replace(false) {
            info!(client = %self.client_id, "Transport disconnected");
        }
    }

    fn is_connected(&self) -> bool {
        *self.status.borrow()
    }

    fn connection_status(&self) -> watch::Receiver<bool> {
        self.status.subscribe()
    }

    fn set_will(&self, will: Message) {
        *self.will.lock() = Some(will);
    }

    async fn publish(&self, message: Message) -> Result<usize, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        Ok(self.hub.route(message))
    }

    async fn subscribe(&self, filter: &str) -> Result<TopicSubscription, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let receiver = self.hub.sender.subscribe();
        let backlog = self.hub.retained_matching(filter);
        debug!(
            client = %self.client_id,
            filter = %filter,
            retained = backlog.len(),
            "New subscription created"
        );

        Ok(TopicSubscription::new(
            receiver,
            filter.to_string(),
            backlog,
            self.hub.subscriptions.clone(),
        ))
    }
}
