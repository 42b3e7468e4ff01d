//! # Smart-Home Broker
//!
//! Drives a [`Transport`] on behalf of one bridge: announces the bridge's
//! connection state on `<top>/connected`, routes subscribed messages to
//! handlers, and publishes item status.
//!
//! When a [`StateStore`] is attached, every connection state the broker
//! announces is mirrored into the store under [`CONNECTION_STATE`], so
//! callers can `wait_for("connection", "2", ..)`.
//!
//! Handlers for every subscription are fed through one queue and run one
//! at a time by [`SmartHomeBroker::run`], in arrival order.

use crate::message::Message;
use crate::topics::TopicLayout;
use crate::transport::{Transport, TransportError};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use shared_types::device::ConnectionState;
use state_store::{StateStore, CONNECTION_STATE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Errors raised by broker operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("Not connected, cannot {0}")]
    NotConnected(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Failed to encode status for {item}: {message}")]
    Encode { item: String, message: String },

    #[error("Broker loop is already running")]
    AlreadyRunning,
}

/// Receives messages for a subscription.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, broker: &SmartHomeBroker, message: Message);
}

/// Adapts a plain closure into a [`MessageHandler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> MessageHandler for FnHandler<F>
where
    F: Fn(&SmartHomeBroker, Message) + Send + Sync,
{
    async fn handle(&self, broker: &SmartHomeBroker, message: Message) {
        (self.0)(broker, message);
    }
}

/// Callbacks for connection lifecycle events.
#[async_trait]
pub trait ConnectionHandler: Send + Sync {
    /// Called after every successful connect, including reconnects.
    async fn on_connect(&self, _broker: &SmartHomeBroker) {}

    /// Called when the transport drops without being asked to.
    async fn on_connection_lost(&self, _broker: &SmartHomeBroker) {}
}

struct Dispatch {
    handler: Arc<dyn MessageHandler>,
    message: Message,
}

pub struct SmartHomeBroker {
    transport: Arc<dyn Transport>,
    topics: TopicLayout,
    store: Option<Arc<StateStore>>,
    connection_handler: Option<Arc<dyn ConnectionHandler>>,
    dispatch_tx: mpsc::Sender<Dispatch>,
    dispatch_rx: Mutex<Option<mpsc::Receiver<Dispatch>>>,
    forwarders: Mutex<Vec<JoinHandle<()>>>,
    hardware_connected: AtomicBool,
}

impl SmartHomeBroker {
    pub fn new(transport: Arc<dyn Transport>, topics: TopicLayout) -> Self {
        let (dispatch_tx, dispatch_rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            transport,
            topics,
            store: None,
            connection_handler: None,
            dispatch_tx,
            dispatch_rx: Mutex::new(Some(dispatch_rx)),
            forwarders: Mutex::new(Vec::new()),
            hardware_connected: AtomicBool::new(false),
        }
    }

    /// Mirror announced connection states into `store`.
    #[must_use]
    pub fn with_state_store(mut self, store: Arc<StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_connection_handler(mut self, handler: Arc<dyn ConnectionHandler>) -> Self {
        self.connection_handler = Some(handler);
        self
    }

    #[must_use]
    pub fn topics(&self) -> &TopicLayout {
        &self.topics
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    #[must_use]
    pub fn state_store(&self) -> Option<&Arc<StateStore>> {
        self.store.as_ref()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Connection state as last announced.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        if self.is_connected() {
            ConnectionState::connected(self.hardware_connected.load(Ordering::SeqCst))
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Connect the transport and announce `"1"`.
    ///
    /// A will message of `"0"` is registered first, so the server announces
    /// the loss if the connection later drops.
    pub async fn connect(&self) -> Result<(), BrokerError> {
        let connected = self.topics.connected();
        self.transport
            .set_will(Message::retained(connected, ConnectionState::Disconnected.as_str()));
        self.transport.connect().await?;
        self.hardware_connected.store(false, Ordering::SeqCst);

        info!(topic = %self.topics.top_level(), "Broker connected");
        self.on_connected().await
    }

    /// Announce `"0"` and disconnect cleanly.
    pub async fn disconnect(&self) {
        if !self.is_connected() {
            return;
        }

        self.hardware_connected.store(false, Ordering::SeqCst);
        if let Err(e) = self.announce(ConnectionState::Disconnected).await {
            warn!(error = %e, "Failed to announce disconnect");
        }

        for forwarder in self.forwarders.lock().drain(..) {
            forwarder.abort();
        }
        self.transport.disconnect().await;
        info!(topic = %self.topics.top_level(), "Broker disconnected");
    }

    /// Announce whether the bridged hardware is reachable (`"2"` or `"1"`).
    pub async fn set_connection_state(&self, hardware_connected: bool) -> Result<(), BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::NotConnected(
                "publish connection state".to_string(),
            ));
        }
        self.hardware_connected
            .store(hardware_connected, Ordering::SeqCst);
        self.announce(ConnectionState::connected(hardware_connected))
            .await
    }

    /// Route messages matching `filter` to `handler`.
    pub async fn subscribe(
        &self,
        filter: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::NotConnected(format!("subscribe to {filter}")));
        }

        let mut subscription = self.transport.subscribe(filter).await?;
        let tx = self.dispatch_tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(message) = subscription.recv().await {
                let dispatch = Dispatch {
                    handler: handler.clone(),
                    message,
                };
                if tx.send(dispatch).await.is_err() {
                    break;
                }
            }
        });
        self.forwarders.lock().push(forwarder);

        debug!(filter = %filter, "Subscribed");
        Ok(())
    }

    /// Route actions for `item` (`<top>/set/<item>`) to `handler`.
    pub async fn subscribe_action(
        &self,
        item: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), BrokerError> {
        self.subscribe(&self.topics.action(item), handler).await
    }

    /// Publish a raw message.
    pub async fn publish(&self, message: Message) -> Result<usize, BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::NotConnected(format!(
                "publish to {}",
                message.topic
            )));
        }
        Ok(self.transport.publish(message).await?)
    }

    /// Publish a plain-text status for `item`, retained.
    pub async fn publish_simple_status(&self, item: &str, value: &str) -> Result<(), BrokerError> {
        self.publish(Message::retained(self.topics.status(item), value))
            .await?;
        Ok(())
    }

    /// Publish a JSON-encoded status for `item`, retained.
    pub async fn publish_status<T: Serialize + Sync>(
        &self,
        item: &str,
        status: &T,
    ) -> Result<(), BrokerError> {
        let payload = serde_json::to_vec(status).map_err(|e| BrokerError::Encode {
            item: item.to_string(),
            message: e.to_string(),
        })?;
        self.publish(Message::retained(self.topics.status(item), payload))
            .await?;
        Ok(())
    }

    /// Dispatch subscribed messages until `shutdown` flips, then disconnect.
    ///
    /// Connects first if needed. Connection losses and reconnects seen on the
    /// transport are handled inside the loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), BrokerError> {
        let mut dispatch = self
            .dispatch_rx
            .lock()
            .take()
            .ok_or(BrokerError::AlreadyRunning)?;

        if !self.is_connected() {
            if let Err(e) = self.connect().await {
                *self.dispatch_rx.lock() = Some(dispatch);
                return Err(e);
            }
        }

        let mut status = self.transport.connection_status();
        info!(topic = %self.topics.top_level(), "Broker loop started");

        while !*shutdown.borrow() {
            tokio::select! {
                _ = shutdown.changed() => break,
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let up = *status.borrow_and_update();
                    if up {
                        if let Err(e) = self.on_connected().await {
                            warn!(error = %e, "Failed to announce reconnect");
                        }
                    } else {
                        self.handle_connection_lost().await;
                    }
                }
                next = dispatch.recv() => {
                    let Some(Dispatch { handler, message }) = next else {
                        break;
                    };
                    debug!(topic = %message.topic, "Dispatching message");
                    handler.handle(self, message).await;
                }
            }
        }

        *self.dispatch_rx.lock() = Some(dispatch);
        self.disconnect().await;
        info!(topic = %self.topics.top_level(), "Broker loop stopped");
        Ok(())
    }

    /// React to a connection the transport lost on its own.
    ///
    /// The server has already published the will; this mirrors `"0"` into
    /// the store and notifies the connection handler.
    pub async fn handle_connection_lost(&self) {
        warn!(topic = %self.topics.top_level(), "Broker connection lost");
        self.hardware_connected.store(false, Ordering::SeqCst);
        self.mirror(ConnectionState::Disconnected);

        if let Some(handler) = &self.connection_handler {
            handler.on_connection_lost(self).await;
        }
    }

    async fn on_connected(&self) -> Result<(), BrokerError> {
        let state = ConnectionState::connected(self.hardware_connected.load(Ordering::SeqCst));
        self.announce(state).await?;

        if let Some(handler) = &self.connection_handler {
            handler.on_connect(self).await;
        }
        Ok(())
    }

    async fn announce(&self, state: ConnectionState) -> Result<(), BrokerError> {
        self.transport
            .publish(Message::retained(self.topics.connected(), state.as_str()))
            .await?;
        self.mirror(state);
        debug!(state = %state, "Connection state announced");
        Ok(())
    }

    fn mirror(&self, state: ConnectionState) {
        if let Some(store) = &self.store {
            store.store(CONNECTION_STATE, state.as_str());
        }
    }
}

impl Drop for SmartHomeBroker {
    fn drop(&mut self) {
        for forwarder in self.forwarders.get_mut().drain(..) {
            forwarder.abort();
        }
    }
}
