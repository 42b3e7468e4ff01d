//! Action topics to state store.

use async_trait::async_trait;
use shared_types::payload_str;
use smarthome_bus::{Message, MessageHandler, SmartHomeBroker};
use state_store::{StateStore, CONNECTION_STATE};
use statehub_telemetry::{metric_inc, time_histogram, BUS_HANDLER_DURATION};
use statehub_telemetry::{BUS_MESSAGES_PUBLISHED, BUS_MESSAGES_RECEIVED};
use std::sync::Arc;
use tracing::{debug, warn};

/// Stores every action payload under its item name.
///
/// The status topic is only republished when the stored value is new or
/// differs from the previous one. The connection state belongs to the
/// broker and cannot be set remotely.
pub struct StateBridge {
    store: Arc<StateStore>,
}

impl StateBridge {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MessageHandler for StateBridge {
    async fn handle(&self, broker: &SmartHomeBroker, message: Message) {
        let _timer = time_histogram!(BUS_HANDLER_DURATION);

        let Some(item) = broker.topics().action_item(&message.topic) else {
            metric_inc!(BUS_MESSAGES_RECEIVED, &["other"]);
            debug!(topic = %message.topic, "Ignoring non-action message");
            return;
        };
        metric_inc!(BUS_MESSAGES_RECEIVED, &["action"]);

        if item == CONNECTION_STATE {
            warn!(topic = %message.topic, "Refusing remote connection state");
            return;
        }

        let value = match payload_str(&message.payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(item = %item, error = %e, "Dropping action with invalid payload");
                return;
            }
        };

        let outcome = self.store.store(item, value);
        if outcome.previous.as_deref() == Some(value) {
            debug!(item = %item, "Value unchanged, status not republished");
            return;
        }

        match broker.publish_simple_status(item, value).await {
            Ok(()) => metric_inc!(BUS_MESSAGES_PUBLISHED, &["status"]),
            Err(e) => warn!(item = %item, error = %e, "Failed to publish status"),
        }
    }
}
