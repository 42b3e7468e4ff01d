//! # Smart-Home Bus
//!
//! The message-transport boundary of a smart-home bridge.
//!
//! ```text
//!   remote controllers                         bridge process
//!  ┌──────────────────┐   <top>/set/<item>   ┌──────────────────┐
//!  │ publish actions  │ ───────────────────► │ SmartHomeBroker  │──► handlers
//!  │                  │ ◄─────────────────── │                  │
//!  └──────────────────┘  <top>/status/<item> └────────┬─────────┘
//!                        <top>/connected              │ "connection"
//!                                                     ▼
//!                                               ┌────────────┐
//!                                               │ StateStore │
//!                                               └────────────┘
//! ```
//!
//! [`Transport`] is the publish/subscribe seam; [`InMemoryTransport`] is
//! the in-process implementation used by the runtime and the tests.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod broker;
pub mod config;
pub mod delay;
pub mod message;
pub mod subscriber;
pub mod topics;
pub mod transport;

pub use broker::{BrokerError, ConnectionHandler, FnHandler, MessageHandler, SmartHomeBroker};
pub use config::{load_config, BrokerConfig, ConfigError};
pub use delay::DelayedPublisher;
pub use message::{Message, QoS};
pub use subscriber::{SubscriptionError, TopicSubscription};
pub use topics::{topic_matches, TopicLayout};
pub use transport::{Credentials, InMemoryHub, InMemoryTransport, Transport, TransportError};

/// Messages buffered per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
