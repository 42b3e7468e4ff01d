//! # State Store - Named State With Bounded Waits
//!
//! Independent workers record named state values (`"connection"`,
//! `"light/kitchen"`, ...) and other workers suspend until a name reaches,
//! or leaves, a particular value.
//!
//! ## Components
//!
//! ```text
//!  store(name, value)                      wait_for / wait_for_not
//!         │                                          │
//!         ▼                                          ▼
//!  ┌──────────────┐                         ┌──────────────────┐
//!  │   StateMap   │◄──── immediate check ───│   WaitSession    │
//!  └──────┬───────┘                         └────────┬─────────┘
//!         │ (name, sequence, value)                  │ register / unregister
//!         ▼                                          ▼
//!  ┌──────────────┐        snapshot         ┌──────────────────┐
//!  │ Broadcaster  │ ──────────────────────► │  WaiterRegistry  │
//!  └──────────────┘   push into each slot   └──────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Every waiter registered when a value is delivered receives it.
//! - A waiter observes values for its name in store order.
//! - Delivery never blocks the producer: each waiter owns a bounded queue
//!   and a full queue drops its oldest value. The first value satisfying
//!   the waiter's condition is latched and never dropped.
//! - A waiter is unregistered exactly once on every exit path, including a
//!   wait future dropped by its caller.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod broadcaster;
pub mod registry;
pub mod session;
pub mod state_map;
pub mod store;

pub use broadcaster::{Broadcaster, DeliveryReport};
pub use registry::{DeliverySlot, DeliveryStatus, WaiterHandle, WaiterId, WaiterRegistry};
pub use session::{Condition, WaitOutcome, WaitSession};
pub use state_map::{StateMap, StoreOutcome};
pub use store::{StateStore, StoreStats};

/// Values buffered per waiter before the oldest one is displaced.
pub const DEFAULT_WAITER_CAPACITY: usize = 16;

/// Name under which the transport layer mirrors its connection state.
pub const CONNECTION_STATE: &str = "connection";
