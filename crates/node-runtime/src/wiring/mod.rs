//! # Wiring
//!
//! Handlers that connect the broker to the state store.
//!
//! ```text
//!  <top>/set/<item> ──► SmartHomeBroker ──► StateBridge ──► StateStore::store(item, payload)
//!                                               │
//!                                               └──► <top>/status/<item>  (new or changed values)
//! ```

pub mod state_bridge;

pub use state_bridge::StateBridge;
