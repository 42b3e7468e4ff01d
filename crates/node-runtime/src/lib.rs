//! # Node Runtime Library
//!
//! The pieces of the `statehub` binary, exposed for the integration tests.
//!
//! - `container/` - configuration
//! - `wiring/` - handlers connecting the broker to the state store
//! - `runtime` - startup and shutdown of the whole process
//! - `notify` - readiness notification to a service manager

#![allow(clippy::type_complexity)]

pub mod container;
pub mod notify;
pub mod runtime;
pub mod wiring;

pub use container::{ConfigError, NodeConfig};
pub use runtime::NodeRuntime;
pub use wiring::StateBridge;
