//! # Runtime Container
//!
//! Configuration for the statehub process.

pub mod config;

pub use config::{ConfigError, NodeConfig, ServiceCheckConfig, StateConfig};
