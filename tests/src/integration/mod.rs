//! # Integration Flows
//!
//! - `flows` - remote controllers driving the running node over the bus
//! - `waiting` - wait semantics observed through the bus end to end

pub mod flows;
pub mod waiting;
