//! # statehub Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # State store throughput
//! └── src/integration/  # Flows across bus, bridge and store
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p statehub-tests
//! cargo bench -p statehub-tests
//! ```

#![allow(dead_code)]

pub mod integration;
