//! # Wait Session
//!
//! One blocking wait call:
//!
//! ```text
//! CHECK_IMMEDIATE ──match──────────────────────────────► CLOSED (Matched)
//!        │ no match
//!        ▼
//!   REGISTERED ──delivery matches──► MATCHED ──┐
//!     │    ▲                                    ├──► CLOSED (unregister once)
//!     │    └── delivery does not match          │
//!     └──────── deadline ──────────► TIMED_OUT ─┘
//! ```
//!
//! The deadline is armed once at session start and is not extended by
//! deliveries that fail the condition.

use std::fmt;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info};

use crate::registry::{WaiterHandle, WaiterRegistry};
use crate::state_map::StateMap;

/// Condition a wait call is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// The value equals the target.
    Equals(String),
    /// The value differs from the given one. An absent value qualifies.
    NotEquals(String),
}

impl Condition {
    /// Evaluate against a current or delivered value.
    #[must_use]
    pub fn matches(&self, current: Option<&str>) -> bool {
        match self {
            Self::Equals(target) => current == Some(target.as_str()),
            Self::NotEquals(value) => current != Some(value.as_str()),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(target) => write!(f, "to be {target}"),
            Self::NotEquals(value) => write!(f, "not to be {value}"),
        }
    }
}

/// Terminal state of a wait call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The condition held, either immediately or on a delivered value.
    Matched,
    /// The deadline passed first.
    TimedOut,
    /// The waiter was unregistered from outside before a match.
    Closed,
}

impl WaitOutcome {
    /// Whether the condition was met.
    #[must_use]
    pub fn is_matched(self) -> bool {
        matches!(self, Self::Matched)
    }
}

/// A single wait-for-condition call against a map and registry.
pub struct WaitSession<'a> {
    states: &'a StateMap,
    registry: &'a WaiterRegistry,
    name: &'a str,
    condition: Condition,
    timeout: Duration,
}

impl<'a> WaitSession<'a> {
    /// Prepare a session; nothing is registered until [`run`](Self::run).
    #[must_use]
    pub fn new(
        states: &'a StateMap,
        registry: &'a WaiterRegistry,
        name: &'a str,
        condition: Condition,
        timeout: Duration,
    ) -> Self {
        Self {
            states,
            registry,
            name,
            condition,
            timeout,
        }
    }

    /// Drive the session to its terminal state.
    pub async fn run(self) -> WaitOutcome {
        let deadline = Instant::now().checked_add(self.timeout);

        if self.current_matches() {
            return WaitOutcome::Matched;
        }
        if self.timeout.is_zero() {
            self.log_timeout();
            return WaitOutcome::TimedOut;
        }

        let waiter = self
            .registry
            .register_until(self.name, self.condition.clone());

        // A store between the first read and the registration is only
        // visible in the map.
        if self.current_matches() {
            self.registry.unregister(&waiter);
            return WaitOutcome::Matched;
        }

        let outcome = match deadline {
            Some(deadline) => timeout_at(deadline, self.await_match(&waiter))
                .await
                .unwrap_or(WaitOutcome::TimedOut),
            None => self.await_match(&waiter).await,
        };

        self.registry.unregister(&waiter);
        if outcome == WaitOutcome::TimedOut {
            self.log_timeout();
        }
        outcome
    }

    async fn await_match(&self, waiter: &WaiterHandle) -> WaitOutcome {
        while let Some(value) = waiter.recv().await {
            if self.condition.matches(Some(&value)) {
                return WaitOutcome::Matched;
            }
            debug!(name = %self.name, value = %value, "Delivered state does not match, waiting");
        }
        WaitOutcome::Closed
    }

    fn current_matches(&self) -> bool {
        self.condition.matches(self.states.get(self.name).as_deref())
    }

    fn log_timeout(&self) {
        info!(
            name = %self.name,
            timeout_ms = self.timeout.as_millis() as u64,
            "Abort waiting for state {} {} after {:?}",
            self.name,
            self.condition,
            self.timeout
        );
    }
}
