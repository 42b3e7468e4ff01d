//! # State Map
//!
//! The authoritative mapping from name to current value.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Result of recording a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOutcome {
    /// Value recorded before this call, if any.
    pub previous: Option<String>,

    /// `false` for the first value of a name, otherwise whether the value differs.
    pub changed: bool,

    /// Position of this call in the map's total store order.
    pub sequence: u64,
}

struct Inner {
    values: HashMap<String, String>,
    sequence: u64,
}

/// Name -> value map guarded by a single lock.
///
/// The lock covers the map access only; delivery to waiters happens
/// after it is released.
pub struct StateMap {
    inner: Mutex<Inner>,
}

impl StateMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                values: HashMap::new(),
                sequence: 0,
            }),
        }
    }

    /// Record `value` as current for `name`, unconditionally.
    pub fn store(&self, name: &str, value: &str) -> StoreOutcome {
        let mut inner = self.inner.lock();
        inner.sequence += 1;
        let sequence = inner.sequence;
        let previous = inner.values.insert(name.to_owned(), value.to_owned());
        drop(inner);

        let changed = previous.as_deref().is_some_and(|prev| prev != value);
        StoreOutcome {
            previous,
            changed,
            sequence,
        }
    }

    /// Current value of `name`, or `None` if it was never stored.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.inner.lock().values.get(name).cloned()
    }

    /// Copy of every recorded value.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.inner.lock().values.clone()
    }

    /// Number of names with a recorded value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().values.len()
    }

    /// Whether no value was ever recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StateMap {
    fn default() -> Self {
        Self::new()
    }
}
