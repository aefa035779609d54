//! Grow-only store of observed broadcast values.

use parking_lot::RwLock;
use std::collections::HashSet;

use rumor_proto::Value;

/// Deduplicated record of every value this node has observed.
///
/// The set only grows: once a value is added it is never removed for the
/// lifetime of the process. Membership is the deduplication rule for the
/// whole dissemination engine — a value is fanned out exactly when its
/// insertion here reports it as new.
#[derive(Debug, Default)]
pub struct ValueStore {
    values: RwLock<HashSet<Value>>,
}

impl ValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning `true` if it was not already present.
    pub fn add(&self, value: Value) -> bool {
        self.values.write().insert(value)
    }

    /// Returns whether the value has been observed.
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.values.read().contains(value)
    }

    /// Returns the full observed set, in unspecified order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Value> {
        self.values.read().iter().cloned().collect()
    }

    /// Returns the number of observed values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}
