//! Tracking of outstanding gossip sends awaiting acknowledgement.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

use rumor_proto::{NodeId, Value};

use crate::config::GossipConfig;

/// An outstanding dissemination attempt to one neighbor for one value.
#[derive(Debug, Clone)]
pub struct PendingGossip {
    /// How many sends have been issued so far.
    pub attempts: u32,
    /// When the next retry is due.
    pub next_retry: Instant,
}

/// Registry of outstanding (neighbor, value) gossip attempts.
///
/// An entry exists exactly while dissemination to that neighbor is
/// unresolved: it is created when fan-out decides to send, removed by an
/// acknowledgement (explicit or implicit) or when the neighbor leaves the
/// topology. Retry loops check entry presence before every attempt, so a
/// removed entry is the cancellation signal — a timer firing afterwards is
/// a no-op.
#[derive(Debug, Default)]
pub struct RetryRegistry {
    entries: Mutex<HashMap<NodeId, HashMap<Value, PendingGossip>>>,
}

impl RetryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new pending send, returning `false` if one is already
    /// outstanding for this (neighbor, value) pair.
    pub fn insert(&self, neighbor: NodeId, value: Value) -> bool {
        let mut entries = self.entries.lock();
        let per_neighbor = entries.entry(neighbor).or_default();
        if per_neighbor.contains_key(&value) {
            return false;
        }
        per_neighbor.insert(
            value,
            PendingGossip {
                attempts: 0,
                next_retry: Instant::now(),
            },
        );
        true
    }

    /// Starts the next send attempt for a pending entry.
    ///
    /// Increments the attempt count, stamps the retry deadline, and
    /// returns the delay to wait before the following attempt. Returns
    /// `None` if the entry has been resolved or abandoned — the caller's
    /// retry loop must exit without sending.
    pub fn begin_attempt(
        &self,
        neighbor: &NodeId,
        value: &Value,
        config: &GossipConfig,
    ) -> Option<std::time::Duration> {
        let mut entries = self.entries.lock();
        let pending = entries.get_mut(neighbor)?.get_mut(value)?;
        pending.attempts += 1;
        let delay = config.delay_for_attempt(pending.attempts);
        pending.next_retry = Instant::now() + delay;
        Some(delay)
    }

    /// Resolves a pending entry (acknowledged), returning whether one was
    /// outstanding.
    pub fn resolve(&self, neighbor: &NodeId, value: &Value) -> bool {
        let mut entries = self.entries.lock();
        let Some(per_neighbor) = entries.get_mut(neighbor) else {
            return false;
        };
        let removed = per_neighbor.remove(value).is_some();
        if per_neighbor.is_empty() {
            entries.remove(neighbor);
        }
        removed
    }

    /// Abandons every entry addressed to a neighbor not in `current`.
    ///
    /// Returns the number of abandoned entries.
    pub fn retain_neighbors(&self, current: &HashSet<NodeId>) -> usize {
        let mut entries = self.entries.lock();
        let mut abandoned = 0;
        entries.retain(|neighbor, per_neighbor| {
            if current.contains(neighbor) {
                true
            } else {
                abandoned += per_neighbor.len();
                false
            }
        });
        abandoned
    }

    /// Returns whether a send is outstanding for the pair.
    #[must_use]
    pub fn is_pending(&self, neighbor: &NodeId, value: &Value) -> bool {
        self.entries
            .lock()
            .get(neighbor)
            .is_some_and(|per_neighbor| per_neighbor.contains_key(value))
    }

    /// Returns the attempt count for a pending pair, if outstanding.
    #[must_use]
    pub fn attempts(&self, neighbor: &NodeId, value: &Value) -> Option<u32> {
        self.entries
            .lock()
            .get(neighbor)
            .and_then(|per_neighbor| per_neighbor.get(value))
            .map(|pending| pending.attempts)
    }

    /// Returns the total number of outstanding entries.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries.lock().values().map(HashMap::len).sum()
    }
}
