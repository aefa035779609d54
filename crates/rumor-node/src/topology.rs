//! Neighbor set management.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::info;

use rumor_proto::NodeId;

/// Errors that can occur while applying a topology update.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    /// The update referenced a node that is not part of the cluster.
    #[error("unknown node '{0}' referenced in topology update")]
    UnknownNode(NodeId),

    /// The update listed a node as its own neighbor.
    #[error("node '{0}' cannot be its own neighbor")]
    SelfNeighbor(NodeId),
}

/// The effect of applying a topology update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyChange {
    /// Neighbors present after the update but not before.
    pub added: Vec<NodeId>,
    /// Neighbors present before the update but not after.
    pub removed: Vec<NodeId>,
}

/// Holds this node's neighbor set, replaceable wholesale by a topology
/// update.
///
/// Before the first update the neighbor set is empty: a node that has
/// received no topology does not gossip. Updates are validated against the
/// cluster roster learned at init; an update referencing an unknown node is
/// rejected in full and the prior topology kept.
#[derive(Debug)]
pub struct TopologyManager {
    local: NodeId,
    cluster: RwLock<HashSet<NodeId>>,
    neighbors: RwLock<HashSet<NodeId>>,
}

impl TopologyManager {
    /// Creates a manager for the given local node with no neighbors.
    #[must_use]
    pub fn new(local: NodeId) -> Self {
        Self {
            local,
            cluster: RwLock::new(HashSet::new()),
            neighbors: RwLock::new(HashSet::new()),
        }
    }

    /// Returns the local node id.
    #[must_use]
    pub const fn local(&self) -> &NodeId {
        &self.local
    }

    /// Records the cluster roster, used to validate topology updates.
    pub fn set_cluster(&self, node_ids: impl IntoIterator<Item = NodeId>) {
        let roster: HashSet<NodeId> = node_ids.into_iter().collect();
        *self.cluster.write() = roster;
    }

    /// Returns whether the id belongs to the cluster roster.
    #[must_use]
    pub fn cluster_contains(&self, id: &NodeId) -> bool {
        self.cluster.read().contains(id)
    }

    /// Replaces the neighbor set from a cluster-wide adjacency map.
    ///
    /// The whole map is validated first: every key and every listed
    /// neighbor must be in the cluster roster, and no node may list itself.
    /// On any violation the update is rejected and the prior topology kept.
    ///
    /// Returns which neighbors were added and removed so the caller can
    /// abandon pending gossip to departed neighbors.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnknownNode`] or
    /// [`TopologyError::SelfNeighbor`] without modifying state.
    pub fn set_topology(
        &self,
        topology: &HashMap<NodeId, Vec<NodeId>>,
    ) -> Result<TopologyChange, TopologyError> {
        {
            let cluster = self.cluster.read();
            for (node, neighbors) in topology {
                if !cluster.contains(node) {
                    return Err(TopologyError::UnknownNode(node.clone()));
                }
                for neighbor in neighbors {
                    if neighbor == node {
                        return Err(TopologyError::SelfNeighbor(node.clone()));
                    }
                    if !cluster.contains(neighbor) {
                        return Err(TopologyError::UnknownNode(neighbor.clone()));
                    }
                }
            }
        }

        let next: HashSet<NodeId> = topology
            .get(&self.local)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default();

        let mut neighbors = self.neighbors.write();
        let added: Vec<NodeId> = next.difference(&neighbors).cloned().collect();
        let removed: Vec<NodeId> = neighbors.difference(&next).cloned().collect();
        *neighbors = next;

        info!(
            node = %self.local,
            neighbors = neighbors.len(),
            added = added.len(),
            removed = removed.len(),
            "topology replaced"
        );

        Ok(TopologyChange { added, removed })
    }

    /// Returns the current neighbor set, excluding self.
    #[must_use]
    pub fn neighbors(&self) -> Vec<NodeId> {
        self.neighbors.read().iter().cloned().collect()
    }

    /// Returns the current neighbor set as a set.
    #[must_use]
    pub fn neighbor_set(&self) -> HashSet<NodeId> {
        self.neighbors.read().clone()
    }

    /// Returns whether the id is a current neighbor.
    #[must_use]
    pub fn is_neighbor(&self, id: &NodeId) -> bool {
        self.neighbors.read().contains(id)
    }
}
