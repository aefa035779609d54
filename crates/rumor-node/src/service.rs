//! Request-facing broadcast service.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use rumor_proto::{error_code, Body, Message, NodeId, Payload, Value};

use crate::config::GossipConfig;
use crate::disseminator::GossipDisseminator;
use crate::retry::RetryRegistry;
use crate::store::ValueStore;
use crate::topology::TopologyManager;
use crate::transport::Transport;

/// The request-facing API of a broadcast node.
///
/// Owns one instance each of the store, topology, registry, and
/// disseminator for the lifetime of the process and wires inbound payloads
/// to them. Handlers never block on network I/O: replies and gossip sends
/// go through the fire-and-forget [`Transport`], and fan-out runs in
/// independent tasks, so an inbound `broadcast` is acknowledged promptly
/// regardless of how many neighbors remain to be gossiped to.
pub struct BroadcastService {
    local: NodeId,
    store: Arc<ValueStore>,
    topology: Arc<TopologyManager>,
    disseminator: GossipDisseminator,
    transport: Arc<dyn Transport>,
}

impl BroadcastService {
    /// Creates a service for `local`, given the cluster roster learned at
    /// init.
    #[must_use]
    pub fn new(
        local: NodeId,
        cluster: impl IntoIterator<Item = NodeId>,
        config: GossipConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let topology = Arc::new(TopologyManager::new(local.clone()));
        topology.set_cluster(cluster);

        let registry = Arc::new(RetryRegistry::new());
        let disseminator = GossipDisseminator::new(
            Arc::clone(&topology),
            registry,
            Arc::clone(&transport),
            config,
        );

        Self {
            local,
            store: Arc::new(ValueStore::new()),
            topology,
            disseminator,
            transport,
        }
    }

    /// Returns the local node id.
    #[must_use]
    pub const fn local(&self) -> &NodeId {
        &self.local
    }

    /// Returns the value store.
    #[must_use]
    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    /// Returns the topology manager.
    #[must_use]
    pub fn topology(&self) -> &TopologyManager {
        &self.topology
    }

    /// Dispatches one inbound envelope to the matching handler.
    ///
    /// Unexpected payloads (stray replies, a second `init`, ...) are
    /// logged and ignored; nothing here is fatal.
    pub fn handle(&self, msg: &Message) {
        trace!(kind = msg.body.payload.kind(), src = %msg.src, "inbound");
        match &msg.body.payload {
            Payload::Broadcast { message } => {
                self.handle_broadcast(&msg.src, msg.body.msg_id, message);
            }
            Payload::Read => self.handle_read(&msg.src, msg.body.msg_id),
            Payload::Topology { topology } => {
                self.handle_topology(&msg.src, msg.body.msg_id, topology);
            }
            Payload::Gossip { message } => {
                self.handle_gossip(&msg.src, msg.body.msg_id, message);
            }
            Payload::GossipAck { message } => self.handle_gossip_ack(&msg.src, message),
            other => {
                debug!(kind = other.kind(), src = %msg.src, "ignoring unexpected payload");
            }
        }
    }

    /// Accepts a value for cluster-wide dissemination.
    ///
    /// Always acknowledges the submitter; a duplicate submission is a
    /// no-op beyond the ack. A broadcast from a peer with a pending send
    /// of the same value doubles as an implicit ack: the peer evidently
    /// already knows it.
    pub fn handle_broadcast(&self, from: &NodeId, msg_id: Option<u64>, value: &Value) {
        self.disseminator.acknowledge(from, value);

        if self.store.add(value.clone()) {
            info!(%value, src = %from, "new value observed");
            self.disseminator.fan_out(value, Some(from));
        }
        self.reply(from, msg_id, Payload::BroadcastOk);
    }

    /// Answers with the full observed set. Reads never coordinate with
    /// in-flight gossip: the guarantee is eventual, not immediate,
    /// consistency.
    pub fn handle_read(&self, from: &NodeId, msg_id: Option<u64>) {
        let messages = self.store.snapshot();
        self.reply(from, msg_id, Payload::ReadOk { messages });
    }

    /// Applies a topology update, abandoning pending gossip to departed
    /// neighbors. A rejected update keeps the prior topology and reports
    /// the error to the caller.
    pub fn handle_topology(
        &self,
        from: &NodeId,
        msg_id: Option<u64>,
        topology: &HashMap<NodeId, Vec<NodeId>>,
    ) {
        match self.topology.set_topology(topology) {
            Ok(change) => {
                if !change.removed.is_empty() {
                    self.disseminator.abandon_departed();
                }
                self.reply(from, msg_id, Payload::TopologyOk);
            }
            Err(err) => {
                warn!(error = %err, src = %from, "rejected topology update");
                self.reply(
                    from,
                    msg_id,
                    Payload::error(error_code::MALFORMED_REQUEST, err.to_string()),
                );
            }
        }
    }

    /// Handles a value gossiped by a peer.
    ///
    /// Receiving the value from `from` doubles as an implicit ack for any
    /// pending send of that value to `from`. A value already observed is
    /// never re-disseminated (gossip-loop guard); the sender is excluded
    /// from the fan-out round either way.
    pub fn handle_gossip(&self, from: &NodeId, msg_id: Option<u64>, value: &Value) {
        self.disseminator.acknowledge(from, value);

        if self.store.add(value.clone()) {
            debug!(%value, src = %from, "new value via gossip");
            self.disseminator.fan_out(value, Some(from));
        }

        self.reply(
            from,
            msg_id,
            Payload::GossipAck {
                message: value.clone(),
            },
        );
    }

    /// Handles an explicit gossip acknowledgement.
    pub fn handle_gossip_ack(&self, from: &NodeId, value: &Value) {
        self.disseminator.acknowledge(from, value);
    }

    fn reply(&self, to: &NodeId, in_reply_to: Option<u64>, payload: Payload) {
        self.transport.send(to, Body::reply(in_reply_to, payload));
    }
}
