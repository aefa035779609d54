//! Payload variants carried in message bodies.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{NodeId, Value};

/// Well-known protocol error codes.
pub mod error_code {
    /// The request was malformed or referenced something that does not exist.
    pub const MALFORMED_REQUEST: u64 = 12;
    /// The node hit an internal error while handling the request.
    pub const CRASH: u64 = 13;
}

/// The payload of a message body, selected by the `type` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// Bootstrap: assigns this node its identity and the cluster roster.
    Init {
        /// The id assigned to the receiving node.
        node_id: NodeId,
        /// All node ids in the cluster, including the receiver.
        node_ids: Vec<NodeId>,
    },
    /// Acknowledges `init`.
    InitOk,
    /// Echo request.
    Echo {
        /// Arbitrary payload to echo back.
        echo: serde_json::Value,
    },
    /// Echo reply.
    EchoOk {
        /// The echoed payload.
        echo: serde_json::Value,
    },
    /// Unique id request.
    Generate,
    /// Unique id reply.
    GenerateOk {
        /// The generated id.
        id: String,
    },
    /// Submits a value for cluster-wide dissemination.
    Broadcast {
        /// The submitted value.
        message: Value,
    },
    /// Acknowledges `broadcast`.
    BroadcastOk,
    /// Asks for every value this node has observed.
    Read,
    /// Reply to `read`.
    ReadOk {
        /// All values observed so far, in unspecified order.
        messages: Vec<Value>,
    },
    /// Replaces the neighbor sets of the cluster.
    Topology {
        /// Adjacency map: node id to its neighbor list.
        topology: HashMap<NodeId, Vec<NodeId>>,
    },
    /// Acknowledges `topology`.
    TopologyOk,
    /// Peer-to-peer forwarding of a single value.
    Gossip {
        /// The forwarded value.
        message: Value,
    },
    /// Acknowledges receipt of a gossiped value.
    GossipAck {
        /// The value being acknowledged.
        message: Value,
    },
    /// Error reply.
    Error {
        /// Protocol error code (see [`error_code`]).
        code: u64,
        /// Human-readable description.
        text: String,
    },
}

impl Payload {
    /// Builds an error payload.
    #[must_use]
    pub fn error(code: u64, text: impl Into<String>) -> Self {
        Self::Error {
            code,
            text: text.into(),
        }
    }

    /// Returns the wire name of this payload, for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::InitOk => "init_ok",
            Self::Echo { .. } => "echo",
            Self::EchoOk { .. } => "echo_ok",
            Self::Generate => "generate",
            Self::GenerateOk { .. } => "generate_ok",
            Self::Broadcast { .. } => "broadcast",
            Self::BroadcastOk => "broadcast_ok",
            Self::Read => "read",
            Self::ReadOk { .. } => "read_ok",
            Self::Topology { .. } => "topology",
            Self::TopologyOk => "topology_ok",
            Self::Gossip { .. } => "gossip",
            Self::GossipAck { .. } => "gossip_ack",
            Self::Error { .. } => "error",
        }
    }
}
