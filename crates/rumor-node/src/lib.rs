//! # rumor-node
//!
//! Core broadcast dissemination engine for a single cluster node.
//!
//! A node accepts values submitted by clients or peers, records them in a
//! grow-only store, and gossips every newly observed value to each current
//! neighbor until that neighbor acknowledges it. Reads return the full
//! observed set with eventual-consistency semantics.
//!
//! ## Core Types
//!
//! - [`ValueStore`]: deduplicated, grow-only record of observed values
//! - [`TopologyManager`]: the node's replaceable neighbor set
//! - [`RetryRegistry`]: outstanding (neighbor, value) sends awaiting acks
//! - [`GossipDisseminator`]: fan-out and per-pair retry loops
//! - [`BroadcastService`]: the request-facing façade wiring it all together
//! - [`Transport`]: fire-and-forget send seam provided by the host process

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod disseminator;
pub mod retry;
pub mod service;
pub mod store;
pub mod topology;
pub mod transport;

pub use config::GossipConfig;
pub use disseminator::GossipDisseminator;
pub use retry::{PendingGossip, RetryRegistry};
pub use service::BroadcastService;
pub use store::ValueStore;
pub use topology::{TopologyChange, TopologyError, TopologyManager};
pub use transport::Transport;
