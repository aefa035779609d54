//! # rumord
//!
//! The rumor broadcast node daemon.
//!
//! Speaks the cluster protocol over stdin/stdout as line-delimited JSON
//! envelopes: `init` bootstraps the node's identity, after which
//! `broadcast`/`read`/`topology` and peer gossip dispatch into
//! [`rumor_node::BroadcastService`]. Logs go to stderr; stdout carries
//! only protocol traffic.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod runtime;
pub mod transport;

pub use runtime::NodeRuntime;
pub use transport::StdoutTransport;
