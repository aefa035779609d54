//! # rumor-proto
//!
//! Wire protocol for the rumor broadcast cluster.
//!
//! Nodes exchange line-delimited JSON envelopes. Each envelope names a
//! source, a destination, and a body whose `type` field selects the
//! payload variant.
//!
//! ## Core Types
//!
//! - [`Message`]: a full envelope (src, dest, body)
//! - [`Body`]: message id / reply correlation plus the flattened payload
//! - [`Payload`]: the tagged payload variants (`broadcast`, `read`, ...)
//! - [`NodeId`]: identifier of a node or client process
//! - [`Value`]: an opaque broadcast value (integer or string)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod envelope;
pub mod error;
pub mod payload;
pub mod types;

pub use envelope::{Body, Message};
pub use error::ProtoError;
pub use payload::{error_code, Payload};
pub use types::{NodeId, Value};
