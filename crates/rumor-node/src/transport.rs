//! Outbound send seam provided by the host process.

use rumor_proto::{Body, NodeId};

/// Fire-and-forget delivery of a message body to a peer or client.
///
/// Implementations must not block the caller and must attempt delivery at
/// most once per call; loss, delay, duplication, and reordering are all
/// tolerated by the dissemination engine's retry path. Implementations are
/// responsible for wrapping the body in an envelope and stamping a
/// `msg_id` if they assign them.
pub trait Transport: Send + Sync {
    /// Queues `body` for delivery to `to`.
    fn send(&self, to: &NodeId, body: Body);
}
