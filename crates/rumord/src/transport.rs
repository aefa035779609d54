//! Transport over the stdout writer channel.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use rumor_node::Transport;
use rumor_proto::{Body, Message, NodeId};

/// Queues envelopes for the stdout writer task, stamping each outbound
/// body with a process-unique `msg_id`.
///
/// Sends never block; a closed writer channel means the process is
/// shutting down and the message is dropped (loss the retry path already
/// tolerates).
#[derive(Debug)]
pub struct StdoutTransport {
    src: NodeId,
    seq: AtomicU64,
    out: UnboundedSender<Message>,
}

impl StdoutTransport {
    /// Creates a transport sending as `src`.
    #[must_use]
    pub fn new(src: NodeId, out: UnboundedSender<Message>) -> Self {
        Self {
            src,
            seq: AtomicU64::new(0),
            out,
        }
    }

    /// Returns the local node id this transport sends as.
    #[must_use]
    pub const fn src(&self) -> &NodeId {
        &self.src
    }

    fn next_msg_id(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Transport for StdoutTransport {
    fn send(&self, to: &NodeId, body: Body) {
        let body = body.with_msg_id(self.next_msg_id());
        let msg = Message::new(self.src.clone(), to.clone(), body);
        if self.out.send(msg).is_err() {
            warn!(dest = %to, "writer closed; dropping outbound envelope");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumor_proto::Payload;

    fn transport() -> (StdoutTransport, tokio::sync::mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (StdoutTransport::new(NodeId::new("n1"), tx), rx)
    }

    #[test]
    fn stamps_incrementing_msg_ids() {
        let (transport, mut rx) = transport();

        transport.send(&NodeId::new("n2"), Body::new(Payload::TopologyOk));
        transport.send(&NodeId::new("n2"), Body::new(Payload::TopologyOk));

        let first = rx.try_recv().expect("first send");
        let second = rx.try_recv().expect("second send");
        assert_eq!(first.body.msg_id, Some(1));
        assert_eq!(second.body.msg_id, Some(2));
    }

    #[test]
    fn builds_envelope_with_src_and_dest() {
        let (transport, mut rx) = transport();

        transport.send(
            &NodeId::new("c3"),
            Body::reply(Some(9), Payload::BroadcastOk),
        );

        let msg = rx.try_recv().expect("send");
        assert_eq!(msg.src, NodeId::new("n1"));
        assert_eq!(msg.dest, NodeId::new("c3"));
        assert_eq!(msg.body.in_reply_to, Some(9));
    }

    #[test]
    fn closed_writer_does_not_panic() {
        let (transport, rx) = transport();
        drop(rx);

        transport.send(&NodeId::new("n2"), Body::new(Payload::TopologyOk));
    }
}
