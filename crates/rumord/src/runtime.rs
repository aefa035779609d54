//! Envelope loop: stdin lines in, stdout lines out.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use rumor_node::{BroadcastService, GossipConfig, Transport};
use rumor_proto::{Body, Message, NodeId, Payload};

use crate::transport::StdoutTransport;

/// Spawns the writer task: serializes queued envelopes to stdout, one per
/// line.
pub fn spawn_writer(mut rx: UnboundedReceiver<Message>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(msg) = rx.recv().await {
            let line = match msg.to_json() {
                Ok(line) => line,
                Err(err) => {
                    error!(error = %err, "failed to serialize outbound envelope");
                    continue;
                }
            };
            let write = async {
                stdout.write_all(line.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await
            };
            if let Err(err) = write.await {
                error!(error = %err, "stdout write failed; stopping writer");
                return;
            }
        }
    })
}

/// The node's inbound processing loop and pre-init bootstrap state.
///
/// Everything before `init` is dropped with a warning; `init` wires up the
/// transport and [`BroadcastService`], after which protocol traffic
/// dispatches into the service. `echo` and `generate` are served directly
/// here — they need no cluster state.
pub struct NodeRuntime {
    gossip: GossipConfig,
    out: UnboundedSender<Message>,
    transport: Option<Arc<StdoutTransport>>,
    service: Option<Arc<BroadcastService>>,
}

impl NodeRuntime {
    /// Creates an uninitialized runtime writing through `out`.
    #[must_use]
    pub fn new(gossip: GossipConfig, out: UnboundedSender<Message>) -> Self {
        Self {
            gossip,
            out,
            transport: None,
            service: None,
        }
    }

    /// Returns whether `init` has been processed.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.service.is_some()
    }

    /// Reads stdin to EOF, processing one envelope per line.
    ///
    /// # Errors
    ///
    /// Returns an error only if reading stdin itself fails.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            self.process_line(&line);
        }
        info!("stdin closed; shutting down");
        Ok(())
    }

    /// Parses and processes a single line. Malformed lines are logged and
    /// dropped — never fatal, never replied to.
    pub fn process_line(&mut self, line: &str) {
        match Message::from_json(line) {
            Ok(msg) => self.process(msg),
            Err(err) => warn!(error = %err, "dropping malformed envelope"),
        }
    }

    /// Processes one parsed envelope.
    pub fn process(&mut self, msg: Message) {
        match &msg.body.payload {
            Payload::Init { node_id, node_ids } => {
                self.handle_init(&msg, node_id.clone(), node_ids.clone());
            }
            Payload::Echo { echo } => {
                let echo = echo.clone();
                self.reply(&msg, Payload::EchoOk { echo });
            }
            Payload::Generate => {
                let id = Uuid::new_v4().to_string();
                self.reply(&msg, Payload::GenerateOk { id });
            }
            _ => match &self.service {
                Some(service) => service.handle(&msg),
                None => warn!(
                    kind = msg.body.payload.kind(),
                    src = %msg.src,
                    "dropping message received before init"
                ),
            },
        }
    }

    fn handle_init(&mut self, msg: &Message, node_id: NodeId, node_ids: Vec<NodeId>) {
        if self.service.is_some() {
            warn!(src = %msg.src, "ignoring duplicate init");
            return;
        }

        let transport = Arc::new(StdoutTransport::new(node_id.clone(), self.out.clone()));
        let service = Arc::new(BroadcastService::new(
            node_id.clone(),
            node_ids,
            self.gossip.clone(),
            Arc::clone(&transport) as Arc<dyn Transport>,
        ));

        info!(node = %node_id, "node initialized");
        transport.send(&msg.src, Body::reply(msg.body.msg_id, Payload::InitOk));

        self.transport = Some(transport);
        self.service = Some(service);
    }

    fn reply(&self, msg: &Message, payload: Payload) {
        match &self.transport {
            Some(transport) => {
                transport.send(&msg.src, Body::reply(msg.body.msg_id, payload));
            }
            None => warn!(
                kind = msg.body.payload.kind(),
                src = %msg.src,
                "dropping request received before init"
            ),
        }
    }
}
