//! Fan-out and retry-driven gossip propagation.

use std::sync::Arc;
use tracing::{debug, trace};

use rumor_proto::{Body, NodeId, Payload, Value};

use crate::config::GossipConfig;
use crate::retry::RetryRegistry;
use crate::topology::TopologyManager;
use crate::transport::Transport;

/// Disseminates newly observed values to the current neighbor set.
///
/// Each (neighbor, value) pair runs an independent state machine: a
/// registry entry is created at fan-out time and an independent retry task
/// re-sends the value until the entry disappears — resolved by an
/// acknowledgement (or by receiving the same value back from that
/// neighbor), or abandoned by a topology change. Retries continue
/// indefinitely; partitions may be long-lived and must eventually heal.
#[derive(Clone)]
pub struct GossipDisseminator {
    topology: Arc<TopologyManager>,
    registry: Arc<RetryRegistry>,
    transport: Arc<dyn Transport>,
    config: GossipConfig,
}

impl GossipDisseminator {
    /// Creates a disseminator over the given components.
    #[must_use]
    pub fn new(
        topology: Arc<TopologyManager>,
        registry: Arc<RetryRegistry>,
        transport: Arc<dyn Transport>,
        config: GossipConfig,
    ) -> Self {
        Self {
            topology,
            registry,
            transport,
            config,
        }
    }

    /// Returns the retry configuration.
    #[must_use]
    pub const fn config(&self) -> &GossipConfig {
        &self.config
    }

    /// Starts dissemination of a newly observed value to every current
    /// neighbor except `exclude` (the peer that delivered it this round).
    ///
    /// Must only be called for values the store reported as new; known
    /// values are never re-disseminated. Returns how many retry loops were
    /// started.
    pub fn fan_out(&self, value: &Value, exclude: Option<&NodeId>) -> usize {
        let mut started = 0;
        for neighbor in self.topology.neighbors() {
            if Some(&neighbor) == exclude {
                continue;
            }
            if !self.registry.insert(neighbor.clone(), value.clone()) {
                continue;
            }
            self.spawn_retry_loop(neighbor, value.clone());
            started += 1;
        }
        debug!(%value, started, "fan-out");
        started
    }

    /// Records an acknowledgement for (neighbor, value), stopping its
    /// retry loop. Returns whether a send was outstanding.
    pub fn acknowledge(&self, neighbor: &NodeId, value: &Value) -> bool {
        let resolved = self.registry.resolve(neighbor, value);
        if resolved {
            trace!(%neighbor, %value, "gossip acknowledged");
        }
        resolved
    }

    /// Abandons pending sends to neighbors outside the current topology.
    pub fn abandon_departed(&self) -> usize {
        let current = self.topology.neighbor_set();
        let abandoned = self.registry.retain_neighbors(&current);
        if abandoned > 0 {
            debug!(abandoned, "abandoned pending gossip to departed neighbors");
        }
        abandoned
    }

    /// Spawns the per-pair retry loop.
    ///
    /// The loop checks entry presence and topology membership before every
    /// send: once the entry is resolved or abandoned, or the neighbor
    /// leaves the topology, the next wake-up exits without sending.
    fn spawn_retry_loop(&self, neighbor: NodeId, value: Value) {
        let topology = Arc::clone(&self.topology);
        let registry = Arc::clone(&self.registry);
        let transport = Arc::clone(&self.transport);
        let config = self.config.clone();

        tokio::spawn(async move {
            loop {
                let Some(delay) = registry.begin_attempt(&neighbor, &value, &config) else {
                    break;
                };
                if !topology.is_neighbor(&neighbor) {
                    // A topology update can land between the fan-out's
                    // neighbor read and its registry insert; the entry then
                    // outlives the abandon pass and must be dropped here.
                    registry.resolve(&neighbor, &value);
                    debug!(%neighbor, %value, "abandoning gossip to departed neighbor");
                    break;
                }
                trace!(%neighbor, %value, "sending gossip");
                transport.send(
                    &neighbor,
                    Body::new(Payload::Gossip {
                        message: value.clone(),
                    }),
                );
                tokio::time::sleep(delay).await;
            }
            trace!(%neighbor, %value, "retry loop finished");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::RecordingTransport;
    use std::collections::HashMap;
    use std::time::Duration;

    fn n(id: &str) -> NodeId {
        NodeId::new(id)
    }

    fn fast_config() -> GossipConfig {
        GossipConfig::default()
            .with_retry_base(Duration::from_millis(10))
            .with_retry_max(Duration::from_millis(20))
            .with_jitter(0.0)
    }

    struct Fixture {
        topology: Arc<TopologyManager>,
        registry: Arc<RetryRegistry>,
        transport: Arc<RecordingTransport>,
        disseminator: GossipDisseminator,
    }

    fn fixture(neighbors: &[&str]) -> Fixture {
        let topology = Arc::new(TopologyManager::new(n("n1")));
        let cluster: Vec<NodeId> = ["n1", "n2", "n3", "n4"].iter().map(|s| n(s)).collect();
        topology.set_cluster(cluster);

        let map: HashMap<NodeId, Vec<NodeId>> = [(
            n("n1"),
            neighbors.iter().map(|s| n(s)).collect::<Vec<_>>(),
        )]
        .into_iter()
        .collect();
        topology.set_topology(&map).expect("valid topology");

        let registry = Arc::new(RetryRegistry::new());
        let transport = Arc::new(RecordingTransport::new());
        let disseminator = GossipDisseminator::new(
            Arc::clone(&topology),
            Arc::clone(&registry),
            Arc::clone(&transport) as Arc<dyn Transport>,
            fast_config(),
        );

        Fixture {
            topology,
            registry,
            transport,
            disseminator,
        }
    }

    // ========== Fan-out Tests ==========

    #[tokio::test(flavor = "multi_thread")]
    async fn fan_out_reaches_every_neighbor() {
        let f = fixture(&["n2", "n3"]);

        let started = f.disseminator.fan_out(&Value::Int(5), None);
        assert_eq!(started, 2);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(f.transport.gossip_count_to(&n("n2"), &Value::Int(5)) >= 1);
        assert!(f.transport.gossip_count_to(&n("n3"), &Value::Int(5)) >= 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fan_out_excludes_the_sender() {
        let f = fixture(&["n2", "n3"]);

        f.disseminator.fan_out(&Value::Int(5), Some(&n("n2")));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(f.transport.gossip_count_to(&n("n2"), &Value::Int(5)), 0);
        assert!(f.transport.gossip_count_to(&n("n3"), &Value::Int(5)) >= 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fan_out_is_idempotent_per_pair() {
        let f = fixture(&["n2"]);

        assert_eq!(f.disseminator.fan_out(&Value::Int(5), None), 1);
        // A second fan-out of the same value starts nothing new.
        assert_eq!(f.disseminator.fan_out(&Value::Int(5), None), 0);
        assert_eq!(f.registry.pending_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fan_out_with_no_topology_does_nothing() {
        let topology = Arc::new(TopologyManager::new(n("n1")));
        let registry = Arc::new(RetryRegistry::new());
        let transport = Arc::new(RecordingTransport::new());
        let disseminator = GossipDisseminator::new(
            topology,
            Arc::clone(&registry),
            Arc::clone(&transport) as Arc<dyn Transport>,
            fast_config(),
        );

        assert_eq!(disseminator.fan_out(&Value::Int(5), None), 0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(transport.sent().is_empty());
    }

    // ========== Retry Tests ==========

    #[tokio::test(flavor = "multi_thread")]
    async fn unacked_send_is_retried() {
        let f = fixture(&["n2"]);

        f.disseminator.fan_out(&Value::Int(5), None);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(
            f.transport.gossip_count_to(&n("n2"), &Value::Int(5)) >= 3,
            "expected repeated retries, got {}",
            f.transport.gossip_count_to(&n("n2"), &Value::Int(5))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn acknowledgement_stops_retries() {
        let f = fixture(&["n2"]);

        f.disseminator.fan_out(&Value::Int(5), None);
        tokio::time::sleep(Duration::from_millis(25)).await;

        assert!(f.disseminator.acknowledge(&n("n2"), &Value::Int(5)));

        // Let any in-flight sleep expire, then confirm the count is stable.
        tokio::time::sleep(Duration::from_millis(40)).await;
        let settled = f.transport.gossip_count_to(&n("n2"), &Value::Int(5));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(
            f.transport.gossip_count_to(&n("n2"), &Value::Int(5)),
            settled
        );
        assert_eq!(f.registry.pending_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_acknowledgement_is_noop() {
        let f = fixture(&["n2"]);

        f.disseminator.fan_out(&Value::Int(5), None);
        assert!(f.disseminator.acknowledge(&n("n2"), &Value::Int(5)));
        assert!(!f.disseminator.acknowledge(&n("n2"), &Value::Int(5)));
    }

    // ========== Topology Change Tests ==========

    #[tokio::test(flavor = "multi_thread")]
    async fn departed_neighbor_is_abandoned() {
        let f = fixture(&["n2", "n3"]);

        f.disseminator.fan_out(&Value::Int(5), None);
        assert_eq!(f.registry.pending_count(), 2);

        // n3 leaves the topology.
        let map: HashMap<NodeId, Vec<NodeId>> =
            [(n("n1"), vec![n("n2")])].into_iter().collect();
        f.topology.set_topology(&map).expect("valid topology");

        assert_eq!(f.disseminator.abandon_departed(), 1);
        assert!(f.registry.is_pending(&n("n2"), &Value::Int(5)));
        assert!(!f.registry.is_pending(&n("n3"), &Value::Int(5)));

        // n3's retry loop exits without further sends.
        tokio::time::sleep(Duration::from_millis(40)).await;
        let settled = f.transport.gossip_count_to(&n("n3"), &Value::Int(5));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(
            f.transport.gossip_count_to(&n("n3"), &Value::Int(5)),
            settled
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn retry_stops_for_neighbor_no_longer_in_topology() {
        let f = fixture(&["n2"]);

        f.disseminator.fan_out(&Value::Int(5), None);
        tokio::time::sleep(Duration::from_millis(15)).await;

        // Remove n2 without the abandon pass, as happens when a topology
        // update lands between a concurrent fan-out's neighbor read and
        // its registry insert: the entry survives the change.
        assert!(f.registry.is_pending(&n("n2"), &Value::Int(5)));
        let map: HashMap<NodeId, Vec<NodeId>> = [(n("n1"), vec![])].into_iter().collect();
        f.topology.set_topology(&map).expect("valid topology");

        // The retry loop notices the departure, drops the entry, and stops.
        tokio::time::sleep(Duration::from_millis(40)).await;
        let settled = f.transport.gossip_count_to(&n("n2"), &Value::Int(5));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(
            f.transport.gossip_count_to(&n("n2"), &Value::Int(5)),
            settled
        );
        assert!(!f.registry.is_pending(&n("n2"), &Value::Int(5)));
    }
}
