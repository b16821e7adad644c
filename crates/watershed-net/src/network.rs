//! Network wiring: builds the node and channel tasks from a topology and
//! exposes administrative link control plus the snapshot surface.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::watch;
use tracing::{debug, info};
use watershed_height::NodeId;

use crate::channel::{AdminCmd, Channel, Packet};
use crate::error::{NetworkError, Result};
use crate::node::NodeActor;
use crate::snapshot::{NetworkSnapshot, NodeSnapshot};

/// Default bound on the local-leader search radius.
pub const DEFAULT_MAX_HOPS: u32 = 2;

/// Default per-channel forwarding cadence.
pub const DEFAULT_FORWARD_INTERVAL: Duration = Duration::from_millis(50);

/// Topology and seeding for a [`Network`].
///
/// `adjacency[i][j] == 1` means an undirected edge between nodes `i` and
/// `j`. Deltas give each node's starting hop distance to its seeded leader.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub adjacency: Vec<Vec<u8>>,
    pub global_leader: NodeId,
    pub global_deltas: Vec<i64>,
    pub local_leaders: Vec<NodeId>,
    pub local_deltas: Vec<i64>,
    pub max_hops: u32,
    pub forward_interval: Duration,
}

impl NetworkConfig {
    /// Config with one node seeded as both global and local leader for
    /// everyone. Local scope mirrors the global seeding; override it with
    /// [`with_local_leaders`](Self::with_local_leaders).
    pub fn new(adjacency: Vec<Vec<u8>>, global_leader: NodeId, global_deltas: Vec<i64>) -> Self {
        let n = global_deltas.len();
        Self {
            adjacency,
            global_leader,
            local_leaders: vec![global_leader; n],
            local_deltas: global_deltas.clone(),
            global_deltas,
            max_hops: DEFAULT_MAX_HOPS,
            forward_interval: DEFAULT_FORWARD_INTERVAL,
        }
    }

    /// Seed per-node local leaders distinct from the global one.
    #[must_use]
    pub fn with_local_leaders(mut self, leaders: Vec<NodeId>, deltas: Vec<i64>) -> Self {
        self.local_leaders = leaders;
        self.local_deltas = deltas;
        self
    }

    /// Set the local-leader search radius.
    #[must_use]
    pub fn with_max_hops(mut self, max_hops: u32) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Set the per-channel forwarding cadence.
    #[must_use]
    pub fn with_forward_interval(mut self, interval: Duration) -> Self {
        self.forward_interval = interval;
        self
    }

    /// Check shape and ranges, returning the node count.
    fn validate(&self) -> Result<usize> {
        let n = self.adjacency.len();
        if n == 0 {
            return Err(NetworkError::EmptyTopology);
        }
        for (row, entries) in self.adjacency.iter().enumerate() {
            if entries.len() != n {
                return Err(NetworkError::NotSquare {
                    row,
                    len: entries.len(),
                    expected: n,
                });
            }
        }
        for i in 0..n {
            if self.adjacency[i][i] != 0 {
                return Err(NetworkError::SelfLoop(i));
            }
            for j in (i + 1)..n {
                if self.adjacency[i][j] != self.adjacency[j][i] {
                    return Err(NetworkError::Asymmetric { i, j });
                }
            }
        }
        for (field, len) in [
            ("global_deltas", self.global_deltas.len()),
            ("local_leaders", self.local_leaders.len()),
            ("local_deltas", self.local_deltas.len()),
        ] {
            if len != n {
                return Err(NetworkError::SizeMismatch {
                    field,
                    expected: n,
                    actual: len,
                });
            }
        }
        if self.global_leader.index() >= n {
            return Err(NetworkError::NodeOutOfRange(self.global_leader.0, n));
        }
        for leader in &self.local_leaders {
            if leader.index() >= n {
                return Err(NetworkError::NodeOutOfRange(leader.0, n));
            }
        }
        Ok(n)
    }
}

/// A running network of node and channel tasks.
///
/// Every directed pair gets a channel task regardless of the initial
/// topology; edges absent from the adjacency matrix simply start (and stay)
/// down until [`remake_channel`](Self::remake_channel) raises them. Dropping
/// the `Network` closes the administrative side of every channel, which
/// unwinds all tasks.
pub struct Network {
    admin: HashMap<(NodeId, NodeId), UnboundedSender<AdminCmd>>,
    observers: Vec<watch::Receiver<NodeSnapshot>>,
}

impl Network {
    /// Validate `config`, spawn all tasks and deliver the bootstrap
    /// `SetUp` exchange over every edge of the topology.
    pub fn spawn(config: NetworkConfig) -> Result<Self> {
        let n = config.validate()?;
        info!(nodes = n, max_hops = config.max_hops, "starting network");

        let cores: Vec<watershed_election::Node> = (0..n)
            .map(|i| {
                watershed_election::Node::new(
                    NodeId(i as u32),
                    config.max_hops,
                    config.global_deltas[i],
                    config.global_leader,
                    config.local_deltas[i],
                    config.local_leaders[i],
                )
            })
            .collect();
        let heights: Vec<_> = cores.iter().map(|c| c.height()).collect();

        let mut event_txs = Vec::with_capacity(n);
        let mut event_rxs = Vec::with_capacity(n);
        for _ in 0..n {
            let (tx, rx) = mpsc::unbounded_channel();
            event_txs.push(tx);
            event_rxs.push(rx);
        }

        // One channel task per directed pair, all starting down.
        let mut admin = HashMap::new();
        let mut outgoing: Vec<HashMap<NodeId, UnboundedSender<Packet>>> =
            (0..n).map(|_| HashMap::new()).collect();
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let (admin_tx, admin_rx) = mpsc::unbounded_channel();
                let (packet_tx, packet_rx) = mpsc::unbounded_channel();
                let channel = Channel::new(
                    NodeId(i as u32),
                    NodeId(j as u32),
                    config.forward_interval,
                    admin_rx,
                    packet_rx,
                    event_txs[j].clone(),
                );
                tokio::spawn(channel.run());
                admin.insert((NodeId(i as u32), NodeId(j as u32)), admin_tx);
                outgoing[i].insert(NodeId(j as u32), packet_tx);
            }
        }
        // Channels hold the only lasting clones of the node mailboxes.
        drop(event_txs);

        let mut observers = Vec::with_capacity(n);
        for ((core, inbox), routes) in cores.into_iter().zip(event_rxs).zip(outgoing) {
            let (watch_tx, watch_rx) = watch::channel(NodeSnapshot::capture(&core));
            observers.push(watch_rx);
            let actor = NodeActor::new(core, inbox, routes, watch_tx);
            tokio::spawn(actor.run());
        }

        let network = Self { admin, observers };
        // Bootstrap height exchange, before any other traffic.
        for i in 0..n {
            for j in 0..n {
                if config.adjacency[i][j] == 1 {
                    network.send_admin(
                        NodeId(i as u32),
                        NodeId(j as u32),
                        AdminCmd::SetUp {
                            timestamp: 0,
                            height: heights[i],
                        },
                    );
                }
            }
        }
        Ok(network)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.observers.len()
    }

    /// Cut both directions of the edge between `a` and `b`.
    pub fn drop_channel(&self, a: NodeId, b: NodeId) -> Result<()> {
        let (a, b) = self.edge(a, b)?;
        debug!(%a, %b, "dropping channel pair");
        self.send_admin(a, b, AdminCmd::Down { timestamp: 0 });
        self.send_admin(b, a, AdminCmd::Down { timestamp: 0 });
        Ok(())
    }

    /// Raise both directions of the edge between `a` and `b`.
    pub fn remake_channel(&self, a: NodeId, b: NodeId) -> Result<()> {
        let (a, b) = self.edge(a, b)?;
        debug!(%a, %b, "remaking channel pair");
        self.send_admin(a, b, AdminCmd::Up { timestamp: 0 });
        self.send_admin(b, a, AdminCmd::Up { timestamp: 0 });
        Ok(())
    }

    /// Latest published state of one node.
    pub fn snapshot(&self, node: NodeId) -> Result<NodeSnapshot> {
        self.observers
            .get(node.index())
            .map(|rx| rx.borrow().clone())
            .ok_or(NetworkError::NodeOutOfRange(node.0, self.node_count()))
    }

    /// Latest published state of every node.
    pub fn snapshot_all(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            nodes: self.observers.iter().map(|rx| rx.borrow().clone()).collect(),
        }
    }

    /// Watch one node's state changes, e.g. to await convergence.
    pub fn observe(&self, node: NodeId) -> Result<watch::Receiver<NodeSnapshot>> {
        self.observers
            .get(node.index())
            .cloned()
            .ok_or(NetworkError::NodeOutOfRange(node.0, self.node_count()))
    }

    fn edge(&self, a: NodeId, b: NodeId) -> Result<(NodeId, NodeId)> {
        let n = self.node_count();
        for id in [a, b] {
            if id.index() >= n {
                return Err(NetworkError::NodeOutOfRange(id.0, n));
            }
        }
        if a == b {
            return Err(NetworkError::SelfLoop(a.index()));
        }
        Ok((a, b))
    }

    fn send_admin(&self, from: NodeId, to: NodeId, cmd: AdminCmd) {
        if let Some(tx) = self.admin.get(&(from, to)) {
            // Only fails once the channel task has unwound during teardown.
            let _ = tx.send(cmd);
        }
    }
}
