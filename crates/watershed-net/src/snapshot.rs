//! Read-only observation surface.
//!
//! Snapshots are value copies published by each node actor after every
//! event; presentation layers render them without ever touching live node
//! state.

use serde::Serialize;
use watershed_height::{Height, NodeId};

/// Point-in-time copy of one node's observable state.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub node: NodeId,
    pub height: Height,
    pub global_leader: NodeId,
    pub local_leader: NodeId,
    pub clock: i64,
    /// Confirmed links, ascending by peer id.
    pub neighbors: Vec<NodeId>,
    /// Links known but not yet height-confirmed.
    pub forming: Vec<NodeId>,
    /// Cached heights of every peer heard from, ascending by peer id.
    pub peer_heights: Vec<(NodeId, Height)>,
}

impl NodeSnapshot {
    pub(crate) fn capture(core: &watershed_election::Node) -> Self {
        Self {
            node: core.id(),
            height: core.height(),
            global_leader: core.global_leader(),
            local_leader: core.local_leader(),
            clock: core.clock(),
            neighbors: core.neighbors().collect(),
            forming: core.forming().collect(),
            peer_heights: core.peer_heights().iter().map(|(&id, &h)| (id, h)).collect(),
        }
    }
}

/// Snapshots of every node, in id order.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkSnapshot {
    pub nodes: Vec<NodeSnapshot>,
}

impl NetworkSnapshot {
    /// True when every node reports the same global leader.
    pub fn agreed_global_leader(&self) -> Option<NodeId> {
        let first = self.nodes.first()?.height.global.leader;
        self.nodes
            .iter()
            .all(|n| n.height.global.leader == first)
            .then_some(first)
    }

    /// Pretty JSON for logs and dashboards.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
