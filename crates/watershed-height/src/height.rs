//! The full per-node height and its transition operations.

use std::cmp::Ordering;

use crate::{LeaderPair, NodeId, ReferenceLevel, UNKNOWN_DELTA};

/// Comparable per-node state.
///
/// Links are oriented from the higher endpoint toward the lower one, so the
/// leaders sit at the bottom of the order and every node's outgoing edges
/// lead downhill toward them. The owning node's id is the last component,
/// which guarantees a strict total order across distinct nodes even when all
/// other fields agree.
///
/// `Height` is `Copy`: every cross-node exchange is a value copy, so a
/// receiver can never alias a sender's state.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Height {
    /// Current search wave, if any.
    pub rl: ReferenceLevel,
    /// Orients links toward the global leader; hop count once converged.
    pub global_delta: i64,
    /// Identity of the global leader.
    pub global: LeaderPair,
    /// Orients links toward the local leader; hop count once converged.
    /// Negative means "unknown / unbounded" ([`UNKNOWN_DELTA`]).
    pub local_delta: i64,
    /// Identity of the local leader.
    pub local: LeaderPair,
    /// The node owning this height.
    pub node: NodeId,
}

impl Height {
    /// Height for an initial configuration: no search in progress, leaders
    /// seeded as if elected at causal time 1.
    pub fn initial(
        global_delta: i64,
        global_leader: NodeId,
        local_delta: i64,
        local_leader: NodeId,
        node: NodeId,
    ) -> Self {
        Self {
            rl: ReferenceLevel::none(),
            global_delta,
            global: LeaderPair::new(-1, global_leader),
            local_delta,
            local: LeaderPair::new(-1, local_leader),
            node,
        }
    }

    /// Elect `leader` as global leader at causal time `timestamp`.
    ///
    /// Clears any search in progress. When the new global leader differs
    /// from the current local leader the election cascades to the local
    /// scope as well.
    pub fn elect_global(&mut self, timestamp: i64, leader: NodeId) {
        self.rl = ReferenceLevel::none();
        self.global = LeaderPair::elected(timestamp, leader);
        self.global_delta = 0;
        if self.global.leader != self.local.leader {
            self.elect_local(timestamp, leader);
        }
    }

    /// Elect `leader` as local leader at causal time `timestamp`.
    pub fn elect_local(&mut self, timestamp: i64, leader: NodeId) {
        self.rl = ReferenceLevel::none();
        self.local = LeaderPair::elected(timestamp, leader);
        self.local_delta = 0;
    }

    /// Launch a global-scope search wave from `origin`.
    pub fn start_global_search(&mut self, timestamp: i64, origin: NodeId) {
        self.rl = ReferenceLevel::new(timestamp, origin, 0);
        self.global_delta = 0;
    }

    /// Launch a local-scope search wave from `origin`.
    ///
    /// The local distance becomes unknown until the wave resolves.
    pub fn start_local_search(&mut self, timestamp: i64, origin: NodeId) {
        self.rl = ReferenceLevel::new(timestamp, origin, 1);
        self.local_delta = UNKNOWN_DELTA;
    }

    /// Bounce the *incoming* wave back toward its origin.
    ///
    /// A wave reflecting at global scope resets the global distance; one
    /// reflecting at local scope leaves the local distance unknown.
    pub fn reflect(&mut self, incoming: ReferenceLevel) {
        self.rl = incoming.reflected();
        if self.rl.local_hops == 0 {
            self.global_delta = 0;
        } else {
            self.local_delta = UNKNOWN_DELTA;
        }
    }
}

impl Ord for Height {
    /// Lexicographic over all six components, reference level first.
    fn cmp(&self, other: &Self) -> Ordering {
        self.rl
            .cmp(&other.rl)
            .then(self.global_delta.cmp(&other.global_delta))
            .then(self.global.cmp(&other.global))
            .then(self.local_delta.cmp(&other.local_delta))
            .then(self.local.cmp(&other.local))
            .then(self.node.cmp(&other.node))
    }
}

impl PartialOrd for Height {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Height {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Height {}

impl std::fmt::Display for Height {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({},{},{},{},{},{})",
            self.rl, self.global_delta, self.global, self.local_delta, self.local, self.node.0
        )
    }
}
