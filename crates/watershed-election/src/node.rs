//! The per-node election state machine.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};
use watershed_height::{Height, NodeId, ReferenceLevel};

use crate::{Event, Outbound};

/// One node of the network.
///
/// Owns its authoritative [`Height`], the cached heights of every peer it has
/// heard from, the forming/neighbor link sets and a Lamport clock. All
/// behavior is case analysis over height comparisons; there is no separate
/// state enum.
///
/// The struct is deliberately runtime-free: [`Node::handle`] is a pure-ish
/// transition (it mutates `self`, nothing else) returning the updates to
/// send, so the same core runs under tokio actors and under deterministic
/// test harnesses.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    /// Bound on how far a local-leader search may travel before reflecting.
    max_hops: u32,
    /// Links that are up but have not delivered a height yet.
    forming: BTreeSet<NodeId>,
    /// Links confirmed by at least one height exchange. Disjoint from `forming`.
    neighbors: BTreeSet<NodeId>,
    global_leader: NodeId,
    local_leader: NodeId,
    /// Lamport clock; advanced on every received event and every send.
    clock: i64,
    /// This node's own authoritative height.
    height: Height,
    /// Last known height per peer. Absent = unknown or forgotten.
    peer_heights: BTreeMap<NodeId, Height>,
}

impl Node {
    /// Create a node from an initial configuration.
    ///
    /// `global_delta` / `local_delta` are the hop distances to the seeded
    /// leaders in the starting topology.
    pub fn new(
        id: NodeId,
        max_hops: u32,
        global_delta: i64,
        global_leader: NodeId,
        local_delta: i64,
        local_leader: NodeId,
    ) -> Self {
        let height = Height::initial(global_delta, global_leader, local_delta, local_leader, id);
        debug!(node = %id, %height, "created node");
        Self {
            id,
            max_hops,
            forming: BTreeSet::new(),
            neighbors: BTreeSet::new(),
            global_leader,
            local_leader,
            clock: 0,
            height,
            peer_heights: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn height(&self) -> Height {
        self.height
    }

    pub fn global_leader(&self) -> NodeId {
        self.global_leader
    }

    pub fn local_leader(&self) -> NodeId {
        self.local_leader
    }

    pub fn clock(&self) -> i64 {
        self.clock
    }

    pub fn max_hops(&self) -> u32 {
        self.max_hops
    }

    /// Links that are up but not yet height-confirmed.
    pub fn forming(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.forming.iter().copied()
    }

    /// Height-confirmed links.
    pub fn neighbors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.neighbors.iter().copied()
    }

    /// Cached peer heights, keyed by peer id.
    pub fn peer_heights(&self) -> &BTreeMap<NodeId, Height> {
        &self.peer_heights
    }

    /// React to one event, returning the updates to send.
    ///
    /// Advances the Lamport clock first; unrecognized situations (e.g. an
    /// update from a peer this node has no link to) degrade to no-ops rather
    /// than errors.
    pub fn handle(&mut self, event: Event) -> Vec<Outbound> {
        self.clock = self.clock.max(event.timestamp()) + 1;
        trace!(node = %self.id, ?event, clock = self.clock, "handling event");
        match event {
            Event::SetUp { peer, height, .. } => self.on_set_up(peer, height),
            Event::ChannelUp { peer, .. } => self.on_channel_up(peer),
            Event::ChannelDown { peer, .. } => self.on_channel_down(peer),
            Event::Update { height, .. } => self.on_update(height),
        }
    }

    /// Bootstrap: the peer is immediately a confirmed neighbor.
    fn on_set_up(&mut self, peer: NodeId, height: Height) -> Vec<Outbound> {
        self.add_forming(peer);
        self.promote(peer);
        self.peer_heights.insert(peer, height);
        Vec::new()
    }

    /// A link came up: remember it and offer our height. The peer is only
    /// promoted to a neighbor once it answers with a height of its own.
    fn on_channel_up(&mut self, peer: NodeId) -> Vec<Outbound> {
        self.add_forming(peer);
        vec![self.send_to(peer)]
    }

    /// A link went down: forget the peer, then check whether we lost our
    /// last path toward the leader.
    fn on_channel_down(&mut self, peer: NodeId) -> Vec<Outbound> {
        self.forming.remove(&peer);
        self.neighbors.remove(&peer);
        self.peer_heights.remove(&peer);

        if self.neighbors.is_empty() && self.id != self.global_leader {
            debug!(node = %self.id, "no neighbors left, electing self");
            self.elect_self_global();
            self.broadcast(self.forming.iter().copied().collect())
        } else if self.is_sink() {
            if self.id == self.local_leader {
                debug!(node = %self.id, "sink and local leader, starting global search");
                self.height.start_global_search(self.clock, self.id);
            } else {
                debug!(node = %self.id, "sink, starting local search");
                self.height.start_local_search(self.clock, self.id);
            }
            self.broadcast(self.known_links())
        } else {
            Vec::new()
        }
    }

    /// A neighbor's height arrived: cache it, then run the case analysis
    /// over leader agreement. Any change to our own height is broadcast.
    fn on_update(&mut self, h: Height) -> Vec<Outbound> {
        let peer = h.node;
        self.peer_heights.insert(peer, h);
        self.promote(peer);

        let old = self.height;
        let mut out = Vec::new();

        if old.global == h.global {
            if old.local == h.local {
                if self.is_sink() {
                    self.run_search_step(h);
                }
            } else if self.id != self.local_leader && !self.local_leader_in_reach() {
                debug!(node = %self.id, "no local leader within reach, electing self locally");
                self.elect_self_local();
            } else {
                out.extend(self.adopt_local_if_priority(peer));
            }
        } else {
            out.extend(self.adopt_global_if_priority(peer));
        }

        if self.height != old {
            out.extend(self.broadcast(self.known_links()));
        }
        out
    }

    /// The sink half of the algorithm: reflect, relaunch or relax the
    /// current search wave. Both leaders already agree with the sender here.
    fn run_search_step(&mut self, h: Height) {
        if !h.rl.reflected && h.rl.local_hops > self.max_hops {
            // The local search traveled too far without finding a leader.
            debug!(node = %self.id, rl = %h.rl, "hop limit hit, reflecting wave");
            self.height.reflect(h.rl);
        } else if self.id == self.local_leader && h.rl.local_hops > 0 {
            // A local-scope wave reached the local leader itself.
            debug!(node = %self.id, "local wave reached local leader, searching globally");
            self.height.start_global_search(self.clock, self.id);
        } else if self.all_peers_share_rl(h.rl) {
            let rl = h.rl;
            if rl.is_active() && !rl.reflected {
                // Dead end on a live wave: bounce it back.
                debug!(node = %self.id, rl = %rl, "dead end, reflecting wave");
                self.height.reflect(rl);
            } else if rl.is_active() && rl.reflected && rl.origin == self.id {
                // Our own reflected wave came home: the component has no
                // reachable leader, so we become one.
                if rl.local_hops == 0 {
                    debug!(node = %self.id, "reflected global wave returned, electing self");
                    self.elect_self_global();
                } else {
                    debug!(node = %self.id, "reflected local wave returned, electing self locally");
                    self.elect_self_local();
                }
            } else if self.id == self.local_leader {
                debug!(node = %self.id, "stale wave, starting fresh global search");
                self.height.start_global_search(self.clock, self.id);
            } else {
                debug!(node = %self.id, "stale wave, starting fresh local search");
                self.height.start_local_search(self.clock, self.id);
            }
        } else {
            self.propagate_largest_rl();
        }
    }

    fn add_forming(&mut self, peer: NodeId) {
        // Keep forming/neighbors disjoint: a confirmed neighbor never
        // re-enters forming.
        if !self.neighbors.contains(&peer) {
            self.forming.insert(peer);
        }
    }

    /// Promote a peer from forming to neighbors once a height arrived.
    fn promote(&mut self, peer: NodeId) {
        if self.forming.remove(&peer) {
            self.neighbors.insert(peer);
        }
    }

    /// A sink has no downhill edge left toward the global leader: it is not
    /// the leader itself, and every cached peer agrees on the global leader
    /// while sitting strictly above us.
    fn is_sink(&self) -> bool {
        if self.id == self.global_leader {
            return false;
        }
        self.peer_heights
            .values()
            .all(|h| h.global == self.height.global && self.height < *h)
    }

    /// Does any peer report a local leader within `max_hops` of us?
    fn local_leader_in_reach(&self) -> bool {
        self.peer_heights
            .values()
            .any(|h| h.local_delta >= 0 && h.local_delta + 1 <= i64::from(self.max_hops))
    }

    fn all_peers_share_rl(&self, rl: ReferenceLevel) -> bool {
        self.peer_heights.values().all(|h| h.rl == rl)
    }

    /// Neighbors disagree on the wave: adopt the largest reference level
    /// seen and relax our delta one step below the smallest delta reported
    /// for that level (distance relaxation in the implicit DAG).
    fn propagate_largest_rl(&mut self) {
        let mut rl = ReferenceLevel::none();
        for h in self.peer_heights.values() {
            if h.rl > rl {
                rl = h.rl;
            }
        }

        let mut gdelta = 0;
        let mut ldelta = 0;
        for h in self.peer_heights.values() {
            if h.rl == rl {
                gdelta = gdelta.min(h.global_delta);
                ldelta = ldelta.min(h.local_delta);
            }
        }

        debug!(node = %self.id, rl = %rl, "propagating largest reference level");
        self.height.rl = rl;
        if rl.local_hops > 0 {
            self.height.rl.local_hops += 1;
            self.height.local_delta = ldelta - 1;
        } else {
            self.height.global_delta = gdelta - 1;
        }
    }

    fn elect_self_global(&mut self) {
        self.height.elect_global(self.clock, self.id);
        self.global_leader = self.id;
        self.local_leader = self.id;
        debug!(node = %self.id, clock = self.clock, "elected self global leader");
    }

    fn elect_self_local(&mut self) {
        self.height.elect_local(self.clock, self.id);
        self.local_leader = self.id;
        debug!(node = %self.id, clock = self.clock, "elected self local leader");
    }

    /// Adopt the neighbor's global leader if it was elected more recently
    /// (smaller pair); otherwise echo our own height back so the neighbor
    /// hears the better leadership.
    fn adopt_global_if_priority(&mut self, peer: NodeId) -> Vec<Outbound> {
        let Some(h) = self.peer_heights.get(&peer).copied() else {
            return Vec::new();
        };
        if h.global < self.height.global {
            debug!(node = %self.id, leader = %h.global.leader, "adopting global leader");
            self.height = h;
            self.height.global_delta += 1;
            self.height.local_delta += 1;
            self.height.node = self.id;
            self.global_leader = h.global.leader;
            Vec::new()
        } else {
            vec![self.send_to(peer)]
        }
    }

    /// Adopt the neighbor's local leader only when it yields a strictly
    /// better combination: closer to the local leader first, then closer to
    /// the global leader, then higher pair priority. Peers whose distances
    /// are still unknown get an echo instead.
    fn adopt_local_if_priority(&mut self, peer: NodeId) -> Vec<Outbound> {
        let Some(h) = self.peer_heights.get(&peer).copied() else {
            return Vec::new();
        };
        if h.local_delta >= 0 && h.global_delta >= 0 {
            let mine = self.height;
            let better = mine.local_delta < 0
                || h.local_delta + 1 < mine.local_delta
                || (h.local_delta + 1 == mine.local_delta
                    && h.global_delta + 1 < mine.global_delta)
                || (h.local_delta + 1 == mine.local_delta
                    && h.global_delta + 1 == mine.global_delta
                    && h.local < mine.local);
            if better {
                debug!(node = %self.id, leader = %h.local.leader, "adopting local leader");
                self.height = h;
                self.height.global_delta += 1;
                self.height.local_delta += 1;
                self.height.node = self.id;
            }
            Vec::new()
        } else {
            vec![self.send_to(peer)]
        }
    }

    /// One send: bump the clock and stamp the current height.
    fn send_to(&mut self, to: NodeId) -> Outbound {
        self.clock += 1;
        Outbound {
            to,
            timestamp: self.clock,
            height: self.height,
        }
    }

    fn broadcast(&mut self, targets: Vec<NodeId>) -> Vec<Outbound> {
        targets.into_iter().map(|to| self.send_to(to)).collect()
    }

    /// Everyone we have link contact with: neighbors plus forming.
    fn known_links(&self) -> Vec<NodeId> {
        self.neighbors.iter().chain(self.forming.iter()).copied().collect()
    }
}
