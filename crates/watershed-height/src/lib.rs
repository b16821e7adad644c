//! Watershed height model
//!
//! Per-node comparable state for the self-stabilizing leader election
//! protocol. Every node carries a [`Height`]; links between nodes are
//! implicitly directed from the higher endpoint to the lower one, so the
//! network relaxes into a DAG flowing downhill toward the leaders.
//!
//! # Components
//!
//! - [`ReferenceLevel`] identifies one instance of a leader-search wave and
//!   whether it has bounced back toward its origin.
//! - [`LeaderPair`] identifies a leader with a total priority order: the most
//!   recently elected leader wins, ties broken by the smaller node id.
//! - [`Height`] combines both with hop distances to the global and local
//!   leaders, totally ordered with the owning node's id as final tiebreak.
//!
//! # Ordering Laws
//!
//! All three orders are total. Two quirks are deliberate and load-bearing for
//! the protocol:
//!
//! - `LeaderPair` stores the *negated* election timestamp so that the most
//!   recent election compares smallest ("smaller = more authoritative").
//! - `ReferenceLevel` collapses all positive `local_hops` values into one
//!   equivalence class: a local-scope wave compares equal no matter how far
//!   it has traveled, while `local_hops == 0` (global scope) sorts below any
//!   positive count.
//!
//! The laws are exercised by proptest suites in this crate.

mod height;
mod leader_pair;
mod reference_level;

pub use height::Height;
pub use leader_pair::LeaderPair;
pub use reference_level::ReferenceLevel;

/// Sentinel for "local leader distance unknown / unbounded".
///
/// Any negative delta means "no bound yet"; all distance comparisons treat it
/// as worse than every real distance.
pub const UNKNOWN_DELTA: i64 = -1;

/// Identifier of a node in the network.
///
/// Doubles as the final tiebreak in every ordering, which is what makes the
/// orders total across distinct nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    /// Index into per-node tables (adjacency rows, snapshot vectors).
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}
