//! Leader pairs: (recency, id) with a total priority order.

use crate::NodeId;

/// Identity of an elected leader.
///
/// Stores the *negation* of the election timestamp so that the most recently
/// elected leader compares smallest, i.e. wins. Ties are broken by the
/// smaller node id. Field order is what makes the derived lexicographic
/// ordering correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeaderPair {
    /// Negated election timestamp; more recent elections are more negative.
    pub negated_timestamp: i64,
    /// The elected node.
    pub leader: NodeId,
}

impl LeaderPair {
    /// Pair for a leader elected at causal time `timestamp`.
    pub const fn elected(timestamp: i64, leader: NodeId) -> Self {
        Self {
            negated_timestamp: -timestamp,
            leader,
        }
    }

    /// Raw constructor used when seeding initial configurations.
    pub const fn new(negated_timestamp: i64, leader: NodeId) -> Self {
        Self {
            negated_timestamp,
            leader,
        }
    }
}

impl std::fmt::Display for LeaderPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.negated_timestamp, self.leader.0)
    }
}
