//! Reference levels: identity and progress of one leader-search wave.

use std::cmp::Ordering;

use crate::NodeId;

/// One instance of a leader search.
///
/// `timestamp` and `origin` identify the wave; `reflected` marks whether the
/// wave has bounced back toward its origin after hitting a dead end or the
/// hop limit. `local_hops` is 0 for a global-scope wave and positive for a
/// local-scope one; the exact positive count feeds the hop limit but is
/// irrelevant for ordering.
///
/// The default value (all zero) means "no search in progress".
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReferenceLevel {
    /// Causal clock reading at the node that launched the wave.
    pub timestamp: i64,
    /// Node that launched the wave.
    pub origin: NodeId,
    /// Whether the wave has bounced back toward its origin.
    pub reflected: bool,
    /// 0 = global-scope wave, positive = local-scope wave.
    pub local_hops: u32,
}

impl ReferenceLevel {
    /// A fresh, unreflected wave.
    pub const fn new(timestamp: i64, origin: NodeId, local_hops: u32) -> Self {
        Self {
            timestamp,
            origin,
            reflected: false,
            local_hops,
        }
    }

    /// The "no search in progress" level.
    pub fn none() -> Self {
        Self::default()
    }

    /// Is this a real wave (as opposed to the default "no search" level)?
    pub fn is_active(&self) -> bool {
        self.timestamp > 0
    }

    /// This wave, marked as bounced back toward its origin.
    #[must_use]
    pub fn reflected(mut self) -> Self {
        self.reflected = true;
        self
    }
}

impl Ord for ReferenceLevel {
    /// Lexicographic over `(timestamp, origin, reflected)`, then hop
    /// collapse: any two positive `local_hops` compare equal, and 0 sorts
    /// below every positive count.
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then(self.origin.cmp(&other.origin))
            .then(self.reflected.cmp(&other.reflected))
            .then((self.local_hops > 0).cmp(&(other.local_hops > 0)))
    }
}

impl PartialOrd for ReferenceLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ReferenceLevel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ReferenceLevel {}

impl std::fmt::Display for ReferenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({},{},{},{})",
            self.timestamp, self.origin.0, self.reflected as u8, self.local_hops
        )
    }
}
