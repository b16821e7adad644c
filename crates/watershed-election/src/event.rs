//! Protocol events and outbound updates.

use watershed_height::{Height, NodeId};

/// An event delivered to a node's mailbox.
///
/// One variant per event kind, all carrying a Lamport timestamp; a node
/// dispatches by variant rather than by downcast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// The link to `peer` came (back) up. No height is known yet.
    ChannelUp { timestamp: i64, peer: NodeId },
    /// The link to `peer` went down; anything in flight was lost.
    ChannelDown { timestamp: i64, peer: NodeId },
    /// Bootstrap: the link to `peer` is up and this is its initial height.
    SetUp {
        timestamp: i64,
        peer: NodeId,
        height: Height,
    },
    /// A neighbor's current height. The sender is `height.node`.
    Update { timestamp: i64, height: Height },
}

impl Event {
    /// The Lamport timestamp carried by every event kind.
    pub fn timestamp(&self) -> i64 {
        match *self {
            Event::ChannelUp { timestamp, .. }
            | Event::ChannelDown { timestamp, .. }
            | Event::SetUp { timestamp, .. }
            | Event::Update { timestamp, .. } => timestamp,
        }
    }
}

/// A height update a node wants delivered to one peer.
///
/// The timestamp is the sender's clock at send time; the transport layer
/// turns this into an [`Event::Update`] on the matching channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outbound {
    /// Receiving peer.
    pub to: NodeId,
    /// Sender's clock at send time.
    pub timestamp: i64,
    /// The sender's height as of this send.
    pub height: Height,
}

impl Outbound {
    /// The equivalent mailbox event on the receiving side.
    pub fn into_event(self) -> Event {
        Event::Update {
            timestamp: self.timestamp,
            height: self.height,
        }
    }
}
