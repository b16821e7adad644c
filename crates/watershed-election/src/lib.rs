//! Watershed election core
//!
//! The per-node state machine of the self-stabilizing leader election and
//! height-labeling protocol, kept free of any runtime concerns: a [`Node`]
//! consumes [`Event`]s one at a time and returns the [`Outbound`] updates its
//! reaction produced. Transport, timers and mailboxes live in
//! `watershed-net`; deterministic tests can drive this core directly.
//!
//! # Protocol Sketch
//!
//! Every node labels itself with a totally ordered
//! [`Height`](watershed_height::Height). Links are implicitly directed from
//! the higher endpoint to the lower, so a converged network is a DAG flowing
//! downhill toward a single network-wide leader, with a second, locally
//! scoped leader within a bounded hop radius of every node.
//!
//! A node that loses its last downhill edge (a *sink*) launches a search
//! wave, identified by a fresh reference level. Waves propagate uphill,
//! reflect at dead ends or at the hop limit, and when a reflected wave
//! returns to its origin, that node elects itself. Elections carry the
//! causal clock so that the most recent election wins everywhere it is
//! heard; finite sequences of link failures, repairs and leader changes are
//! re-absorbed without central coordination.
//!
//! # Events
//!
//! - `SetUp` bootstraps a link with the peer's initial height.
//! - `ChannelUp` / `ChannelDown` report link repair and failure.
//! - `Update` carries a neighbor's current height.
//!
//! Every inbound event advances the node's Lamport clock; every emitted
//! update advances it again.

mod event;
mod node;

pub use event::{Event, Outbound};
pub use node::Node;
