//! Actor-based transport and orchestration for the Watershed election core.
//!
//! Every node and every directed link runs as its own tokio task with a
//! private mailbox; all cross-task communication is one-way message passing.
//! [`Network`] wires the whole thing up from an adjacency matrix, delivers
//! the bootstrap height exchange, and exposes administrative link control
//! plus a read-only snapshot surface for rendering and logging.
//!
//! Links model an unreliable wire: a directed [`channel`](crate::channel)
//! holds a FIFO queue that is forwarded on a fixed cadence while the link is
//! up, and is discarded wholesale the moment the link goes down. Messages
//! are therefore delivered in order per link, or not at all.

mod channel;
mod network;
mod node;
mod snapshot;

pub mod error;

pub use error::{NetworkError, Result};
pub use network::{Network, NetworkConfig, DEFAULT_FORWARD_INTERVAL, DEFAULT_MAX_HOPS};
pub use snapshot::{NetworkSnapshot, NodeSnapshot};

pub use watershed_height::NodeId;
