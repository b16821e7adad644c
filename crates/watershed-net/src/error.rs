//! Error types for watershed-net.
//!
//! Only topology wiring can fail; once a network is running, link flaps and
//! partitions are ordinary inputs the protocol absorbs, not errors.

use thiserror::Error;

/// Result type for watershed-net operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Errors raised while validating a topology or addressing nodes.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The adjacency matrix has no rows.
    #[error("topology is empty")]
    EmptyTopology,

    /// A row's length does not match the number of rows.
    #[error("adjacency row {row} has {len} entries, expected {expected}")]
    NotSquare {
        row: usize,
        len: usize,
        expected: usize,
    },

    /// Undirected edges require `graph[i][j] == graph[j][i]`.
    #[error("adjacency matrix is asymmetric at ({i}, {j})")]
    Asymmetric { i: usize, j: usize },

    /// A node may not be adjacent to itself.
    #[error("self-loop at node {0}")]
    SelfLoop(usize),

    /// A per-node parameter vector has the wrong length.
    #[error("{field} has {actual} entries, expected {expected}")]
    SizeMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A node id does not name a node of this network.
    #[error("node {0} out of range for a {1}-node network")]
    NodeOutOfRange(u32, usize),
}
