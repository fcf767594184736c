use thiserror::Error;

use crate::graph::NodeIndex;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, RouteError>;

/// Input-contract violations surfaced to the caller.
///
/// "No path" is never an error: unreachable destinations come back as an
/// empty [`PathResult`](crate::PathResult).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouteError {
    /// A node index outside `0..node_count`.
    #[error("node index {index} out of range (graph has {node_count} nodes)")]
    InvalidIndex {
        /// The offending index.
        index: NodeIndex,
        /// Number of nodes in the graph.
        node_count: usize,
    },
    /// The operation needs at least one node.
    #[error("graph is empty")]
    EmptyGraph,
    /// A position that is not finite or lies outside the lat/lon ranges.
    #[error("invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate {
        /// Rejected latitude.
        lat: f64,
        /// Rejected longitude.
        lon: f64,
    },
    /// Edge weights must be finite and no shorter than the great-circle
    /// distance between their endpoints.
    #[error("invalid weight {weight} on edge {from} -> {to}")]
    InvalidWeight {
        /// Edge tail.
        from: NodeIndex,
        /// Edge head.
        to: NodeIndex,
        /// Rejected weight.
        weight: f64,
    },
    /// Configuration could not be parsed or is out of range.
    #[error("config error: {0}")]
    Config(String),
}
