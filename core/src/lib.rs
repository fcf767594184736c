//! roadnet-core: In-memory road network routing engine.
//!
//! A pure Rust library over an immutable, coordinate-indexed adjacency list
//! built from road polylines. It answers three kinds of query:
//!
//! - single shortest paths (Dijkstra, or A* guided by great-circle distance),
//!   optionally avoiding blocked nodes and directed edges;
//! - up to K loop-free alternative paths (Yen's algorithm);
//! - articulation points, the junctions whose loss disconnects the network.
//!
//! Every query borrows the graph read-only and returns owned results that
//! carry timing and resident-memory telemetry.

mod alternatives;
mod articulation;
mod config;
mod error;
mod geo;
mod graph;
mod route;
mod search;
mod telemetry;

pub use alternatives::{k_shortest_paths, KPathsResult};
pub use articulation::{articulation_points, CriticalPoints};
pub use config::{RouterConfig, DEFAULT_K};
pub use error::{Result, RouteError};
pub use geo::{haversine, Coordinate, EARTH_RADIUS_M};
pub use graph::{path_length, Edge, Graph, Node, NodeIndex};
pub use route::{RouteComparison, Router};
pub use search::{
    shortest_path, shortest_path_constrained, Constraints, PathResult, SearchVariant,
};
pub use telemetry::{current_rss_kb, Probe};
