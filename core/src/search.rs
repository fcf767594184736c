use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geo::haversine;
use crate::graph::{Graph, NodeIndex};
use crate::telemetry::Probe;

/// Which single-pair search to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchVariant {
    /// Uninformed, keyed by distance from the source.
    Dijkstra,
    /// Keyed by distance plus great-circle distance to the destination.
    AStar,
}

impl SearchVariant {
    pub fn name(self) -> &'static str {
        match self {
            SearchVariant::Dijkstra => "dijkstra",
            SearchVariant::AStar => "astar",
        }
    }
}

/// Outcome of one shortest-path query.
///
/// An empty `path` means the destination is unreachable; `length` is then 0.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathResult {
    pub path: Vec<NodeIndex>,
    pub length: f64,
    pub nodes_visited: usize,
    pub elapsed_ms: f64,
    pub memory_delta_kb: i64,
}

impl PathResult {
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

/// Nodes and directed edges a search may not use.
///
/// Blocking `(u, v)` leaves `(v, u)` usable. A blocked node is never entered,
/// but the search source is always expanded even if listed.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    pub blocked_nodes: HashSet<NodeIndex>,
    pub blocked_edges: HashSet<(NodeIndex, NodeIndex)>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_node(&mut self, node: NodeIndex) -> &mut Self {
        self.blocked_nodes.insert(node);
        self
    }

    pub fn block_edge(&mut self, from: NodeIndex, to: NodeIndex) -> &mut Self {
        self.blocked_edges.insert((from, to));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.blocked_nodes.is_empty() && self.blocked_edges.is_empty()
    }

    /// Whether the step `from → to` may be relaxed.
    pub fn allows(&self, from: NodeIndex, to: NodeIndex) -> bool {
        !self.blocked_nodes.contains(&to) && !self.blocked_edges.contains(&(from, to))
    }
}

/// Frontier entry. `key` orders the heap; `dist` detects stale entries.
#[derive(Copy, Clone)]
struct State {
    key: OrderedFloat<f64>,
    dist: OrderedFloat<f64>,
    node: NodeIndex,
}

// Flip the ordering so BinaryHeap pops the smallest key first.
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key
            .cmp(&self.key)
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

/// Path, its length, and the visit count, before telemetry is attached.
pub(crate) struct SearchOutcome {
    pub path: Vec<NodeIndex>,
    pub length: f64,
    pub nodes_visited: usize,
}

/// Shortest path from `source` to `destination`.
///
/// Fails with `InvalidIndex` if either index is outside the graph.
/// An unreachable destination is a normal, empty result.
pub fn shortest_path(
    graph: &Graph,
    source: NodeIndex,
    destination: NodeIndex,
    variant: SearchVariant,
) -> Result<PathResult> {
    search(graph, source, destination, variant, None, true)
}

/// Shortest path that avoids the blocked nodes and directed edges in
/// `constraints`.
pub fn shortest_path_constrained(
    graph: &Graph,
    source: NodeIndex,
    destination: NodeIndex,
    variant: SearchVariant,
    constraints: &Constraints,
) -> Result<PathResult> {
    search(graph, source, destination, variant, Some(constraints), true)
}

pub(crate) fn search(
    graph: &Graph,
    source: NodeIndex,
    destination: NodeIndex,
    variant: SearchVariant,
    constraints: Option<&Constraints>,
    collect_memory: bool,
) -> Result<PathResult> {
    let probe = Probe::start(collect_memory);
    let outcome = run(graph, source, destination, variant, constraints)?;
    let (elapsed_ms, memory_delta_kb) = probe.finish();

    tracing::debug!(
        source,
        destination,
        variant = variant.name(),
        hops = outcome.path.len().saturating_sub(1),
        length = outcome.length,
        visited = outcome.nodes_visited,
        elapsed_ms,
        "shortest path search finished"
    );

    Ok(PathResult {
        path: outcome.path,
        length: outcome.length,
        nodes_visited: outcome.nodes_visited,
        elapsed_ms,
        memory_delta_kb,
    })
}

/// The search loop shared by both variants, with or without constraints.
///
/// Lazy deletion: a popped entry whose distance exceeds the best known
/// distance is skipped instead of being decreased in place. `nodes_visited`
/// counts accepted pops only.
pub(crate) fn run(
    graph: &Graph,
    source: NodeIndex,
    destination: NodeIndex,
    variant: SearchVariant,
    constraints: Option<&Constraints>,
) -> Result<SearchOutcome> {
    graph.check_index(source)?;
    graph.check_index(destination)?;

    let n = graph.node_count();
    let target = graph.coordinate(destination);
    let heuristic = |u: NodeIndex| -> f64 {
        match (variant, target, graph.node(u)) {
            (SearchVariant::AStar, Some(t), Some(node)) => {
                haversine(node.lat, node.lon, t.lat, t.lon)
            }
            _ => 0.0,
        }
    };

    let mut dist = vec![f64::INFINITY; n];
    let mut parent: Vec<Option<NodeIndex>> = vec![None; n];
    let mut heap = BinaryHeap::new();
    let mut nodes_visited = 0usize;

    dist[source] = 0.0;
    heap.push(State {
        key: OrderedFloat(heuristic(source)),
        dist: OrderedFloat(0.0),
        node: source,
    });

    while let Some(State { dist: d, node: u, .. }) = heap.pop() {
        if d.0 > dist[u] {
            continue;
        }
        nodes_visited += 1;
        if u == destination {
            break;
        }

        for edge in graph.neighbors(u) {
            let v = edge.target;
            if let Some(c) = constraints {
                if !c.allows(u, v) {
                    continue;
                }
            }
            let nd = dist[u] + edge.weight;
            if nd < dist[v] {
                dist[v] = nd;
                parent[v] = Some(u);
                heap.push(State {
                    key: OrderedFloat(nd + heuristic(v)),
                    dist: OrderedFloat(nd),
                    node: v,
                });
            }
        }
    }

    if dist[destination].is_infinite() {
        tracing::trace!(source, destination, nodes_visited, "destination unreachable");
        return Ok(SearchOutcome {
            path: Vec::new(),
            length: 0.0,
            nodes_visited,
        });
    }

    Ok(SearchOutcome {
        path: reconstruct_path(&parent, destination),
        length: dist[destination],
        nodes_visited,
    })
}

/// Follow parent pointers from `destination` back to the source, then reverse.
fn reconstruct_path(parent: &[Option<NodeIndex>], destination: NodeIndex) -> Vec<NodeIndex> {
    let mut path = vec![destination];
    let mut current = destination;
    while let Some(p) = parent[current] {
        path.push(p);
        current = p;
    }
    path.reverse();
    path
}
