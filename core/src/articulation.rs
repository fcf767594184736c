use serde::Serialize;

use crate::error::{Result, RouteError};
use crate::graph::{Graph, NodeIndex};
use crate::telemetry::Probe;

/// Cut-vertices of a road graph: junctions whose loss splits the network.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPoints {
    /// Ascending node indices.
    pub nodes: Vec<NodeIndex>,
    pub elapsed_ms: f64,
    pub memory_delta_kb: i64,
}

/// One simulated call of the recursive DFS.
struct Frame {
    node: NodeIndex,
    parent: Option<NodeIndex>,
    /// Position in `graph.neighbors(node)` to resume from.
    next_edge: usize,
}

/// Find all articulation points with a discovery-time / low-link DFS.
///
/// The DFS keeps its frames on a heap-allocated stack, so depth is bounded
/// by memory rather than the call stack; a long chain of road segments is
/// a single deep DFS branch. Every undiscovered node starts a new DFS tree,
/// so disconnected graphs are covered.
///
/// Fails with `EmptyGraph` when there are no nodes.
pub fn articulation_points(graph: &Graph) -> Result<CriticalPoints> {
    articulation_points_with(graph, true)
}

pub(crate) fn articulation_points_with(
    graph: &Graph,
    collect_memory: bool,
) -> Result<CriticalPoints> {
    if graph.is_empty() {
        return Err(RouteError::EmptyGraph);
    }

    let probe = Probe::start(collect_memory);
    let nodes = find_cut_vertices(graph);
    let (elapsed_ms, memory_delta_kb) = probe.finish();

    tracing::debug!(
        nodes = graph.node_count(),
        critical = nodes.len(),
        elapsed_ms,
        "articulation points finished"
    );

    Ok(CriticalPoints {
        nodes,
        elapsed_ms,
        memory_delta_kb,
    })
}

fn find_cut_vertices(graph: &Graph) -> Vec<NodeIndex> {
    let n = graph.node_count();
    // 0 = undiscovered; discovery times start at 1
    let mut disc = vec![0u32; n];
    let mut low = vec![0u32; n];
    let mut is_cut = vec![false; n];
    let mut time = 0u32;
    let mut stack: Vec<Frame> = Vec::new();

    for root in 0..n {
        if disc[root] != 0 {
            continue;
        }

        time += 1;
        disc[root] = time;
        low[root] = time;
        let mut root_children = 0usize;
        stack.push(Frame {
            node: root,
            parent: None,
            next_edge: 0,
        });

        while let Some(frame) = stack.last_mut() {
            let u = frame.node;
            let parent = frame.parent;

            if let Some(edge) = graph.neighbors(u).get(frame.next_edge) {
                frame.next_edge += 1;
                let v = edge.target;

                if disc[v] == 0 {
                    // Tree edge: descend
                    if parent.is_none() {
                        root_children += 1;
                    }
                    time += 1;
                    disc[v] = time;
                    low[v] = time;
                    stack.push(Frame {
                        node: v,
                        parent: Some(u),
                        next_edge: 0,
                    });
                } else if Some(v) != parent {
                    // Back edge
                    low[u] = low[u].min(disc[v]);
                }
                continue;
            }

            // All edges of u explored: return to the parent frame
            stack.pop();
            if let Some(p) = parent {
                low[p] = low[p].min(low[u]);
                if p != root && low[u] >= disc[p] {
                    is_cut[p] = true;
                }
            }
        }

        if root_children > 1 {
            is_cut[root] = true;
        }
    }

    (0..n).filter(|&i| is_cut[i]).collect()
}
