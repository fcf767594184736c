use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::error::Result;
use crate::graph::{path_length, Graph, NodeIndex};
use crate::search::{self, Constraints, PathResult, SearchVariant};
use crate::telemetry::Probe;

/// Alternative routes between one pair of nodes, shortest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KPathsResult {
    pub paths: Vec<PathResult>,
    pub elapsed_ms: f64,
    pub memory_delta_kb: i64,
}

/// A spur result waiting to be accepted. Pops shortest first, then
/// lexicographically smallest node sequence.
struct Candidate {
    length: OrderedFloat<f64>,
    path: Vec<NodeIndex>,
    nodes_visited: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .length
            .cmp(&self.length)
            .then_with(|| other.path.cmp(&self.path))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// Find up to `k` loop-free shortest paths using Yen's algorithm.
///
/// Path #1 is the plain shortest path. Each later path deviates from the
/// previously accepted one at some spur node: the root prefix up to the spur
/// is kept, root nodes are blocked, and so is every edge that an accepted
/// path sharing the same root takes out of the spur. The cheapest candidate
/// left in the pool becomes the next path.
///
/// Lengths are recomputed by summing edge weights along each path. Fewer than
/// `k` paths is a normal outcome; an unreachable destination gives none.
///
/// Complexity: O(k * L * S) where L is the longest accepted path and S is
/// one constrained search.
pub fn k_shortest_paths(
    graph: &Graph,
    source: NodeIndex,
    destination: NodeIndex,
    variant: SearchVariant,
    k: usize,
) -> Result<KPathsResult> {
    k_shortest_paths_with(graph, source, destination, variant, k, true)
}

pub(crate) fn k_shortest_paths_with(
    graph: &Graph,
    source: NodeIndex,
    destination: NodeIndex,
    variant: SearchVariant,
    k: usize,
    collect_memory: bool,
) -> Result<KPathsResult> {
    let probe = Probe::start(collect_memory);
    let accepted = yen(graph, source, destination, variant, k)?;
    let (elapsed_ms, memory_delta_kb) = probe.finish();

    tracing::debug!(
        source,
        destination,
        variant = variant.name(),
        requested = k,
        found = accepted.len(),
        elapsed_ms,
        "k shortest paths finished"
    );

    Ok(KPathsResult {
        paths: accepted,
        elapsed_ms,
        memory_delta_kb,
    })
}

fn yen(
    graph: &Graph,
    source: NodeIndex,
    destination: NodeIndex,
    variant: SearchVariant,
    k: usize,
) -> Result<Vec<PathResult>> {
    // Index errors surface even when k == 0.
    let first = search::run(graph, source, destination, variant, None)?;
    if k == 0 || first.path.is_empty() {
        return Ok(Vec::new());
    }

    let first_length = path_length(graph, &first.path).unwrap_or(first.length);
    let mut accepted: Vec<PathResult> = vec![PathResult {
        path: first.path,
        length: first_length,
        nodes_visited: first.nodes_visited,
        elapsed_ms: 0.0,
        memory_delta_kb: 0,
    }];
    let mut candidates: BinaryHeap<Candidate> = BinaryHeap::new();

    while accepted.len() < k {
        let reference = &accepted[accepted.len() - 1].path;

        // Every spur node on the reference path (the last node has no edge to deviate from)
        for spur_idx in 0..reference.len().saturating_sub(1) {
            let spur_node = reference[spur_idx];
            let root = &reference[..=spur_idx];

            let mut constraints = Constraints::new();

            // Block the continuation of every accepted path sharing this root
            for path in accepted.iter().map(|p| &p.path) {
                if path.len() > spur_idx + 1 && path[..=spur_idx] == *root {
                    constraints.block_edge(path[spur_idx], path[spur_idx + 1]);
                }
            }

            // Block root nodes except the spur itself so the result stays simple
            for &node in &root[..spur_idx] {
                constraints.block_node(node);
            }

            let spur = search::run(graph, spur_node, destination, variant, Some(&constraints))?;
            if spur.path.is_empty() {
                continue;
            }

            let mut path: Vec<NodeIndex> = root[..spur_idx].to_vec();
            path.extend_from_slice(&spur.path);

            let is_dup = accepted.iter().any(|p| p.path == path)
                || candidates.iter().any(|c| c.path == path);
            if is_dup {
                continue;
            }

            let Some(length) = path_length(graph, &path) else {
                continue;
            };

            tracing::trace!(spur_node, spur_idx, length, hops = path.len() - 1, "spur candidate");
            candidates.push(Candidate {
                length: OrderedFloat(length),
                path,
                nodes_visited: spur.nodes_visited,
            });
        }

        let Some(best) = candidates.pop() else {
            break;
        };

        accepted.push(PathResult {
            path: best.path,
            length: best.length.0,
            nodes_visited: best.nodes_visited,
            elapsed_ms: 0.0,
            memory_delta_kb: 0,
        });
    }

    Ok(accepted)
}
