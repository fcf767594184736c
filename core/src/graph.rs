use std::collections::HashMap;

use crate::error::{Result, RouteError};
use crate::geo::{haversine, Coordinate};

/// Dense node index (`0..node_count`), stable for the lifetime of the graph.
pub type NodeIndex = usize;

/// A directed edge in the adjacency list. Weight is in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub target: NodeIndex,
    pub weight: f64,
}

/// A road network vertex: its position and outgoing edges.
#[derive(Debug, Clone)]
pub struct Node {
    pub lat: f64,
    pub lon: f64,
    pub neighbors: Vec<Edge>,
}

impl Node {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// In-memory road graph: node table + coordinate dedup index.
///
/// Road segments are stored as mirrored directed pairs (u→v and v→u), so
/// traversal over `neighbors` behaves as undirected. Nothing in the engine
/// relies on that symmetry; `add_edge` can build directed graphs too.
///
/// The engine only ever borrows a graph immutably, so one graph can serve
/// queries from several threads as long as nobody mutates it meanwhile.
pub struct Graph {
    nodes: Vec<Node>,
    coord_index: HashMap<(u64, u64), NodeIndex>,
}

/// Relative slack allowed when an explicit edge weight is compared with the
/// great-circle distance between its endpoints.
const WEIGHT_SLACK: f64 = 1e-9;

/// Bit-exact key for a coordinate. `-0.0` and `0.0` map to the same key.
fn coord_key(lat: f64, lon: f64) -> (u64, u64) {
    let norm = |v: f64| if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() };
    (norm(lat), norm(lon))
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            coord_index: HashMap::new(),
        }
    }

    /// Pre-allocate for a known graph size.
    pub fn with_capacity(node_count: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(node_count),
            coord_index: HashMap::with_capacity(node_count),
        }
    }

    /// Index of the node at `coord`, creating it if this position is new.
    ///
    /// Fails with `InvalidCoordinate` for NaN, infinite or out-of-range
    /// positions.
    pub fn node_index(&mut self, coord: Coordinate) -> Result<NodeIndex> {
        if !coord.is_valid() {
            return Err(RouteError::InvalidCoordinate {
                lat: coord.lat,
                lon: coord.lon,
            });
        }
        let key = coord_key(coord.lat, coord.lon);
        if let Some(&idx) = self.coord_index.get(&key) {
            return Ok(idx);
        }
        let idx = self.nodes.len();
        self.nodes.push(Node {
            lat: coord.lat,
            lon: coord.lon,
            neighbors: Vec::new(),
        });
        self.coord_index.insert(key, idx);
        Ok(idx)
    }

    /// Look up an existing node by exact coordinate.
    pub fn find_node(&self, coord: Coordinate) -> Option<NodeIndex> {
        self.coord_index.get(&coord_key(coord.lat, coord.lon)).copied()
    }

    /// Add a single directed edge with an explicit weight.
    ///
    /// The weight may not undercut the great-circle distance between the
    /// endpoints; A* relies on that to stay optimal.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, weight: f64) -> Result<()> {
        let floor = self.distance(from, to)?;
        if !weight.is_finite() || weight < floor * (1.0 - WEIGHT_SLACK) {
            return Err(RouteError::InvalidWeight { from, to, weight });
        }
        self.nodes[from].neighbors.push(Edge { target: to, weight });
        Ok(())
    }

    /// Join two existing nodes with a mirrored pair weighted by great-circle
    /// distance. Returns the weight.
    pub fn connect(&mut self, u: NodeIndex, v: NodeIndex) -> Result<f64> {
        let weight = self.distance(u, v)?;
        self.nodes[u].neighbors.push(Edge { target: v, weight });
        self.nodes[v].neighbors.push(Edge { target: u, weight });
        Ok(weight)
    }

    /// Add a road segment between two positions, deduplicating endpoints.
    pub fn add_segment(&mut self, a: Coordinate, b: Coordinate) -> Result<(NodeIndex, NodeIndex)> {
        let u = self.node_index(a)?;
        let v = self.node_index(b)?;
        self.connect(u, v)?;
        Ok((u, v))
    }

    /// Bulk load from polylines (each a sequence of positions along one road).
    /// This is the primary load path; it mirrors LineString features.
    ///
    /// Polylines with fewer than two points are skipped. Returns the number
    /// of segments added. Stops at the first invalid coordinate; segments
    /// before it stay loaded.
    pub fn load_polylines<I, L>(&mut self, lines: I) -> Result<usize>
    where
        I: IntoIterator<Item = L>,
        L: IntoIterator<Item = Coordinate>,
    {
        let mut segments = 0;
        for line in lines {
            let mut prev: Option<Coordinate> = None;
            for point in line {
                if let Some(p) = prev {
                    self.add_segment(p, point)?;
                    segments += 1;
                }
                prev = Some(point);
            }
        }
        tracing::debug!(
            nodes = self.nodes.len(),
            segments,
            "loaded polylines into road graph"
        );
        Ok(segments)
    }

    /// Fail with `InvalidIndex` unless `idx` names a node.
    pub fn check_index(&self, idx: NodeIndex) -> Result<()> {
        if idx < self.nodes.len() {
            Ok(())
        } else {
            Err(RouteError::InvalidIndex {
                index: idx,
                node_count: self.nodes.len(),
            })
        }
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.nodes.get(idx)
    }

    /// Outgoing edges of a node; empty for unknown indices.
    pub fn neighbors(&self, idx: NodeIndex) -> &[Edge] {
        self.nodes
            .get(idx)
            .map(|n| n.neighbors.as_slice())
            .unwrap_or(&[])
    }

    pub fn coordinate(&self, idx: NodeIndex) -> Option<Coordinate> {
        self.nodes.get(idx).map(Node::coordinate)
    }

    /// Coordinates along a path, for rendering. Unknown indices are dropped.
    pub fn path_coordinates(&self, path: &[NodeIndex]) -> Vec<Coordinate> {
        path.iter().filter_map(|&i| self.coordinate(i)).collect()
    }

    /// Great-circle distance between two nodes.
    pub fn distance(&self, a: NodeIndex, b: NodeIndex) -> Result<f64> {
        self.check_index(a)?;
        self.check_index(b)?;
        let (na, nb) = (&self.nodes[a], &self.nodes[b]);
        Ok(haversine(na.lat, na.lon, nb.lat, nb.lon))
    }

    /// Lightest edge `u → v`, if any.
    pub fn edge_weight(&self, u: NodeIndex, v: NodeIndex) -> Option<f64> {
        self.neighbors(u)
            .iter()
            .filter(|e| e.target == v)
            .map(|e| e.weight)
            .reduce(f64::min)
    }

    /// Node closest to `coord` by great-circle distance. Linear scan; the
    /// lowest index wins ties. `None` on an empty graph.
    pub fn nearest_node(&self, coord: Coordinate) -> Option<NodeIndex> {
        let mut best: Option<(NodeIndex, f64)> = None;
        for (i, n) in self.nodes.iter().enumerate() {
            let d = haversine(coord.lat, coord.lon, n.lat, n.lon);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of directed edges (a road segment counts twice).
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.neighbors.len()).sum()
    }

    /// Approximate memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        use std::mem::size_of;

        let nodes_mem = self.nodes.len() * size_of::<Node>();
        let edges_mem = self.edge_count() * size_of::<Edge>();
        let index_entry = size_of::<(u64, u64)>() + size_of::<NodeIndex>() + 8;
        let index_mem = self.coord_index.len() * index_entry;

        nodes_mem + edges_mem + index_mem
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

/// Total weight along a node sequence, taking the lightest edge for each hop.
///
/// `None` if some consecutive pair has no edge. An empty or single-node path
/// has length 0.0.
pub fn path_length(graph: &Graph, path: &[NodeIndex]) -> Option<f64> {
    path.windows(2)
        .map(|w| graph.edge_weight(w[0], w[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon)
    }

    #[test]
    fn test_node_index_dedup() {
        let mut g = Graph::new();
        let a = g.node_index(c(30.0, 78.0)).unwrap();
        let b = g.node_index(c(30.1, 78.0)).unwrap();
        let a2 = g.node_index(c(30.0, 78.0)).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(a, a2);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn test_negative_zero_dedup() {
        let mut g = Graph::new();
        let a = g.node_index(c(0.0, 10.0)).unwrap();
        let b = g.node_index(c(-0.0, 10.0)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_segment_is_mirrored() {
        let mut g = Graph::new();
        let (u, v) = g.add_segment(c(0.0, 0.0), c(0.0, 0.001)).unwrap();
        assert_eq!(g.neighbors(u).len(), 1);
        assert_eq!(g.neighbors(v).len(), 1);
        assert_eq!(g.neighbors(u)[0].target, v);
        assert_eq!(g.neighbors(v)[0].target, u);
        assert_eq!(g.neighbors(u)[0].weight, g.neighbors(v)[0].weight);
        assert!((g.neighbors(u)[0].weight - 111.19).abs() < 0.1);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_load_polylines_shared_vertex() {
        let mut g = Graph::new();
        let segments = g.load_polylines(vec![
            vec![c(0.0, 0.0), c(0.0, 0.001), c(0.0, 0.002)],
            vec![c(0.001, 0.001), c(0.0, 0.001)],
            vec![c(5.0, 5.0)], // too short, skipped
        ]).unwrap();
        assert_eq!(segments, 3);
        assert_eq!(g.node_count(), 4);
        // (0, 0.001) joins both roads
        let mid = g.find_node(c(0.0, 0.001)).unwrap();
        assert_eq!(g.neighbors(mid).len(), 3);
        assert!(g.find_node(c(5.0, 5.0)).is_none());
    }

    #[test]
    fn test_add_edge_rejects_bad_input() {
        let mut g = Graph::new();
        g.node_index(c(0.0, 0.0)).unwrap();
        g.node_index(c(0.0, 1.0)).unwrap();
        assert!(g.add_edge(0, 1, 120_000.0).is_ok());
        assert_eq!(
            g.add_edge(0, 2, 1.0),
            Err(RouteError::InvalidIndex { index: 2, node_count: 2 })
        );
        assert!(matches!(
            g.add_edge(0, 1, -1.0),
            Err(RouteError::InvalidWeight { from: 0, to: 1, .. })
        ));
        assert!(g.add_edge(0, 1, f64::NAN).is_err());
        assert!(g.add_edge(0, 1, f64::INFINITY).is_err());
        // directed: nothing added in reverse
        assert!(g.neighbors(1).is_empty());
    }

    #[test]
    fn test_add_edge_rejects_weight_below_great_circle() {
        let mut g = Graph::new();
        for i in 0..4 {
            g.node_index(c(0.0, i as f64)).unwrap();
        }
        // 0 and 3 are ~333 km apart; a 5 m road between them would let the
        // A* heuristic overestimate
        assert!(matches!(
            g.add_edge(0, 3, 5.0),
            Err(RouteError::InvalidWeight { from: 0, to: 3, .. })
        ));
        assert!(g.neighbors(0).is_empty());

        let exact = g.distance(0, 1).unwrap();
        assert!(g.add_edge(0, 1, exact).is_ok());
        assert!(g.add_edge(1, 0, exact * 1.5).is_ok());
        // a zero-length self loop is fine
        assert!(g.add_edge(2, 2, 0.0).is_ok());
    }

    #[test]
    fn test_rejects_non_finite_coordinates() {
        let mut g = Graph::new();
        assert!(matches!(
            g.node_index(c(f64::NAN, 0.0)),
            Err(RouteError::InvalidCoordinate { .. })
        ));
        assert_eq!(
            g.add_segment(c(0.0, f64::INFINITY), c(0.0, 0.0)),
            Err(RouteError::InvalidCoordinate { lat: 0.0, lon: f64::INFINITY })
        );
        assert!(g.add_segment(c(0.0, 0.0), c(f64::NEG_INFINITY, 0.0)).is_err());
        assert!(g.node_index(c(95.0, 0.0)).is_err());

        // the valid first endpoint was kept, but no edge was stored
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.edge_count(), 0);

        let err = g
            .load_polylines(vec![vec![c(0.0, 0.001), c(0.0, 0.002), c(f64::NAN, 0.003)]])
            .unwrap_err();
        assert!(matches!(err, RouteError::InvalidCoordinate { .. }));
        assert!(g.nodes.iter().all(|n| n.coordinate().is_valid()));
        for n in &g.nodes {
            assert!(n.neighbors.iter().all(|e| e.weight.is_finite()));
        }
        assert!(path_length(&g, &[1, 2]).is_some_and(f64::is_finite));
    }

    #[test]
    fn test_edge_weight_prefers_lightest_parallel() {
        let mut g = Graph::new();
        g.node_index(c(0.0, 0.0)).unwrap();
        g.node_index(c(0.0, 1e-6)).unwrap();
        g.add_edge(0, 1, 5.0).unwrap();
        g.add_edge(0, 1, 3.0).unwrap();
        assert_eq!(g.edge_weight(0, 1), Some(3.0));
        assert_eq!(g.edge_weight(1, 0), None);
    }

    #[test]
    fn test_path_length() {
        let mut g = Graph::new();
        for i in 0..3 {
            g.node_index(c(0.0, i as f64 * 1e-6)).unwrap();
        }
        g.add_edge(0, 1, 1.5).unwrap();
        g.add_edge(1, 2, 2.0).unwrap();
        assert_eq!(path_length(&g, &[0, 1, 2]), Some(3.5));
        assert_eq!(path_length(&g, &[0]), Some(0.0));
        assert_eq!(path_length(&g, &[]), Some(0.0));
        assert_eq!(path_length(&g, &[2, 1]), None);
    }

    #[test]
    fn test_nearest_node() {
        let mut g = Graph::new();
        assert_eq!(g.nearest_node(c(0.0, 0.0)), None);
        g.node_index(c(30.28, 77.99)).unwrap();
        g.node_index(c(30.32, 78.04)).unwrap();
        assert_eq!(g.nearest_node(c(30.289, 77.997)), Some(0));
        assert_eq!(g.nearest_node(c(30.324, 78.041)), Some(1));
    }

    #[test]
    fn test_distance_and_coordinates() {
        let mut g = Graph::new();
        g.node_index(c(0.0, 0.0)).unwrap();
        g.node_index(c(1.0, 0.0)).unwrap();
        assert!((g.distance(0, 1).unwrap() - 111_194.93).abs() < 1.0);
        assert!(g.distance(0, 7).is_err());
        assert_eq!(g.coordinate(1), Some(c(1.0, 0.0)));
        assert_eq!(g.path_coordinates(&[1, 0]), vec![c(1.0, 0.0), c(0.0, 0.0)]);
    }

    #[test]
    fn test_connect_existing_nodes() {
        let mut g = Graph::new();
        g.node_index(c(0.0, 0.0)).unwrap();
        g.node_index(c(0.0, 0.01)).unwrap();
        let w = g.connect(0, 1).unwrap();
        assert_eq!(g.edge_weight(0, 1), Some(w));
        assert_eq!(g.edge_weight(1, 0), Some(w));
        assert!(g.connect(0, 5).is_err());
    }

    #[test]
    fn test_graph_counts() {
        let mut g = Graph::new();
        assert!(g.is_empty());
        g.load_polylines(vec![vec![c(0.0, 0.0), c(0.0, 0.1), c(0.1, 0.1)]])
            .unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 4);
        assert!(g.memory_usage() > 0);
        assert!(g.check_index(2).is_ok());
        assert!(g.check_index(3).is_err());
    }
}
